use std::fs::{ self, File };
use std::io::{ Read, Write };
use std::path::{ Path, PathBuf };

use flate2::read::GzDecoder;
use indicatif::{ ProgressBar, ProgressStyle };
use log::{ debug, info, warn };

use crate::dataset::DatasetError;

/// Known hosts of the gzipped MNIST files, tried in order.
pub const MIRRORS: [&str; 2] = [
  "https://storage.googleapis.com/cvdf-datasets/mnist/",
  "https://ossci-datasets.s3.amazonaws.com/mnist/",
];


/// Make sure the decompressed file `name` exists in `dir`, downloading
/// `<name>.gz` from the first mirror that serves it.

pub fn download_file(dir: &Path, name: &str, mirrors: &[String]) -> Result<PathBuf, DatasetError> {
  ensure_file(dir, name, mirrors, |url| download_file_as_bytes(url, name))
}

fn ensure_file<F>(dir: &Path, name: &str, mirrors: &[String], mut fetch: F) -> Result<PathBuf, DatasetError>
where
  F: FnMut(&str) -> Result<Vec<u8>, DatasetError>,
{
  let path = dir.join(name);
  if path.exists() {
    debug!("Using cached {}", path.display());
    return Ok(path)
  }

  let bytes = fetch_from_mirrors(mirrors, &format!("{name}.gz"), |url| {
    gunzip(&fetch(url)?)
  })?;

  store(&path, &bytes)?;
  info!("Stored {}", path.display());
  Ok(path)
}

// Write under a temporary name first, so `path` only ever holds a complete file.
// A failed write or rename removes the temporary file again.
fn store(path: &Path, bytes: &[u8]) -> Result<(), DatasetError> {
  let partial = path.with_extension("part");
  let result = File::create(&partial)
    .and_then(|mut file| file.write_all(bytes) )
    .and_then(|_| fs::rename(&partial, path) );
  if let Err(err) = result {
    let _ = fs::remove_file(&partial);
    return Err(err.into())
  }
  Ok(())
}

/// Try every mirror in turn until `fetch` succeeds for one of them.

pub fn fetch_from_mirrors<F>(mirrors: &[String], file: &str, mut fetch: F) -> Result<Vec<u8>, DatasetError>
where
  F: FnMut(&str) -> Result<Vec<u8>, DatasetError>,
{
  for mirror in mirrors {
    let url = format!("{mirror}{file}");
    info!("Downloading {url}");
    match fetch(&url) {
      Ok(bytes) => return Ok(bytes),
      Err(err) => warn!("Failed to download {url}: {err}"),
    }
  }
  Err(DatasetError::Unavailable { name: file.to_string() })
}

/// Fetch `url` into memory, reporting progress with a [progress bar](indicatif).

pub fn download_file_as_bytes(url: &str, message: &str) -> Result<Vec<u8>, DatasetError> {
  let response = reqwest::blocking::get(url)?.error_for_status()?;
  let total = response.content_length().unwrap_or(0);

  let bar = ProgressBar::new(total);
  bar.set_style(
    ProgressStyle::with_template("{msg} [{elapsed_precise}] [{wide_bar}] {bytes}/{total_bytes}")
      .unwrap_or_else(|_| ProgressStyle::default_bar() )
      .progress_chars("=> ")
  );
  bar.set_message(message.to_string());

  let mut bytes = Vec::with_capacity(total as usize);
  bar.wrap_read(response).read_to_end(&mut bytes)?;
  bar.finish_and_clear();
  Ok(bytes)
}

fn gunzip(bytes: &[u8]) -> Result<Vec<u8>, DatasetError> {
  let mut decoded = vec![];
  GzDecoder::new(bytes).read_to_end(&mut decoded)?;
  Ok(decoded)
}


#[cfg(test)]
mod tests {
  use super::*;
  use flate2::{ write::GzEncoder, Compression };

  fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(vec![], Compression::default());
    encoder.write_all(bytes).unwrap();
    encoder.finish().unwrap()
  }

  fn mirrors() -> Vec<String> {
    vec!["https://first/".to_string(), "https://second/".to_string()]
  }

  fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("mnist-mlp-{name}-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
  }

  #[test]
  fn falls_through_to_next_mirror() {
    let mut tried = vec![];
    let bytes = fetch_from_mirrors(&mirrors(), "labels.gz", |url| {
      tried.push(url.to_string());
      if url.starts_with("https://first/") {
        Err(DatasetError::Unavailable { name: url.to_string() })
      } else {
        Ok(vec![1, 2, 3])
      }
    }).unwrap();
    assert_eq!(bytes, vec![1, 2, 3]);
    assert_eq!(tried, vec!["https://first/labels.gz", "https://second/labels.gz"]);
  }

  #[test]
  fn fails_when_all_mirrors_fail() {
    let result = fetch_from_mirrors(&mirrors(), "labels.gz", |url| {
      Err(DatasetError::Unavailable { name: url.to_string() })
    });
    assert!(matches!(result, Err(DatasetError::Unavailable { name }) if name == "labels.gz"));
  }

  #[test]
  fn corrupt_archive_tries_next_mirror() {
    let dir = scratch_dir("corrupt");
    let path = ensure_file(&dir, "labels", &mirrors(), |url| {
      if url.starts_with("https://first/") {
        Ok(b"not gzip".to_vec())
      } else {
        Ok(gzip(b"payload"))
      }
    }).unwrap();
    assert_eq!(fs::read(&path).unwrap(), b"payload");
    assert!(!dir.join("labels.part").exists());
    fs::remove_dir_all(&dir).unwrap();
  }

  #[test]
  fn failed_store_removes_partial_file() {
    let dir = scratch_dir("blocked");
    // A non-empty directory in place of the target makes the rename fail
    let path = dir.join("images");
    fs::create_dir_all(path.join("occupied")).unwrap();
    assert!(matches!(store(&path, b"payload"), Err(DatasetError::Io(_))));
    assert!(!dir.join("images.part").exists());
    assert!(path.is_dir());
    fs::remove_dir_all(&dir).unwrap();
  }

  #[test]
  fn existing_file_is_not_downloaded() {
    let dir = scratch_dir("cached");
    fs::write(dir.join("images"), b"cached").unwrap();
    let path = ensure_file(&dir, "images", &mirrors(), |_| panic!("Should not download") ).unwrap();
    assert_eq!(fs::read(path).unwrap(), b"cached");
    fs::remove_dir_all(&dir).unwrap();
  }
}
