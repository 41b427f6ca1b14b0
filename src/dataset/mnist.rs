use std::fs::{ File, create_dir_all };
use std::io::{ BufReader, Read };
use std::path::Path;

use itertools::Itertools;
use log::{ debug, info };

use crate::dataset::{
  Dataset, DatasetError, InMemDataset, Sample, WIDTH, HEIGHT,
  download::download_file,
};

const IMAGES_MAGIC: u32 = 2051;
const LABELS_MAGIC: u32 = 2049;


/// Which half of MNIST to load.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
  /// 60,000 training samples
  Train,
  /// 10,000 test samples
  Test,
}

impl Split {
  fn files(&self) -> (&'static str, &'static str) {
    match self {
      Self::Train => ("train-images-idx3-ubyte", "train-labels-idx1-ubyte"),
      Self::Test => ("t10k-images-idx3-ubyte", "t10k-labels-idx1-ubyte"),
    }
  }
}


/// The MNIST handwritten digits, loaded into memory.
///
/// Files are kept decompressed under `<root>/MNIST/raw/` and only
/// get downloaded when missing.

#[derive(Debug, Clone)]
pub struct MnistDataset {
  dataset: InMemDataset<Sample>,
}

impl Dataset<Sample> for MnistDataset {
  fn get(&self, index: usize) -> Option<Sample> {
    self.dataset.get(index)
  }

  fn len(&self) -> usize {
    self.dataset.len()
  }
}

impl MnistDataset {
  pub fn train(root: impl AsRef<Path>, mirrors: &[String]) -> Result<Self, DatasetError> {
    Self::new(root, Split::Train, mirrors)
  }

  pub fn test(root: impl AsRef<Path>, mirrors: &[String]) -> Result<Self, DatasetError> {
    Self::new(root, Split::Test, mirrors)
  }

  pub fn new(root: impl AsRef<Path>, split: Split, mirrors: &[String]) -> Result<Self, DatasetError> {
    let raw_dir = root.as_ref().join("MNIST").join("raw");
    create_dir_all(&raw_dir)?;

    let (images, labels) = split.files();
    let images = download_file(&raw_dir, images, mirrors)?;
    let labels = download_file(&raw_dir, labels, mirrors)?;
    debug!("Reading {} and {}", images.display(), labels.display());

    let dataset = Self::from_readers(
      BufReader::new(File::open(images)?),
      BufReader::new(File::open(labels)?),
    )?;
    info!("Loaded {} {:?} samples", dataset.len(), split);
    Ok(dataset)
  }

  /// Parse a pair of decompressed IDX streams.

  pub fn from_readers<I: Read, L: Read>(images: I, labels: L) -> Result<Self, DatasetError> {
    let images = read_images(images)?;
    let labels = read_labels(labels)?;
    if images.len() != labels.len() {
      return Err(DatasetError::CountMismatch { images: images.len(), labels: labels.len() })
    }

    let items = images.into_iter()
      .zip_eq(labels)
      .enumerate()
      .map(|(index, (bytes, label))| {
        if label > 9 { return Err(DatasetError::Label { index, label }) }
        let mut image = [[0.0; WIDTH]; HEIGHT];
        for (i, &pixel) in bytes.iter().enumerate() {
          image[i / WIDTH][i % WIDTH] = normalize(pixel);
        }
        Ok(Sample { image, label })
      })
      .collect::<Result<Vec<_>, _>>()?;

    Ok(Self { dataset: InMemDataset::new(items) })
  }
}

/// Map a raw byte to `[-1, 1]`, as `(p / 255 - 0.5) / 0.5`.

pub fn normalize(pixel: u8) -> f32 {
  (pixel as f32 / 255.0 - 0.5) / 0.5
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32, DatasetError> {
  let mut buf = [0u8; 4];
  reader.read_exact(&mut buf)?;
  Ok(u32::from_be_bytes(buf))
}

fn check_magic<R: Read>(reader: &mut R, name: &str, expected: u32) -> Result<(), DatasetError> {
  let found = read_u32(reader)?;
  if found != expected {
    return Err(DatasetError::Magic { name: name.to_string(), expected, found })
  }
  Ok(())
}

fn read_images<R: Read>(mut reader: R) -> Result<Vec<Vec<u8>>, DatasetError> {
  check_magic(&mut reader, "images", IMAGES_MAGIC)?;
  let count = read_u32(&mut reader)?;
  let rows = read_u32(&mut reader)?;
  let cols = read_u32(&mut reader)?;
  if rows as usize != HEIGHT || cols as usize != WIDTH {
    return Err(DatasetError::ImageSize { name: "images".to_string(), rows, cols })
  }

  let pixels = read_block(&mut reader, "images", count as u64 * (WIDTH * HEIGHT) as u64)?;
  Ok(pixels.chunks(WIDTH * HEIGHT).map(|chunk| chunk.to_vec() ).collect())
}

fn read_labels<R: Read>(mut reader: R) -> Result<Vec<u8>, DatasetError> {
  check_magic(&mut reader, "labels", LABELS_MAGIC)?;
  let count = read_u32(&mut reader)?;
  read_block(&mut reader, "labels", count as u64)
}

// The buffer only grows with data actually present, whatever the header claims
fn read_block<R: Read>(reader: &mut R, name: &str, expected: u64) -> Result<Vec<u8>, DatasetError> {
  let mut block = vec![];
  reader.take(expected).read_to_end(&mut block)?;
  if block.len() as u64 != expected {
    return Err(DatasetError::Truncated { name: name.to_string(), expected, found: block.len() as u64 })
  }
  Ok(block)
}
