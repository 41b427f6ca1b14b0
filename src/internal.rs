use rand::{ rngs::StdRng, SeedableRng };


#[inline]
pub fn negative_index(i: isize, n: usize) -> usize {
  if i < 0 {
    assert!(i.unsigned_abs() <= n, "Dimension {i} out of range for rank {n}");
    (n as isize + i) as usize
  } else {
    i as usize
  }
}


/// Seeded generator when a seed is given, entropy-seeded otherwise.

pub fn make_rng(seed: Option<u64>) -> StdRng {
  match seed {
    Some(seed) => StdRng::seed_from_u64(seed),
    None => StdRng::from_entropy(),
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use rand::Rng;

  #[test]
  fn negative() {
    assert_eq!(negative_index(-1, 4), 3);
    assert_eq!(negative_index(-4, 4), 0);
    assert_eq!(negative_index(2, 4), 2);
  }

  #[test]
  fn seeded_rng_repeats() {
    let a: Vec<u32> = (0..4).map(|_| make_rng(Some(7)).gen() ).collect();
    assert!(a.iter().all(|&x| x == a[0] ));
  }
}
