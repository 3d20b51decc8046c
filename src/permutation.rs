//! Seeded Fisher-Yates permutations.

use std::fmt::Display;

use crate::prng::Uheprng;

/// Build a permutation of `0..n` from `seed`.
///
/// The draw order and the `floor` truncation are what the content server uses,
/// so the result must not be computed any other way.
pub fn generate<S: Display>(n: usize, seed: S) -> Vec<usize> {
    let mut prng = Uheprng::new(seed);
    let mut order = (0..n).collect::<Vec<_>>();

    for length in (1..=n).rev() {
        let index = (prng.next_f64() * length as f64).floor() as usize;
        order.swap(index.min(length - 1), length - 1);
    }

    order
}

/// Forward shuffle: `result[i] = values[perm[i]]`.
pub fn permute<T: Clone, S: Display>(values: &[T], seed: S) -> Vec<T> {
    generate(values.len(), seed)
        .into_iter()
        .map(|i| values[i].clone())
        .collect()
}

/// Inverse of [`permute`]: `result[perm[i]] = values[i]`.
pub fn unpermute<T: Clone, S: Display>(values: &[T], seed: S) -> Vec<T> {
    let mut result = values.to_vec();
    for (i, target) in generate(values.len(), seed).into_iter().enumerate() {
        result[target] = values[i].clone();
    }
    result
}
