// TsnConf: Gate Scheduling and Stream Redundancy Configuration for TSN
// Copyright (C) 2021  Tibor Schneider
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! # Reverse Lexicographic Permutator
//!
//! The `ReverseLexicographicPermutator` generates all permutations in descending lexicographic
//! order.

use super::Permutator;

/// # Reverse Lexicographic Permutator
/// The `ReverseLexicographicPermutator` steps from the given arrangement to the next smaller one in
/// lexicographic order, until the smallest arrangement (sorted ascending) is reached. For a boolean
/// mask `[true, true, false, false]`, the sequence is:
///
/// ```text
/// [1, 1, 0, 0]
/// [1, 0, 1, 0]
/// [1, 0, 0, 1]
/// [0, 1, 1, 0]
/// [0, 1, 0, 1]
/// [0, 0, 1, 1]
/// ```
#[derive(Debug, Clone)]
pub struct ReverseLexicographicPermutator<T> {
    data: Vec<T>,
    start: bool,
    done: bool,
}

impl<T> Permutator<T> for ReverseLexicographicPermutator<T>
where
    T: Ord + Clone,
{
    fn new(input: Vec<T>) -> Self {
        Self { data: input, start: true, done: false }
    }
}

impl<T> Iterator for ReverseLexicographicPermutator<T>
where
    T: Ord + Clone,
{
    type Item = Vec<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        // handle the start
        if self.start {
            self.start = false;
            return Some(self.data.clone());
        }

        if prev_permutation(&mut self.data) {
            Some(self.data.clone())
        } else {
            self.done = true;
            None
        }
    }
}

/// Iterates over all masks of length `n` with exactly `k` entries set to `true`. The first mask
/// has the `k` leading entries set. If `k > n`, all `n` entries are set, and only a single mask is
/// returned.
pub fn k_of_n(k: usize, n: usize) -> ReverseLexicographicPermutator<bool> {
    ReverseLexicographicPermutator::new((0..n).map(|i| i < k).collect())
}

/// Transforms `data` into the next smaller permutation in lexicographic order. Returns `false` if
/// `data` is already the smallest permutation (sorted ascending), in which case `data` is left
/// unchanged.
pub fn prev_permutation<T: Ord>(data: &mut [T]) -> bool {
    let len = data.len();
    if len < 2 {
        return false;
    }

    // step 1: find the largest index k, such that data[k] > data[k + 1]
    let k = match (0..(len - 1)).rev().find(|i| data[*i] > data[i + 1]) {
        Some(k) => k,
        None => return false,
    };

    // step 2: find the largest index l > k, such that data[l] < data[k]
    let mut l = k + 1;
    for i in (k + 2)..len {
        if data[i] < data[k] {
            l = i;
        }
    }

    // step 3: Swap data[k] and data[l]
    data.swap(k, l);

    // step 4: Reverse the order from k+1..n
    reverse_vec_part(data, k + 1);

    true
}

/// Reorders a slice in the range [k..end]
fn reverse_vec_part<T>(v: &mut [T], k: usize) {
    let n = v.len();
    let num_swap = (n - k) / 2;
    for i in 0..num_swap {
        v.swap(k + i, n - 1 - i);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_reverse_vec_part() {
        let mut v = vec![0, 1, 2, 3, 4];
        reverse_vec_part(&mut v, 5);
        assert_eq!(v, vec![0, 1, 2, 3, 4]);

        let mut v = vec![0, 1, 2, 3, 4];
        reverse_vec_part(&mut v, 4);
        assert_eq!(v, vec![0, 1, 2, 3, 4]);

        let mut v = vec![0, 1, 2, 3, 4];
        reverse_vec_part(&mut v, 3);
        assert_eq!(v, vec![0, 1, 2, 4, 3]);

        let mut v = vec![0, 1, 2, 3, 4];
        reverse_vec_part(&mut v, 0);
        assert_eq!(v, vec![4, 3, 2, 1, 0]);
    }

    #[test]
    fn test_prev_permutation_smallest() {
        let mut v = vec![1, 2, 3];
        assert!(!prev_permutation(&mut v));
        assert_eq!(v, vec![1, 2, 3]);

        let mut v: Vec<usize> = vec![];
        assert!(!prev_permutation(&mut v));
    }

    #[test]
    fn test_permutator_3() {
        let permutations: Vec<Vec<u8>> =
            ReverseLexicographicPermutator::new(vec![3, 2, 1]).collect();
        assert_eq!(
            permutations,
            vec![
                vec![3, 2, 1],
                vec![3, 1, 2],
                vec![2, 3, 1],
                vec![2, 1, 3],
                vec![1, 3, 2],
                vec![1, 2, 3],
            ]
        );
    }

    #[test]
    fn test_k_of_n() {
        let masks: Vec<Vec<bool>> = k_of_n(2, 4).collect();
        assert_eq!(
            masks,
            vec![
                vec![true, true, false, false],
                vec![true, false, true, false],
                vec![true, false, false, true],
                vec![false, true, true, false],
                vec![false, true, false, true],
                vec![false, false, true, true],
            ]
        );
    }

    #[test]
    fn test_k_of_n_edge_cases() {
        assert_eq!(k_of_n(0, 3).collect::<Vec<_>>(), vec![vec![false, false, false]]);
        assert_eq!(k_of_n(3, 3).collect::<Vec<_>>(), vec![vec![true, true, true]]);
        assert_eq!(k_of_n(5, 2).collect::<Vec<_>>(), vec![vec![true, true]]);
        assert_eq!(k_of_n(0, 0).collect::<Vec<_>>(), vec![Vec::<bool>::new()]);
        assert_eq!(k_of_n(1, 5).count(), 5);
        assert_eq!(k_of_n(3, 6).count(), 20);
    }
}
