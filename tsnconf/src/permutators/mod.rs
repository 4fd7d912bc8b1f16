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

//! # Permutators
//!
//! This module contains the iterators over permutations used to enumerate failure combinations and
//! tree subsets. Selecting $k$ out of $n$ elements is expressed as a boolean mask with exactly $k$
//! entries set to `true`, and every distinct arrangement of that mask is visited exactly once.
//!
//! ## Different Permutators
//! - **[`ReverseLexicographicPermutator`]**: Returns all distinct permutations of the input, starting
//!   with the input itself and continuing in descending lexicographic order. When the input is
//!   sorted in descending order (as produced by [`k_of_n`]), every distinct permutation is
//!   returned. Elements that compare equal are never swapped, so multisets (like boolean masks)
//!   yield each arrangement only once.

mod reverse_lexicographic;
pub use reverse_lexicographic::{k_of_n, prev_permutation, ReverseLexicographicPermutator};

/// Permutator trait
pub trait Permutator<T>
where
    Self: Iterator<Item = Vec<T>>,
{
    /// Creates the permutator from the sequence of `T`. The first permutation returned is the
    /// sequence itself.
    fn new(input: Vec<T>) -> Self;
}
