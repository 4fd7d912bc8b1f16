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

//! # Trees
//!
//! This module enumerates the candidate paths and multicast trees of a stream. All functions are
//! pure: they never modify the topology and return newly constructed values. Every enumeration is
//! deterministic, so repeated calls yield the same result in the same order.

mod enumerate;
mod path;

pub use enumerate::{collect_all_paths, collect_all_trees, PathIter};
pub use path::{Path, Tree};
