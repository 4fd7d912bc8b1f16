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

#![deny(missing_docs)]

//! # TsnConf: Gate Scheduling and Stream Redundancy Configuration for TSN
//! This is a library for configuring time-sensitive networks. Given a topology of end devices and
//! switches, and a set of streams with failure protection requirements and traffic parameters, it
//! computes the entire configuration of the network in a single pass.
//!
//! ## Problem Statement
//! Given
//! - a topology of end devices and switches, connected by cables,
//! - a set of streams, each from a source device to one or more destination devices,
//! - the failures each stream must survive (any `k` out of a set of nodes or links), and
//! - the traffic of each stream (priority, packet length and interval, latency bound),
//!
//! find the trees over which every stream is replicated, the frame replication and elimination
//! tables of every node, and a periodic gate schedule of every port such that all packets are
//! transmitted without interference.
//!
//! ## Structure
//!
//! - **[`Topology`](topology)**: The physical network, built by hand or from a JSON description.
//!
//! - **[`Trees`](trees)**: Enumeration of all paths and trees from the source of a stream to its
//!   destinations.
//!
//! - **[`Protection`](protection)** and **[`Selector`](selector)**: Evaluation of failure
//!   protection requirements, and selection of the cheapest subset of trees satisfying them.
//!
//! - **[`Redundancy`](redundancy)**: Stream identification, decoding, merging, splitting and
//!   encoding of every node, with the VLAN ids used to tell member streams apart.
//!
//! - **[`Solver`](solver)**: Narrow interface to a constraint solver over linear real arithmetic
//!   with disjunctions, with a Z3 backend, a built-in fallback and an SMT-LIB 2 export.
//!
//! - **[`GateScheduling`](gate_scheduling)**: Constraint model of the periodic gate schedule,
//!   extraction of the slots, and computation of the application offsets.
//!
//! - **[`MacTable`](mac_table)**: Static and stream-specific MAC address table entries.
//!
//! - **[`ExampleNetworks`](example_networks)**: Collection of prepared topologies and
//!   configurations.
//!
//! ## Features
//!
//! - *`z3-solver`* (default): The gate schedule is computed with the Z3 SMT solver. This requires
//!   `libz3` to be installed. Without this feature, the built-in case-splitting solver is used.
//! - *`guard-band`*: If this feature is enabled, slots of different priorities on the same port are
//!   separated by the guard band of the port.
//!
//! ## Usage
//!
//! Build the [topology](topology::Topology), prepare the [configuration](config::Configuration),
//! and call [`configure`]. The result is either the complete configuration of all nodes, or an
//! [`Error`] explaining why no configuration exists.
//!
//! ```
//! use tsnconf::example_networks::*;
//! use tsnconf::{configure, Error};
//!
//! fn main() -> Result<(), Error> {
//!     // prepare the network
//!     // let topology = ...
//!     // let config = ...
//! # let topology = LineNet::topology();
//! # let config = LineNet::configuration()?;
//!
//!     // compute the configuration
//!     let output = configure(&topology, &config)?;
//!
//!     // Do something with the result
//!     println!("{}", tsnconf::printer::output(&output));
//!
//!     Ok(())
//! }
//! ```

// test modules
pub mod example_networks;
mod test;

pub mod config;
mod configurator;
mod error;
pub mod gate_scheduling;
pub mod mac_table;
pub mod output;
pub mod permutators;
pub mod printer;
pub mod protection;
pub mod redundancy;
pub mod selector;
pub mod solver;
pub mod topology;
pub mod trees;
pub mod units;

pub use configurator::{configure, export_smtlib};
pub use error::{Error, Infeasibility};
