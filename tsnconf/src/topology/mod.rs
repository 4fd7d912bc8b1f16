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

//! # Topology
//!
//! This module represents the physical network: end devices and switches with their ordered ports,
//! connected by cables. Each cable is stored as two directed [`Link`]s. All identifiers are indices
//! into a `petgraph` graph, and are only valid for the topology they were created with.
//!
//! The topology is built either by hand (see [`Topology`]), or extracted from a
//! [`TopologyDescription`] read from a JSON file. Nodes, links and destinations are selected by
//! [`NamePattern`]s.
//!
//! Besides the static attributes, each [`NetworkNode`] owns the stream configuration derived by the
//! last configuration pass (see [`redundancy`](crate::redundancy)). That configuration is cleared
//! before every pass.

mod description;
mod network;
mod pattern;
mod types;

pub(crate) use description::split_reference;
pub use description::{InterfaceDescription, LinkDescription, NodeDescription, TopologyDescription};
pub use network::Topology;
pub use pattern::{NamePattern, PatternError};
pub use types::{
    IndexType, Link, LinkId, NetworkNode, NodeId, NodeRole, Port, PortId, PortParameters,
    TopologyError,
};
