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

//! Module containing all type definitions of the topology

use crate::redundancy::NodeStreamConfig;
use petgraph::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Index type used for all graph ids
pub type IndexType = u32;
/// Network Node Identification (and index into the graph)
pub type NodeId = NodeIndex<IndexType>;
/// Directed Link Identification (and index into the graph)
pub type LinkId = EdgeIndex<IndexType>;

/// Identification of a port: the node it belongs to and its position in the ordered port list.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub struct PortId {
    /// Node owning the port
    pub node: NodeId,
    /// Position of the port on the node
    pub index: usize,
}

impl PortId {
    /// Create a new port identification
    pub fn new(node: NodeId, index: usize) -> Self {
        Self { node, index }
    }
}

/// Role of a network node
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeRole {
    /// End device, which sends and receives streams, but never forwards them.
    Device,
    /// Bridge forwarding frames between its ports.
    Switch,
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Device => write!(f, "device"),
            Self::Switch => write!(f, "switch"),
        }
    }
}

/// Attributes of a port. Data sizes are in bits, times in seconds and data rates in bits per second.
#[derive(PartialEq, Debug, Clone)]
pub struct PortParameters {
    /// Transmission data rate
    pub datarate: f64,
    /// Size of the largest frame the port may transmit
    pub max_packet_length: f64,
    /// Number of priority classes (traffic classes with a gate each)
    pub num_priorities: usize,
    /// Time during which no transmission may start before a gate of a different priority opens
    pub guard_band: f64,
    /// Upper bound of the gate cycle duration, if any
    pub max_cycle_duration: Option<f64>,
    /// Upper bound of a single slot, if any
    pub max_slot_duration: Option<f64>,
    /// MAC address of the interface, if known
    pub mac_address: Option<String>,
}

impl Default for PortParameters {
    fn default() -> Self {
        Self {
            datarate: 1e9,
            max_packet_length: 1500.0 * 8.0,
            num_priorities: 8,
            guard_band: 0.0,
            max_cycle_duration: None,
            max_slot_duration: None,
            mac_address: None,
        }
    }
}

impl PortParameters {
    /// Time needed to transmit `bits` on this port
    pub fn transmission_time(&self, bits: f64) -> f64 {
        bits / self.datarate
    }
}

/// Port of a network node. A port is connected to at most one remote port.
#[derive(PartialEq, Debug, Clone)]
pub struct Port {
    /// Interface name, unique on the node
    pub name: String,
    /// Port attributes
    pub params: PortParameters,
    /// Outgoing link, if the port is connected
    pub(crate) link: Option<LinkId>,
}

impl Port {
    /// Returns the outgoing link of the port, or `None` if the port is not connected
    pub fn link(&self) -> Option<LinkId> {
        self.link
    }
}

/// Directed link from the source port to the destination port. Every physical connection is
/// represented by two links, one in each direction.
#[derive(PartialEq, Debug, Clone)]
pub struct Link {
    /// Transmitting port
    pub source: PortId,
    /// Receiving port
    pub destination: PortId,
    /// Propagation delay of the cable (in seconds)
    pub propagation_time: f64,
}

/// Network node, which is either an end device or a switch.
#[derive(Debug, Clone)]
pub struct NetworkNode {
    pub(crate) name: String,
    pub(crate) role: NodeRole,
    pub(crate) ports: Vec<Port>,
    pub(crate) streams: NodeStreamConfig,
}

impl NetworkNode {
    pub(crate) fn new(name: String, role: NodeRole) -> Self {
        Self { name, role, ports: Vec::new(), streams: NodeStreamConfig::default() }
    }

    /// Returns the name of the node
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the role of the node
    pub fn role(&self) -> NodeRole {
        self.role
    }

    /// Returns true if the node is a switch
    pub fn is_switch(&self) -> bool {
        self.role == NodeRole::Switch
    }

    /// Returns the ordered list of ports
    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    /// Returns the stream configuration derived by the last configuration pass
    pub fn streams(&self) -> &NodeStreamConfig {
        &self.streams
    }
}

/// Topology Error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TopologyError {
    /// The node name is not part of the topology
    #[error("Node {0:?} was not found in the topology")]
    NodeNotFound(String),
    /// The interface name is not part of the node
    #[error("Interface {1:?} was not found on node {0:?}")]
    InterfaceNotFound(String, String),
    /// Two nodes have the same name
    #[error("Node {0:?} is defined twice")]
    DuplicateNode(String),
    /// Two interfaces on the same node have the same name
    #[error("Interface {1:?} is defined twice on node {0:?}")]
    DuplicateInterface(String, String),
    /// The interface is already connected to a different port
    #[error("Interface {1:?} on node {0:?} is already connected")]
    AlreadyConnected(String, String),
    /// An interface must not be connected to itself
    #[error("Interface {1:?} on node {0:?} cannot be connected to itself")]
    SelfLoop(String, String),
    /// Interface references must have the form `node.interface`
    #[error("Invalid interface reference {0:?}, expected `node.interface`")]
    InvalidReference(String),
    /// The two nodes are not adjacent
    #[error("Node {0:?} is not connected to node {1:?}")]
    NotAdjacent(String, String),
    /// A path must contain at least two nodes
    #[error("A path must contain at least two nodes")]
    PathTooShort,
    /// A port attribute is out of range
    #[error("Invalid attribute of interface {0:?}: {1}")]
    InvalidAttribute(String, String),
    /// The description cannot be parsed
    #[error("Cannot parse the topology description: {0}")]
    ParseError(String),
    /// The description cannot be read
    #[error("Cannot read the topology description: {0}")]
    IoError(String),
}
