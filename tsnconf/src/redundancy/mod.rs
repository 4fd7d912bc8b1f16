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

//! # Stream Redundancy
//!
//! This module derives the per-node configuration for frame replication and elimination. A stream
//! may be sent over several trees at once. Each node on these trees receives the stream from one
//! or more senders, and forwards it to one or more sets of receivers (one set per tree). From that,
//! each node gets the following configuration:
//!
//! - **Identification**: On the source only, frames matching the packet filter are mapped to the
//!   stream.
//! - **Decoding**: For each sender, frames arriving from that sender with the VLAN id the sender
//!   assigned are mapped to a member stream, named `<stream>_<sender>` if there are multiple
//!   senders, or `<stream>` otherwise.
//! - **Merging**: With multiple senders, all member streams are merged into `<stream>`, eliminating
//!   duplicates.
//! - **Splitting**: If the number of distinct receiver sets is not exactly one, `<stream>` is
//!   replicated into one member stream per receiver set, named `<stream>_<r1>_<r2>...`. On the
//!   destinations (with no receivers), this rule has no output stream.
//! - **Encoding**: Each distinct receiver set gets a fresh VLAN id, and the member stream (or the
//!   stream itself, if there is only one receiver set) is sent to all receivers of that set with
//!   that VLAN id. VLAN ids are allocated in increasing order, separately for each pair of node
//!   and destination address.
//!
//! All records are stored in the [`NetworkNode`](crate::topology::NetworkNode) they belong to.

mod tables;
pub use tables::{
    NodeStreamConfig, StreamDecoding, StreamEncoding, StreamIdentification, StreamMerging,
    StreamSplitting,
};

use crate::config::ConfigError;
use crate::topology::{NodeId, PortId, Topology};
use crate::trees::{Path, Tree};
use crate::Error;

use itertools::Itertools;
use log::*;
use std::collections::{BTreeMap, HashMap};

/// Stream, as needed for the redundancy configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RedundantStream {
    /// Unique name of the stream
    pub name: String,
    /// Filter expression selecting the frames of the stream at the source
    pub packet_filter: String,
    /// Filter expression on the frame payload
    pub packet_data_filter: Option<String>,
    /// Source node
    pub source: NodeId,
    /// Destination address (used as the scope of VLAN ids and in MAC address tables)
    pub destination_address: String,
    /// Trees over which the stream is sent
    pub trees: Vec<Tree>,
}

/// Senders and receivers of a stream on a single node.
#[derive(Debug, Clone, PartialEq, Default)]
struct StreamNode {
    /// Distinct senders over all trees, with the port on which the stream is received.
    senders: Vec<(NodeId, PortId)>,
    /// For each tree, the distinct receivers with the port over which the stream is sent.
    receivers: Vec<Vec<(NodeId, PortId)>>,
    /// Distinct non-empty receiver sets over all trees.
    distinct_receivers: Vec<Vec<NodeId>>,
}

impl StreamNode {
    fn is_on_stream(&self) -> bool {
        !self.senders.is_empty() || self.receivers.iter().any(|r| !r.is_empty())
    }
}

/// Computes the senders and receivers of every node on any of the trees.
fn stream_nodes(topology: &Topology, trees: &[Tree]) -> BTreeMap<NodeId, StreamNode> {
    let mut result: BTreeMap<NodeId, StreamNode> = BTreeMap::new();
    for (j, tree) in trees.iter().enumerate() {
        for path in tree.paths() {
            for l in 0..path.len() {
                let node = path.node(l);
                let stream_node = result.entry(node).or_insert_with(|| StreamNode {
                    receivers: vec![Vec::new(); trees.len()],
                    ..Default::default()
                });
                if l > 0 {
                    let sender = path.node(l - 1);
                    if !stream_node.senders.iter().any(|(s, _)| *s == sender) {
                        let port = path.ingress_port(topology, l).unwrap_or(path.ports()[l]);
                        stream_node.senders.push((sender, port));
                    }
                }
                if l + 1 < path.len() {
                    let receiver = path.node(l + 1);
                    if !stream_node.receivers[j].iter().any(|(r, _)| *r == receiver) {
                        let port = path.egress_port(topology, l).unwrap_or(path.ports()[l]);
                        stream_node.receivers[j].push((receiver, port));
                    }
                }
            }
        }
    }
    for stream_node in result.values_mut() {
        for receivers in stream_node.receivers.iter() {
            let set: Vec<NodeId> = receivers.iter().map(|(r, _)| *r).collect();
            if !set.is_empty() && !stream_node.distinct_receivers.contains(&set) {
                stream_node.distinct_receivers.push(set);
            }
        }
    }
    result
}

/// Member stream name for a set of nodes: `<stream>_<n1>_<n2>...`
fn member_stream_name(topology: &Topology, stream: &str, nodes: &[NodeId]) -> String {
    format!("{}_{}", stream, nodes.iter().map(|n| topology.node_name(*n)).join("_"))
}

/// # Stream Redundancy Configurator
///
/// Computes the stream identification, decoding, merging, splitting and encoding of every node
/// for each stream, and stores them in the nodes. VLAN id allocation spans all streams configured
/// with the same configurator. The configurator must be cleared (or recreated) before the
/// configuration is recomputed.
#[derive(Debug, Clone)]
pub struct StreamRedundancyConfigurator {
    min_vlan_id: u16,
    max_vlan_id: u16,
    next_vlan_ids: HashMap<(NodeId, String), u32>,
    /// VLAN id used by a sender towards a receiver, for a destination address and stream
    assigned_vlan_ids: HashMap<(NodeId, NodeId, String, String), u16>,
}

impl StreamRedundancyConfigurator {
    /// Create a new configurator allocating VLAN ids in the range `min_vlan_id..=max_vlan_id`.
    pub fn new(min_vlan_id: u16, max_vlan_id: u16) -> Self {
        Self {
            min_vlan_id,
            max_vlan_id,
            next_vlan_ids: HashMap::new(),
            assigned_vlan_ids: HashMap::new(),
        }
    }

    /// Forget all allocated VLAN ids.
    pub fn clear(&mut self) {
        self.next_vlan_ids.clear();
        self.assigned_vlan_ids.clear();
    }

    /// Compute the configuration for a single stream, and add it to the nodes of the topology.
    pub fn configure_stream(
        &mut self,
        topology: &mut Topology,
        stream: &RedundantStream,
    ) -> Result<(), Error> {
        let nodes = stream_nodes(topology, &stream.trees);
        for (node, stream_node) in nodes.iter() {
            debug!(
                "Stream {} on {}: senders [{}], receivers {:?}",
                stream.name,
                topology.node_name(*node),
                stream_node.senders.iter().map(|(s, _)| topology.node_name(*s)).join(", "),
                stream_node
                    .receivers
                    .iter()
                    .map(|r| r.iter().map(|(n, _)| topology.node_name(*n)).join(", "))
                    .collect::<Vec<_>>()
            );
        }
        for (node, stream_node) in nodes.iter() {
            self.compute_encodings(topology, stream, *node, stream_node)?;
        }
        for (node, stream_node) in nodes.iter() {
            self.compute_policies(topology, stream, *node, stream_node)?;
        }
        Ok(())
    }

    fn compute_encodings(
        &mut self,
        topology: &mut Topology,
        stream: &RedundantStream,
        node: NodeId,
        stream_node: &StreamNode,
    ) -> Result<(), Error> {
        for receivers in stream_node.receivers.iter().filter(|r| !r.is_empty()) {
            let receiver_nodes: Vec<NodeId> = receivers.iter().map(|(r, _)| *r).collect();
            let output_stream = if stream_node.distinct_receivers.len() == 1 {
                stream.name.clone()
            } else {
                member_stream_name(topology, &stream.name, &receiver_nodes)
            };
            if topology.node(node).streams.encodings.iter().any(|e| e.stream == output_stream) {
                continue;
            }

            let key = (node, stream.destination_address.clone());
            let next = self.next_vlan_ids.entry(key).or_insert(self.min_vlan_id as u32);
            let vlan = *next;
            *next += 1;
            if vlan > self.max_vlan_id as u32 {
                return Err(Error::VlanIdExhausted {
                    node: topology.node_name(node).to_string(),
                    destination: stream.destination_address.clone(),
                    max_vlan_id: self.max_vlan_id,
                });
            }
            let vlan = vlan as u16;

            for (receiver, port) in receivers.iter() {
                trace!(
                    "Assign VLAN id {} for stream {} from {} to {} (destination {})",
                    vlan,
                    stream.name,
                    topology.node_name(node),
                    topology.node_name(*receiver),
                    stream.destination_address
                );
                self.assigned_vlan_ids.insert(
                    (node, *receiver, stream.destination_address.clone(), stream.name.clone()),
                    vlan,
                );
                topology.node_mut(node).streams.encodings.push(StreamEncoding {
                    stream: output_stream.clone(),
                    port: *port,
                    vlan,
                    destination: stream.destination_address.clone(),
                });
            }
        }
        Ok(())
    }

    fn compute_policies(
        &self,
        topology: &mut Topology,
        stream: &RedundantStream,
        node: NodeId,
        stream_node: &StreamNode,
    ) -> Result<(), Error> {
        let multiple_senders = stream_node.senders.len() > 1;

        // identification
        if node == stream.source {
            topology.node_mut(node).streams.identifications.push(StreamIdentification {
                packet_filter: stream.packet_filter.clone(),
                packet_data_filter: stream.packet_data_filter.clone(),
                stream: stream.name.clone(),
            });
        }

        // decoding
        for (sender, port) in stream_node.senders.iter() {
            let input_stream = if multiple_senders {
                member_stream_name(topology, &stream.name, &[*sender])
            } else {
                stream.name.clone()
            };
            let vlan = *self
                .assigned_vlan_ids
                .get(&(*sender, node, stream.destination_address.clone(), stream.name.clone()))
                .ok_or_else(|| ConfigError::MissingVlanAssignment {
                    stream: stream.name.clone(),
                    sender: topology.node_name(*sender).to_string(),
                    receiver: topology.node_name(node).to_string(),
                })?;
            topology.node_mut(node).streams.decodings.push(StreamDecoding {
                port: *port,
                vlan,
                stream: input_stream,
            });
        }

        // merging
        if multiple_senders {
            let input_streams = stream_node
                .senders
                .iter()
                .map(|(s, _)| member_stream_name(topology, &stream.name, &[*s]))
                .collect();
            topology
                .node_mut(node)
                .streams
                .mergings
                .push(StreamMerging { input_streams, output_stream: stream.name.clone() });
        }

        // splitting
        if stream_node.distinct_receivers.len() != 1 && stream_node.is_on_stream() {
            let output_streams = stream_node
                .distinct_receivers
                .iter()
                .map(|r| member_stream_name(topology, &stream.name, r))
                .collect();
            topology
                .node_mut(node)
                .streams
                .splittings
                .push(StreamSplitting { input_stream: stream.name.clone(), output_streams });
        }
        Ok(())
    }
}

/// Splits all paths of the trees at every node that merges or splits the stream, and returns the
/// resulting fragments without duplicates. The stream configuration must already be computed.
pub fn path_fragments(topology: &Topology, stream: &str, trees: &[Tree]) -> Vec<Path> {
    fn push(fragment: Vec<PortId>, fragments: &mut Vec<Path>) {
        let fragment = Path::new(fragment);
        if fragment.len() > 1 && !fragments.contains(&fragment) {
            fragments.push(fragment);
        }
    }

    let mut fragments: Vec<Path> = Vec::new();
    for path in trees.iter().flat_map(|t| t.paths()) {
        let mut start = 0;
        for (l, port) in path.ports().iter().enumerate() {
            let streams = topology.node(port.node).streams();
            if l > start && (streams.is_merging(stream) || streams.is_splitting(stream)) {
                // the fragment ends at the ingress port, independent of where the path continues
                let mut fragment = path.ports()[start..=l].to_vec();
                if let Some(ingress) = path.ingress_port(topology, l) {
                    fragment[l - start] = ingress;
                }
                push(fragment, &mut fragments);
                start = l;
            }
        }
        push(path.ports()[start..].to_vec(), &mut fragments);
    }
    fragments
}
