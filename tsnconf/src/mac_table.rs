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

//! # MAC Address Tables
//!
//! Two kinds of forwarding entries are computed:
//!
//! - **Stream entries**: every stream encoding of a node forwards the destination address of the
//!   stream, tagged with the VLAN id of the member stream, over the port of the encoding.
//! - **Static entries**: every interface of an end device that has a MAC address is reachable from
//!   every switch. The switch forwards the address over its first outgoing interface on a shortest
//!   path (in hops) that enters the device through that interface. Only switches forward frames.

use crate::topology::{NodeId, PortId, Topology};

use log::*;
use petgraph::algo::dijkstra;
use petgraph::visit::{EdgeRef, Reversed};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Entry of a MAC address table
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MacTableEntry {
    /// Destination address
    pub address: String,
    /// VLAN id, if the entry only applies to tagged frames
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vlan: Option<u16>,
    /// Name of the outgoing interface
    pub interface: String,
}

/// Returns the MAC address table entries following from the stream encodings of the node.
pub fn stream_mac_entries(topology: &Topology, node: NodeId) -> Vec<MacTableEntry> {
    topology
        .node(node)
        .streams()
        .encodings
        .iter()
        .map(|e| MacTableEntry {
            address: e.destination.clone(),
            vlan: Some(e.vlan),
            interface: topology.port(e.port).name.clone(),
        })
        .collect()
}

/// Computes the static MAC address tables of all switches. Switches without any entry are not
/// part of the result.
pub fn static_mac_tables(topology: &Topology) -> BTreeMap<NodeId, Vec<MacTableEntry>> {
    let mut tables: BTreeMap<NodeId, Vec<MacTableEntry>> = BTreeMap::new();
    for destination in topology.node_ids().filter(|n| !topology.node(*n).is_switch()) {
        for (idx, port) in topology.node(destination).ports().iter().enumerate() {
            if let Some(address) = port.params.mac_address.as_ref() {
                let interface = PortId::new(destination, idx);
                for (switch, egress) in first_hops(topology, destination, interface) {
                    trace!(
                        "{} forwards {} over {}",
                        topology.node_name(switch),
                        address,
                        topology.port_name(egress)
                    );
                    tables.entry(switch).or_default().push(MacTableEntry {
                        address: address.clone(),
                        vlan: None,
                        interface: topology.port(egress).name.clone(),
                    });
                }
            }
        }
    }
    debug!(
        "Computed static MAC address tables with {} entries",
        tables.values().map(|t| t.len()).sum::<usize>()
    );
    tables
}

/// For every switch that can reach the interface of the destination, returns the first port on
/// a shortest path that enters the destination through that interface.
fn first_hops(topology: &Topology, destination: NodeId, interface: PortId) -> Vec<(NodeId, PortId)> {
    // a link may be used if it is sent by a switch, and enters the destination only through the
    // given interface.
    let allowed = |source: PortId, target: PortId| {
        topology.node(source.node).is_switch()
            && (target.node != destination || target == interface)
    };

    // distances towards the destination, computed on the reversed graph
    let distances = dijkstra(Reversed(topology.graph()), destination, None, |e| {
        let link = e.weight();
        if allowed(link.source, link.destination) {
            1.0
        } else {
            f64::INFINITY
        }
    });
    let dist = |n: NodeId| distances.get(&n).copied().filter(|d| d.is_finite());

    let mut result = Vec::new();
    for node in topology.node_ids().filter(|n| *n != destination && topology.node(*n).is_switch()) {
        let d = match dist(node) {
            Some(d) => d,
            None => continue,
        };
        let first = topology.out_links(node).into_iter().map(|l| topology.link(l)).find(|link| {
            allowed(link.source, link.destination)
                && dist(link.destination.node).map(|x| (x + 1.0 - d).abs() < 0.5).unwrap_or(false)
        });
        if let Some(link) = first {
            result.push((node, link.source));
        }
    }
    result
}
