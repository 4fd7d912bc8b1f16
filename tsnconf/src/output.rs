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

//! # Configuration Output
//!
//! Result of a single configuration pass, with all identifiers replaced by node and interface
//! names. The output is all-or-nothing: it only exists if every step of the pass succeeded. Every
//! map is ordered, such that the serialized output of two passes on the same input is identical.

use crate::gate_scheduling::{Output as ScheduleOutput, PeriodicGate, Slot};
use crate::mac_table::{stream_mac_entries, MacTableEntry};
use crate::topology::{NodeId, Topology};
use crate::trees::Tree;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Output of a configuration pass
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationOutput {
    /// Trees of every stream, as lists of paths of node names
    pub trees: BTreeMap<String, Vec<Vec<Vec<String>>>>,
    /// Configuration of every node which has at least one entry
    pub nodes: BTreeMap<String, NodeOutput>,
    /// Start offset of every application (in seconds)
    pub application_offsets: BTreeMap<String, f64>,
}

/// Configuration of a single node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeOutput {
    /// Mapping of packet filters to streams
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stream_identifications: Vec<IdentificationOutput>,
    /// Mapping of received VLAN ids to streams
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stream_decodings: Vec<DecodingOutput>,
    /// Merging rules
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stream_mergings: Vec<MergingOutput>,
    /// Splitting rules
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stream_splittings: Vec<SplittingOutput>,
    /// Mapping of streams to VLAN ids
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stream_encodings: Vec<EncodingOutput>,
    /// MAC address table, stream entries first, static entries after them
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mac_address_table: Vec<MacTableEntry>,
    /// VLAN ids which are accepted by the node
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vlan_filter: Vec<u16>,
    /// Gate schedule of every interface
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub gate_schedules: BTreeMap<String, InterfaceSchedule>,
}

impl NodeOutput {
    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Stream identification: `packet_filter` (and `packet_data_filter`) to `stream`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentificationOutput {
    /// Packet filter expression
    pub packet_filter: String,
    /// Filter expression on the payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packet_data_filter: Option<String>,
    /// Stream name
    pub stream: String,
}

/// Stream decoding: frames on `interface` with `vlan` belong to `stream`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodingOutput {
    /// Receiving interface
    pub interface: String,
    /// VLAN id
    pub vlan: u16,
    /// Stream name
    pub stream: String,
}

/// Stream merging: all `input_streams` are merged into `output_stream`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergingOutput {
    /// Member streams
    pub input_streams: Vec<String>,
    /// Merged stream
    pub output_stream: String,
}

/// Stream splitting: `input_stream` is replicated into all `output_streams`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplittingOutput {
    /// Replicated stream
    pub input_stream: String,
    /// Member streams
    pub output_streams: Vec<String>,
}

/// Stream encoding: `stream` is sent with `vlan` over `interface`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingOutput {
    /// Stream name
    pub stream: String,
    /// Sending interface
    pub interface: String,
    /// VLAN id
    pub vlan: u16,
}

/// Gate schedule of a single interface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceSchedule {
    /// Start of the cycle (in seconds)
    pub cycle_start: f64,
    /// Duration of the cycle (in seconds)
    pub cycle_duration: f64,
    /// Open slots of every priority
    pub slots: BTreeMap<usize, Vec<Slot>>,
    /// Parameters of the periodic gate of every priority
    pub periodic_gates: BTreeMap<usize, PeriodicGate>,
}

impl ConfigurationOutput {
    /// Collect the output from the stream tables stored in the topology, the trees of every stream,
    /// the gate schedule and the static MAC address tables.
    pub fn collect(
        topology: &Topology,
        trees: &[(String, Vec<Tree>)],
        schedule: &ScheduleOutput,
        static_tables: &BTreeMap<NodeId, Vec<MacTableEntry>>,
    ) -> Self {
        let trees = trees
            .iter()
            .map(|(stream, trees)| {
                (stream.clone(), trees.iter().map(|t| t.names(topology)).collect())
            })
            .collect();

        let mut nodes = BTreeMap::new();
        for node in topology.node_ids() {
            let tables = topology.node(node).streams();
            let iface = |p| topology.port(p).name.clone();
            let mut out = NodeOutput {
                stream_identifications: tables
                    .identifications
                    .iter()
                    .map(|i| IdentificationOutput {
                        packet_filter: i.packet_filter.clone(),
                        packet_data_filter: i.packet_data_filter.clone(),
                        stream: i.stream.clone(),
                    })
                    .collect(),
                stream_decodings: tables
                    .decodings
                    .iter()
                    .map(|d| DecodingOutput {
                        interface: iface(d.port),
                        vlan: d.vlan,
                        stream: d.stream.clone(),
                    })
                    .collect(),
                stream_mergings: tables
                    .mergings
                    .iter()
                    .map(|m| MergingOutput {
                        input_streams: m.input_streams.clone(),
                        output_stream: m.output_stream.clone(),
                    })
                    .collect(),
                stream_splittings: tables
                    .splittings
                    .iter()
                    .map(|s| SplittingOutput {
                        input_stream: s.input_stream.clone(),
                        output_streams: s.output_streams.clone(),
                    })
                    .collect(),
                stream_encodings: tables
                    .encodings
                    .iter()
                    .map(|e| EncodingOutput {
                        stream: e.stream.clone(),
                        interface: iface(e.port),
                        vlan: e.vlan,
                    })
                    .collect(),
                mac_address_table: stream_mac_entries(topology, node),
                vlan_filter: tables.vlan_filter(),
                gate_schedules: BTreeMap::new(),
            };
            if let Some(entries) = static_tables.get(&node) {
                out.mac_address_table.extend(entries.iter().cloned());
            }
            for (port, schedule) in schedule.schedules.iter().filter(|(p, _)| p.node == node) {
                out.gate_schedules.insert(
                    iface(*port),
                    InterfaceSchedule {
                        cycle_start: schedule.cycle_start,
                        cycle_duration: schedule.cycle_duration,
                        slots: schedule.gates.clone(),
                        periodic_gates: schedule
                            .gates
                            .keys()
                            .map(|prio| (*prio, schedule.periodic_gate(*prio)))
                            .collect(),
                    },
                );
            }
            if !out.is_empty() {
                nodes.insert(topology.node_name(node).to_string(), out);
            }
        }

        Self { trees, nodes, application_offsets: schedule.application_offsets.clone() }
    }

    /// Serialize the output as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Returns the configuration of the node, if it has any.
    pub fn node(&self, name: &str) -> Option<&NodeOutput> {
        self.nodes.get(name)
    }
}
