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

//! # Helper (printer) functions for the configuration output
//! Module containing helper functions to get formatted strings of a
//! [`ConfigurationOutput`]. Times are printed in microseconds.

use crate::gate_scheduling::PeriodicGate;
use crate::output::{ConfigurationOutput, InterfaceSchedule, NodeOutput};

use itertools::Itertools;

/// Returns the formatted representation of the entire output, one line per entry.
pub fn output(output: &ConfigurationOutput) -> String {
    let mut lines: Vec<String> = Vec::new();
    for (stream, trees) in output.trees.iter() {
        lines.push(format!("stream {}:", stream));
        for (i, tree) in trees.iter().enumerate() {
            lines.push(format!("    tree {}: {}", i, tree_paths(tree)));
        }
    }
    for (name, node_output) in output.nodes.iter() {
        lines.push(format!("node {}:", name));
        lines.extend(node(node_output).into_iter().map(|l| format!("    {}", l)));
    }
    if !output.application_offsets.is_empty() {
        lines.push("application offsets:".to_string());
        for (app, offset) in output.application_offsets.iter() {
            lines.push(format!("    {}: {}", app, micros(*offset)));
        }
    }
    lines.join("\n")
}

/// Returns the paths of a tree, formatted as `A -> B -> C, B -> D`.
pub fn tree_paths(tree: &[Vec<String>]) -> String {
    tree.iter().map(|p| p.join(" -> ")).join(", ")
}

/// Returns one formatted line for every entry of the node configuration.
pub fn node(node: &NodeOutput) -> Vec<String> {
    let mut lines = Vec::new();
    for i in node.stream_identifications.iter() {
        match i.packet_data_filter.as_ref() {
            Some(data) => {
                lines.push(format!("identify {} (data {}) as {}", i.packet_filter, data, i.stream))
            }
            None => lines.push(format!("identify {} as {}", i.packet_filter, i.stream)),
        }
    }
    for d in node.stream_decodings.iter() {
        lines.push(format!("decode vlan {} on {} as {}", d.vlan, d.interface, d.stream));
    }
    for m in node.stream_mergings.iter() {
        lines.push(format!("merge [{}] into {}", m.input_streams.join(", "), m.output_stream));
    }
    for s in node.stream_splittings.iter() {
        lines.push(format!("split {} into [{}]", s.input_stream, s.output_streams.join(", ")));
    }
    for e in node.stream_encodings.iter() {
        lines.push(format!("encode {} with vlan {} on {}", e.stream, e.vlan, e.interface));
    }
    for entry in node.mac_address_table.iter() {
        match entry.vlan {
            Some(vlan) => lines.push(format!(
                "mac {} vlan {} -> {}",
                entry.address, vlan, entry.interface
            )),
            None => lines.push(format!("mac {} -> {}", entry.address, entry.interface)),
        }
    }
    if !node.vlan_filter.is_empty() {
        lines.push(format!("vlan filter [{}]", node.vlan_filter.iter().join(", ")));
    }
    for (interface, schedule) in node.gate_schedules.iter() {
        lines.extend(interface_schedule(interface, schedule));
    }
    lines
}

/// Returns the formatted gate schedule of an interface, one line per priority.
pub fn interface_schedule(interface: &str, schedule: &InterfaceSchedule) -> Vec<String> {
    let mut lines = vec![format!(
        "gates of {} (cycle {} starting at {}):",
        interface,
        micros(schedule.cycle_duration),
        micros(schedule.cycle_start)
    )];
    for (priority, slots) in schedule.slots.iter() {
        let slots = slots
            .iter()
            .map(|s| format!("[{}, {})", micros(s.start), micros(s.end())))
            .join(" ");
        lines.push(format!("    priority {}: {}", priority, slots));
        if let Some(gate) = schedule.periodic_gates.get(priority) {
            lines.push(format!("        {}", periodic_gate(gate)));
        }
    }
    lines
}

/// Returns the formatted parameters of a periodic gate.
pub fn periodic_gate(gate: &PeriodicGate) -> String {
    format!(
        "offset {}, initially {}, durations [{}]",
        micros(gate.offset),
        if gate.initially_open { "open" } else { "closed" },
        gate.durations.iter().map(|d| micros(*d)).join(", ")
    )
}

fn micros(seconds: f64) -> String {
    format!("{:.3}us", seconds * 1e6)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::output::EncodingOutput;

    #[test]
    fn print_node() {
        let node_output = NodeOutput {
            stream_encodings: vec![EncodingOutput {
                stream: "s1".to_string(),
                interface: "eth0".to_string(),
                vlan: 3,
            }],
            vlan_filter: vec![1, 2],
            ..NodeOutput::default()
        };
        assert_eq!(
            node(&node_output),
            vec!["encode s1 with vlan 3 on eth0".to_string(), "vlan filter [1, 2]".to_string()]
        );
        assert_eq!(
            tree_paths(&[vec!["S".to_string(), "A".to_string()], vec!["A".to_string(), "D".to_string()]]),
            "S -> A, A -> D"
        );
        assert_eq!(micros(1.5e-6), "1.500us");
    }
}
