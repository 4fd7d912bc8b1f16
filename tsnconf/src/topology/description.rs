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

//! # Topology Description
//!
//! External description of devices, switches, their interfaces and the cables between them, as it
//! is read from a JSON document. [`Topology::from_description`] extracts the [`Topology`] from it.
//!
//! ```json
//! {
//!   "nodes": [
//!     { "name": "S", "role": "device", "interfaces": [{ "name": "eth0", "macAddress": "0A-AA-00-00-00-01" }] },
//!     { "name": "A", "role": "switch", "interfaces": [{ "name": "eth0" }, { "name": "eth1", "datarate": "100Mbps" }] }
//!   ],
//!   "links": [{ "from": "S.eth0", "to": "A.eth0", "length": "10m" }]
//! }
//! ```

use crate::topology::types::{NodeRole, PortParameters, TopologyError};
use crate::topology::Topology;
use crate::units::{Bits, BitsPerSecond, Meters, Seconds};

use log::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Description of the entire network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TopologyDescription {
    /// All devices and switches
    pub nodes: Vec<NodeDescription>,
    /// All cables
    #[serde(default)]
    pub links: Vec<LinkDescription>,
}

/// Description of a single device or switch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NodeDescription {
    /// Unique name
    pub name: String,
    /// Role of the node
    pub role: NodeRole,
    /// Network interfaces of the node
    #[serde(default)]
    pub interfaces: Vec<InterfaceDescription>,
}

fn enabled_default() -> bool {
    true
}

/// Description of a network interface. Missing attributes take the defaults of
/// [`PortParameters`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InterfaceDescription {
    /// Interface name, unique on the node
    pub name: String,
    /// Disabled interfaces are ignored
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    /// MAC address
    #[serde(default)]
    pub mac_address: Option<String>,
    /// Transmission data rate
    #[serde(default)]
    pub datarate: Option<BitsPerSecond>,
    /// Maximum frame size
    #[serde(default)]
    pub max_packet_length: Option<Bits>,
    /// Number of traffic classes
    #[serde(default)]
    pub num_priorities: Option<usize>,
    /// Guard band
    #[serde(default)]
    pub guard_band: Option<Seconds>,
    /// Upper bound of the gate cycle
    #[serde(default)]
    pub max_cycle_duration: Option<Seconds>,
    /// Upper bound of a single slot
    #[serde(default)]
    pub max_slot_duration: Option<Seconds>,
}

impl InterfaceDescription {
    fn params(&self, node: &str) -> Result<PortParameters, TopologyError> {
        let default = PortParameters::default();
        let params = PortParameters {
            datarate: self.datarate.map(|x| x.value()).unwrap_or(default.datarate),
            max_packet_length: self
                .max_packet_length
                .map(|x| x.value())
                .unwrap_or(default.max_packet_length),
            num_priorities: self.num_priorities.unwrap_or(default.num_priorities),
            guard_band: self.guard_band.map(|x| x.value()).unwrap_or(default.guard_band),
            max_cycle_duration: self.max_cycle_duration.map(|x| x.value()),
            max_slot_duration: self.max_slot_duration.map(|x| x.value()),
            mac_address: self.mac_address.clone(),
        };
        if params.datarate <= 0.0 {
            return Err(TopologyError::InvalidAttribute(
                format!("{}.{}", node, self.name),
                "the data rate must be positive".to_string(),
            ));
        }
        if params.num_priorities == 0 {
            return Err(TopologyError::InvalidAttribute(
                format!("{}.{}", node, self.name),
                "at least one priority is required".to_string(),
            ));
        }
        Ok(params)
    }
}

/// Description of a cable between two interfaces. The propagation delay is either given directly,
/// or computed from the cable length. Without both, the propagation delay is zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LinkDescription {
    /// First interface, as `node.interface`
    pub from: String,
    /// Second interface, as `node.interface`
    pub to: String,
    /// Cable length
    #[serde(default)]
    pub length: Option<Meters>,
    /// Propagation delay
    #[serde(default)]
    pub propagation_time: Option<Seconds>,
}

impl LinkDescription {
    fn propagation_time(&self) -> f64 {
        match (self.propagation_time, self.length) {
            (Some(t), _) => t.value(),
            (None, Some(l)) => l.propagation_time().value(),
            (None, None) => 0.0,
        }
    }
}

/// Splits an interface reference `node.interface` at the first dot.
pub(crate) fn split_reference(reference: &str) -> Option<(&str, &str)> {
    let pos = reference.find('.')?;
    Some((&reference[..pos], &reference[pos + 1..]))
}

impl Topology {
    /// Extract the topology from its description. Every node with at least one enabled interface
    /// becomes a node of the topology, and every link between two enabled interfaces becomes a
    /// bidirectional connection. Referencing an unknown node or interface is an error.
    pub fn from_description(description: &TopologyDescription) -> Result<Self, TopologyError> {
        let mut t = Topology::new();
        let mut names: HashSet<&str> = HashSet::new();

        for node in description.nodes.iter() {
            if !names.insert(node.name.as_str()) {
                return Err(TopologyError::DuplicateNode(node.name.clone()));
            }
            let mut interfaces: HashSet<&str> = HashSet::new();
            for iface in node.interfaces.iter() {
                if !interfaces.insert(iface.name.as_str()) {
                    return Err(TopologyError::DuplicateInterface(
                        node.name.clone(),
                        iface.name.clone(),
                    ));
                }
            }
            if !node.interfaces.iter().any(|i| i.enabled) {
                debug!("Skip node {} without any enabled interface", node.name);
                continue;
            }
            let id = t.add_node(node.name.clone(), node.role);
            for iface in node.interfaces.iter().filter(|i| i.enabled) {
                let params = iface.params(&node.name)?;
                t.add_port(id, iface.name.clone(), params);
            }
        }

        for link in description.links.iter() {
            let from = resolve_interface(description, &link.from)?;
            let to = resolve_interface(description, &link.to)?;
            if !(from.2 && to.2) {
                debug!("Skip link {} <-> {} with disabled interface", link.from, link.to);
                continue;
            }
            let a = t.get_node_id(from.0)?;
            let a = t.find_port(a, from.1)?;
            let b = t.get_node_id(to.0)?;
            let b = t.find_port(b, to.1)?;
            t.connect(a, b, link.propagation_time())?;
        }

        info!("Extracted topology with {} nodes and {} links", t.num_nodes(), t.link_ids().count());
        Ok(t)
    }

    /// Parse the topology description from a JSON string and extract the topology.
    pub fn from_json_str(s: &str) -> Result<Self, TopologyError> {
        let description: TopologyDescription =
            serde_json::from_str(s).map_err(|e| TopologyError::ParseError(e.to_string()))?;
        Self::from_description(&description)
    }

    /// Read the topology description from a JSON file and extract the topology.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TopologyError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            TopologyError::IoError(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Self::from_json_str(&content)
    }
}

/// Looks up the interface reference in the description. Returns the node name, the interface name,
/// and whether the interface is enabled.
fn resolve_interface<'a>(
    description: &'a TopologyDescription,
    reference: &'a str,
) -> Result<(&'a str, &'a str, bool), TopologyError> {
    let (node, iface) = split_reference(reference)
        .ok_or_else(|| TopologyError::InvalidReference(reference.to_string()))?;
    let n = description
        .nodes
        .iter()
        .find(|n| n.name == node)
        .ok_or_else(|| TopologyError::NodeNotFound(node.to_string()))?;
    let i = n
        .interfaces
        .iter()
        .find(|i| i.name == iface)
        .ok_or_else(|| TopologyError::InterfaceNotFound(node.to_string(), iface.to_string()))?;
    Ok((node, iface, i.enabled))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::topology::PortId;
    use assert_approx_eq::assert_approx_eq;

    const DESCRIPTION: &str = r#"{
        "nodes": [
            { "name": "S", "role": "device", "interfaces": [{ "name": "eth0", "macAddress": "0A-AA-00-00-00-01" }] },
            { "name": "A", "role": "switch", "interfaces": [
                { "name": "eth0" },
                { "name": "eth1", "datarate": "100Mbps", "numPriorities": 2 },
                { "name": "eth2", "enabled": false }
            ] },
            { "name": "X", "role": "device", "interfaces": [{ "name": "eth0", "enabled": false }] }
        ],
        "links": [
            { "from": "S.eth0", "to": "A.eth0", "length": "20m" },
            { "from": "A.eth2", "to": "X.eth0" }
        ]
    }"#;

    #[test]
    fn extract() {
        let t = Topology::from_json_str(DESCRIPTION).unwrap();
        assert_eq!(t.num_nodes(), 2);
        assert!(t.get_node_id("X").is_err());
        let s = t.get_node_id("S").unwrap();
        let a = t.get_node_id("A").unwrap();
        assert_eq!(t.node(a).ports().len(), 2);
        assert_eq!(t.node(a).ports()[1].params.num_priorities, 2);
        assert_approx_eq!(t.node(a).ports()[1].params.datarate, 1e8);
        assert_eq!(t.node(s).ports()[0].params.mac_address.as_deref(), Some("0A-AA-00-00-00-01"));
        assert_eq!(t.remote_port(PortId::new(s, 0)), Some(PortId::new(a, 0)));
        assert_approx_eq!(t.propagation_time(PortId::new(a, 0)), 1e-7);
    }

    #[test]
    fn unknown_references() {
        let d = r#"{"nodes": [{ "name": "S", "role": "device", "interfaces": [{ "name": "eth0" }] }],
                   "links": [{ "from": "S.eth0", "to": "B.eth0" }]}"#;
        assert_eq!(Topology::from_json_str(d).unwrap_err(), TopologyError::NodeNotFound("B".into()));
        let d = r#"{"nodes": [{ "name": "S", "role": "device", "interfaces": [{ "name": "eth0" }] }],
                   "links": [{ "from": "S.eth0", "to": "S.eth1" }]}"#;
        assert_eq!(
            Topology::from_json_str(d).unwrap_err(),
            TopologyError::InterfaceNotFound("S".into(), "eth1".into())
        );
        let d = r#"{"nodes": [{ "name": "S", "role": "device", "interfaces": [{ "name": "eth0" }] }],
                   "links": [{ "from": "S", "to": "S.eth0" }]}"#;
        assert_eq!(
            Topology::from_json_str(d).unwrap_err(),
            TopologyError::InvalidReference("S".into())
        );
    }

    #[test]
    fn duplicates() {
        let d = r#"{"nodes": [{ "name": "S", "role": "device" }, { "name": "S", "role": "switch" }]}"#;
        assert_eq!(Topology::from_json_str(d).unwrap_err(), TopologyError::DuplicateNode("S".into()));
    }
}
