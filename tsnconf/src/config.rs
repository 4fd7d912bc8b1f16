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

//! # Configuration
//!
//! Strongly typed configuration of a configuration pass, parsed from JSON with camelCase keys. All
//! quantities are given as strings with units (see [`crate::units`]).
//!
//! ```json
//! {
//!     "maxVlanId": 15,
//!     "gateScheduling": { "cycleDuration": "1ms", "slotsPerCycle": 1 },
//!     "streams": [
//!         {
//!             "name": "s1",
//!             "source": "S",
//!             "destination": "D",
//!             "priority": 0,
//!             "packetLength": "100B",
//!             "packetInterval": "1ms",
//!             "nodeFailureProtection": [{ "of": "A or B", "any": 1 }]
//!         }
//!     ]
//! }
//! ```

use crate::protection::FailureProtection;
use crate::topology::{NamePattern, TopologyError};
use crate::units::{Bits, Seconds};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Largest VLAN id that can be used
pub const MAX_VLAN_ID: u16 = 4095;

/// Configuration of a single pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Configuration {
    /// First VLAN id assigned on every node and destination
    #[serde(default)]
    pub min_vlan_id: u16,
    /// Largest VLAN id that may be assigned
    #[serde(default = "default_max_vlan_id")]
    pub max_vlan_id: u16,
    /// Parameters of the gate scheduling. Without them, no gate schedule is computed.
    #[serde(default)]
    pub gate_scheduling: Option<GateSchedulingConfig>,
    /// All streams, processed in order.
    #[serde(default)]
    pub streams: Vec<StreamConfig>,
}

fn default_max_vlan_id() -> u16 {
    MAX_VLAN_ID
}

impl Default for Configuration {
    fn default() -> Self {
        Self { min_vlan_id: 0, max_vlan_id: MAX_VLAN_ID, gate_scheduling: None, streams: Vec::new() }
    }
}

/// Parameters of the gate scheduling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GateSchedulingConfig {
    /// Upper bound of the gate cycle duration of every port
    pub cycle_duration: Seconds,
    /// Lower bound of the gate cycle duration. Defaults to `cycle_duration`.
    #[serde(default)]
    pub min_cycle_duration: Option<Seconds>,
    /// Number of slots per priority and cycle
    #[serde(default = "default_slots_per_cycle")]
    pub slots_per_cycle: usize,
    /// Fraction of every cycle which is reserved for best-effort traffic
    #[serde(default)]
    pub best_effort_fraction: f64,
    /// Maximum time the solver may take
    #[serde(default)]
    pub solver_timeout: Option<Seconds>,
}

fn default_slots_per_cycle() -> usize {
    1
}

impl GateSchedulingConfig {
    /// Create the parameters with a fixed cycle duration (in seconds) and a single slot.
    pub fn new(cycle_duration: f64) -> Self {
        Self {
            cycle_duration: Seconds(cycle_duration),
            min_cycle_duration: None,
            slots_per_cycle: 1,
            best_effort_fraction: 0.0,
            solver_timeout: None,
        }
    }

    /// Lower bound of the cycle duration in seconds
    pub fn min_cycle(&self) -> f64 {
        self.min_cycle_duration.unwrap_or(self.cycle_duration).value()
    }
}

/// Configuration of a single stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StreamConfig {
    /// Unique name of the stream
    pub name: String,
    /// Filter expression identifying the packets of the stream at the source
    #[serde(default = "default_packet_filter")]
    pub packet_filter: String,
    /// Filter expression on the packet data
    #[serde(default)]
    pub packet_data_filter: Option<String>,
    /// Name of the source device
    pub source: String,
    /// Pattern matching the names of all destination devices
    #[serde(default)]
    pub destination: NamePattern,
    /// Destination address. Defaults to the name of the first destination.
    #[serde(default)]
    pub destination_address: Option<String>,
    /// Trees given explicitly, as lists of paths, where each path is a list of node names (or
    /// `node.interface` references). Without it, the trees are selected automatically.
    #[serde(default)]
    pub trees: Option<Vec<Vec<Vec<String>>>>,
    /// Maximum number of trees. Defaults to the number of candidate trees.
    #[serde(default)]
    pub max_redundancy: Option<usize>,
    /// Node failures the selected trees must survive
    #[serde(default)]
    pub node_failure_protection: Vec<FailureProtection>,
    /// Link failures the selected trees must survive
    #[serde(default)]
    pub link_failure_protection: Vec<FailureProtection>,
    /// Name of the application generating the traffic. Defaults to `<source>.app`.
    #[serde(default)]
    pub application: Option<String>,
    /// Priority class of the stream
    #[serde(default)]
    pub priority: usize,
    /// Size of every packet. Streams without packet length or interval are not scheduled.
    #[serde(default)]
    pub packet_length: Option<Bits>,
    /// Interval between two packets
    #[serde(default)]
    pub packet_interval: Option<Seconds>,
    /// Upper bound of the end-to-end latency
    #[serde(default)]
    pub max_latency: Option<Seconds>,
}

fn default_packet_filter() -> String {
    "*".to_string()
}

impl StreamConfig {
    /// Create a new stream from the source to all devices matching the destination pattern.
    pub fn new(name: impl Into<String>, source: impl Into<String>, destination: NamePattern) -> Self {
        Self {
            name: name.into(),
            packet_filter: default_packet_filter(),
            packet_data_filter: None,
            source: source.into(),
            destination,
            destination_address: None,
            trees: None,
            max_redundancy: None,
            node_failure_protection: Vec::new(),
            link_failure_protection: Vec::new(),
            application: None,
            priority: 0,
            packet_length: None,
            packet_interval: None,
            max_latency: None,
        }
    }

    /// Set the traffic parameters: packet length in bits, packet interval in seconds.
    pub fn with_traffic(mut self, priority: usize, packet_length: f64, packet_interval: f64) -> Self {
        self.priority = priority;
        self.packet_length = Some(Bits(packet_length));
        self.packet_interval = Some(Seconds(packet_interval));
        self
    }

    /// Name of the application generating the stream
    pub fn application_name(&self) -> String {
        self.application.clone().unwrap_or_else(|| format!("{}.app", self.source))
    }

    /// Returns true if the stream carries the traffic parameters needed for gate scheduling.
    pub fn is_scheduled(&self) -> bool {
        self.packet_length.is_some() && self.packet_interval.is_some()
    }
}

impl Configuration {
    /// Parse the configuration from a JSON string, and validate it.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Configuration =
            serde_json::from_str(s).map_err(|e| ConfigError::Json(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read the configuration from a JSON file, and validate it.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Io(path.display().to_string(), e.to_string()))?;
        Self::from_json_str(&content)
    }

    /// Returns the configuration of the stream with the given name.
    pub fn stream(&self, name: &str) -> Result<&StreamConfig, ConfigError> {
        self.streams
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ConfigError::UnknownStream(name.to_string()))
    }

    /// Check all parameters which do not depend on the topology.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_vlan_id > MAX_VLAN_ID {
            return Err(invalid("maxVlanId", format!("must not exceed {}", MAX_VLAN_ID)));
        }
        if self.min_vlan_id > self.max_vlan_id {
            return Err(invalid("minVlanId", "must not exceed maxVlanId"));
        }

        if let Some(gs) = self.gate_scheduling.as_ref() {
            if gs.cycle_duration.value() <= 0.0 {
                return Err(invalid("gateScheduling.cycleDuration", "must be positive"));
            }
            if gs.min_cycle() <= 0.0 || gs.min_cycle() > gs.cycle_duration.value() {
                return Err(invalid(
                    "gateScheduling.minCycleDuration",
                    "must be positive and at most cycleDuration",
                ));
            }
            if gs.slots_per_cycle == 0 {
                return Err(invalid("gateScheduling.slotsPerCycle", "must be at least 1"));
            }
            if !(0.0..1.0).contains(&gs.best_effort_fraction) {
                return Err(invalid("gateScheduling.bestEffortFraction", "must be in [0, 1)"));
            }
        }

        let mut names: HashSet<&str> = HashSet::new();
        for s in self.streams.iter() {
            if !names.insert(s.name.as_str()) {
                return Err(ConfigError::DuplicateStream(s.name.clone()));
            }
            let param = |p: &str| format!("streams.{}.{}", s.name, p);
            if s.max_redundancy == Some(0) {
                return Err(invalid(param("maxRedundancy"), "must be at least 1"));
            }
            if let Some(l) = s.packet_length {
                if l.value() <= 0.0 {
                    return Err(invalid(param("packetLength"), "must be positive"));
                }
            }
            if let Some(i) = s.packet_interval {
                if i.value() <= 0.0 {
                    return Err(invalid(param("packetInterval"), "must be positive"));
                }
                // packets must arrive at the same phase of every cycle
                if let Some(gs) = self.gate_scheduling.as_ref() {
                    let cycle = gs.cycle_duration.value();
                    if !is_multiple(cycle, i.value()) && !is_multiple(i.value(), cycle) {
                        return Err(invalid(
                            param("packetInterval"),
                            "must divide gateScheduling.cycleDuration, or be a multiple of it",
                        ));
                    }
                }
            }
            if let Some(l) = s.max_latency {
                if l.value() <= 0.0 {
                    return Err(invalid(param("maxLatency"), "must be positive"));
                }
            }
            if s.packet_length.is_some() != s.packet_interval.is_some() {
                return Err(invalid(
                    param("packetInterval"),
                    "packetLength and packetInterval must be given together",
                ));
            }
            if let Some(trees) = s.trees.as_ref() {
                if trees.is_empty() || trees.iter().any(|t| t.is_empty()) {
                    return Err(ConfigError::InvalidTree {
                        stream: s.name.clone(),
                        reason: "every tree needs at least one path".to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Returns true if `a` is an integer multiple (at least once) of `b`.
pub(crate) fn is_multiple(a: f64, b: f64) -> bool {
    let ratio = a / b;
    ratio.round() >= 1.0 && (ratio - ratio.round()).abs() <= 1e-6 * ratio.round()
}

fn invalid(parameter: impl Into<String>, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidParameter { parameter: parameter.into(), reason: reason.into() }
}

/// Configuration Error
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// The configuration cannot be parsed
    #[error("Cannot parse the configuration: {0}")]
    Json(String),
    /// The configuration cannot be read
    #[error("Cannot read {0}: {1}")]
    Io(String, String),
    /// A parameter is out of range
    #[error("Invalid parameter {parameter}: {reason}")]
    InvalidParameter {
        /// Name of the parameter
        parameter: String,
        /// What is wrong with it
        reason: String,
    },
    /// Two streams have the same name
    #[error("Stream {0} is defined more than once")]
    DuplicateStream(String),
    /// The stream does not exist
    #[error("Stream {0} not found")]
    UnknownStream(String),
    /// The stream references a node which is not part of the topology
    #[error("Stream {stream} references unknown node {node}")]
    UnknownNode {
        /// Name of the stream
        stream: String,
        /// Referenced node name
        node: String,
    },
    /// The source of a stream must be a device
    #[error("Source {node} of stream {stream} is not a device")]
    SourceNotADevice {
        /// Name of the stream
        stream: String,
        /// Name of the source node
        node: String,
    },
    /// No device matches the destination pattern of the stream
    #[error("No destination of stream {0} matches its destination pattern")]
    NoDestination(String),
    /// A tree given in the configuration is invalid
    #[error("Invalid tree for stream {stream}: {reason}")]
    InvalidTree {
        /// Name of the stream
        stream: String,
        /// What is wrong with the tree
        reason: String,
    },
    /// The priority is not supported by a port on the path of the stream
    #[error("Priority {priority} of stream {stream} is not supported by port {port}")]
    UnsupportedPriority {
        /// Name of the stream
        stream: String,
        /// Configured priority
        priority: usize,
        /// Name of the port
        port: String,
    },
    /// A packet of the stream is larger than the maximum packet length of a port
    #[error("Packets of stream {stream} are too large for port {port}")]
    PacketTooLarge {
        /// Name of the stream
        stream: String,
        /// Name of the port
        port: String,
    },
    /// A VLAN id was decoded on a node without being assigned by the sender
    #[error("No VLAN id of stream {stream} assigned from {sender} to {receiver}")]
    MissingVlanAssignment {
        /// Name of the stream
        stream: String,
        /// Sending node
        sender: String,
        /// Receiving node
        receiver: String,
    },
    /// Error while resolving names in the topology
    #[error("Topology Error: {0}")]
    Topology(#[from] TopologyError),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let c = Configuration::from_json_str(
            r#"{"streams": [{"name": "s", "source": "S", "packetLength": "100B", "packetInterval": "1ms"}]}"#,
        )
        .unwrap();
        assert_eq!(c.min_vlan_id, 0);
        assert_eq!(c.max_vlan_id, 4095);
        assert_eq!(c.gate_scheduling, None);
        let s = c.stream("s").unwrap();
        assert_eq!(s.packet_filter, "*");
        assert!(s.destination.matches("anything"));
        assert_eq!(s.application_name(), "S.app");
        assert_eq!(s.packet_length, Some(Bits(800.0)));
        assert!(s.is_scheduled());
        assert_eq!(c.stream("t"), Err(ConfigError::UnknownStream("t".to_string())));
    }

    #[test]
    fn gate_scheduling() {
        let c = Configuration::from_json_str(
            r#"{"gateScheduling": {"cycleDuration": "1ms", "bestEffortFraction": 0.2}}"#,
        )
        .unwrap();
        let gs = c.gate_scheduling.unwrap();
        assert_eq!(gs.slots_per_cycle, 1);
        assert_eq!(gs.min_cycle(), gs.cycle_duration.value());
    }

    #[test]
    fn invalid_configurations() {
        assert!(matches!(
            Configuration::from_json_str(r#"{"minVlanId": 10, "maxVlanId": 5}"#),
            Err(ConfigError::InvalidParameter { .. })
        ));
        assert!(matches!(
            Configuration::from_json_str(r#"{"gateScheduling": {"cycleDuration": "0s"}}"#),
            Err(ConfigError::InvalidParameter { .. })
        ));
        assert_eq!(
            Configuration::from_json_str(
                r#"{"streams": [{"name": "s", "source": "A"}, {"name": "s", "source": "B"}]}"#
            ),
            Err(ConfigError::DuplicateStream("s".to_string()))
        );
        assert!(matches!(
            Configuration::from_json_str(r#"{"streams": [{"name": "s"}]}"#),
            Err(ConfigError::Json(_))
        ));
        assert!(matches!(
            Configuration::from_json_str(r#"{"unknown": 1}"#),
            Err(ConfigError::Json(_))
        ));
    }

    fn with_interval(interval: &str) -> Result<Configuration, ConfigError> {
        Configuration::from_json_str(&format!(
            r#"{{
                "gateScheduling": {{"cycleDuration": "1ms"}},
                "streams": [{{"name": "s", "source": "S", "packetLength": "100B", "packetInterval": "{}"}}]
            }}"#,
            interval
        ))
    }

    #[test]
    fn packet_interval_matches_cycle() {
        assert!(with_interval("1ms").is_ok());
        assert!(with_interval("250us").is_ok());
        assert!(with_interval("200us").is_ok());
        assert!(with_interval("2ms").is_ok());
        match with_interval("300us") {
            Err(ConfigError::InvalidParameter { parameter, .. }) => {
                assert_eq!(parameter, "streams.s.packetInterval")
            }
            r => panic!("unexpected result: {:?}", r),
        }
        assert!(matches!(with_interval("1.5ms"), Err(ConfigError::InvalidParameter { .. })));
        assert!(matches!(with_interval("3ms"), Ok(_)));
    }

    #[test]
    fn packet_interval_without_gate_scheduling() {
        let c = Configuration::from_json_str(
            r#"{"streams": [{"name": "s", "source": "S", "packetLength": "100B", "packetInterval": "300us"}]}"#,
        );
        assert!(c.is_ok());
    }
}
