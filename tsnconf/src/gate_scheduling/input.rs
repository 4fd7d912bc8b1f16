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

//! Input of the gate scheduling. All times are in seconds, all sizes in bits.

use crate::config::{is_multiple, ConfigError, GateSchedulingConfig};
use crate::topology::{NodeId, PortId, PortParameters, Topology};
use crate::trees::Path;

use std::collections::BTreeMap;

/// Port which transmits at least one flow.
#[derive(Debug, Clone, PartialEq)]
pub struct PortInput {
    /// Name of the port, as `node.interface`
    pub name: String,
    /// Port attributes
    pub params: PortParameters,
    /// Propagation delay towards the connected port
    pub propagation_time: f64,
}

/// Application generating the packets of one or more flows.
#[derive(Debug, Clone, PartialEq)]
pub struct Application {
    /// Name of the application
    pub name: String,
    /// Device running the application
    pub device: NodeId,
    /// Name of the device
    pub device_name: String,
    /// Priority class of all packets
    pub priority: usize,
    /// Size of every packet
    pub packet_length: f64,
    /// Time between two packets
    pub packet_interval: f64,
    /// Upper bound of the end-to-end latency
    pub max_latency: Option<f64>,
}

impl Application {
    fn same_traffic(&self, other: &Application) -> bool {
        self.device == other.device
            && self.priority == other.priority
            && self.packet_length == other.packet_length
            && self.packet_interval == other.packet_interval
            && self.max_latency == other.max_latency
    }
}

/// Flow of packets generated by an application, sent over one or more path fragments.
#[derive(Debug, Clone, PartialEq)]
pub struct Flow {
    /// Name of the flow
    pub name: String,
    /// Index of the application in [`Input::applications`]
    pub application: usize,
    /// Path fragments, split at every node which merges or splits the flow.
    pub fragments: Vec<Path>,
}

/// Input of the gate scheduling
#[derive(Debug, Clone, PartialEq)]
pub struct Input {
    /// Lower bound of the cycle duration
    pub min_cycle_duration: f64,
    /// Upper bound of the cycle duration
    pub max_cycle_duration: f64,
    /// Number of slots per priority and cycle
    pub slots_per_cycle: usize,
    /// Fraction of every cycle reserved for best-effort traffic
    pub best_effort_fraction: f64,
    /// All ports transmitting at least one flow
    pub ports: BTreeMap<PortId, PortInput>,
    /// All applications
    pub applications: Vec<Application>,
    /// All flows
    pub flows: Vec<Flow>,
}

impl Input {
    /// Create an empty input with a fixed cycle duration and a single slot per cycle.
    pub fn new(cycle_duration: f64) -> Self {
        Self {
            min_cycle_duration: cycle_duration,
            max_cycle_duration: cycle_duration,
            slots_per_cycle: 1,
            best_effort_fraction: 0.0,
            ports: BTreeMap::new(),
            applications: Vec::new(),
            flows: Vec::new(),
        }
    }

    /// Create an empty input from the configured parameters
    pub fn from_config(config: &GateSchedulingConfig) -> Self {
        Self {
            min_cycle_duration: config.min_cycle(),
            max_cycle_duration: config.cycle_duration.value(),
            slots_per_cycle: config.slots_per_cycle,
            best_effort_fraction: config.best_effort_fraction,
            ports: BTreeMap::new(),
            applications: Vec::new(),
            flows: Vec::new(),
        }
    }

    /// Add an application and return its index. If an application with the same name already
    /// exists, it is reused, as long as it generates the same traffic. The packet interval must
    /// divide the maximum cycle duration, or be a multiple of it.
    pub fn add_application(&mut self, application: Application) -> Result<usize, ConfigError> {
        let (interval, cycle) = (application.packet_interval, self.max_cycle_duration);
        if !is_multiple(cycle, interval) && !is_multiple(interval, cycle) {
            return Err(ConfigError::InvalidParameter {
                parameter: format!("application {}", application.name),
                reason: format!(
                    "packet interval of {}s does not match the cycle duration of {}s",
                    interval, cycle
                ),
            });
        }
        match self.applications.iter().position(|a| a.name == application.name) {
            Some(idx) if self.applications[idx].same_traffic(&application) => Ok(idx),
            Some(_) => Err(ConfigError::InvalidParameter {
                parameter: format!("application {}", application.name),
                reason: "streams of the same application must have the same traffic parameters"
                    .to_string(),
            }),
            None => {
                self.applications.push(application);
                Ok(self.applications.len() - 1)
            }
        }
    }

    /// Add a flow and register every port over which the fragments transmit.
    pub fn add_flow(
        &mut self,
        topology: &Topology,
        name: impl Into<String>,
        application: usize,
        fragments: Vec<Path>,
    ) {
        for path in fragments.iter() {
            let n = path.len();
            for port in path.ports().iter().take(n.saturating_sub(1)) {
                self.ports.entry(*port).or_insert_with(|| PortInput {
                    name: topology.port_name(*port),
                    params: topology.port(*port).params.clone(),
                    propagation_time: topology.propagation_time(*port),
                });
            }
        }
        self.flows.push(Flow { name: name.into(), application, fragments });
    }

    /// Number of packet instances of a flow within one cycle (at least one). Intervals longer than
    /// the cycle repeat at the same phase, so a single instance covers them.
    pub fn num_packets(&self, flow: &Flow) -> usize {
        let interval = self.applications[flow.application].packet_interval;
        ((self.max_cycle_duration / interval - 1e-9).ceil() as usize).max(1)
    }

    /// Returns the egress port preceding the first hop of fragment `k` of the flow, or `None` if
    /// the fragment starts at the device of the application. If several fragments end where
    /// fragment `k` starts, the first one is used.
    pub(crate) fn predecessor(&self, flow: &Flow, k: usize) -> Option<PortId> {
        let first = flow.fragments[k].first_node()?;
        if first == self.applications[flow.application].device {
            return None;
        }
        flow.fragments
            .iter()
            .find(|p| p.len() >= 2 && p.last_node() == Some(first))
            .map(|p| p.ports()[p.len() - 2])
    }

    /// Returns true if fragment `k` ends at a destination of the flow.
    pub(crate) fn ends_at_destination(&self, flow: &Flow, k: usize) -> bool {
        let last = flow.fragments[k].last_node();
        !flow.fragments.iter().any(|p| p.first_node() == last)
    }
}
