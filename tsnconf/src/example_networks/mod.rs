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

//! Networks for testing

use crate::config::{ConfigError, Configuration};
use crate::topology::{NodeId, Topology};

mod linenet;
pub use linenet::LineNet;

mod ringnet;
pub use ringnet::RingNet;

mod diamondnet;
pub use diamondnet::DiamondNet;

mod laddernet;
pub use laddernet::LadderNet;

/// Trait for easier access to example networks.
pub trait ExampleNetwork {
    /// Get the topology
    fn topology() -> Topology;
    /// Get the configuration of all streams
    fn configuration() -> Result<Configuration, ConfigError>;
}

/// Names of all example networks
pub const EXAMPLE_NETWORKS: [&str; 4] = ["line", "ring", "diamond", "ladder"];

/// Returns the topology and configuration of the example network with the given name, or `None`
/// if no such network exists (see [`EXAMPLE_NETWORKS`]).
pub fn by_name(name: &str) -> Option<Result<(Topology, Configuration), ConfigError>> {
    fn get<N: ExampleNetwork>() -> Result<(Topology, Configuration), ConfigError> {
        Ok((N::topology(), N::configuration()?))
    }
    match name.to_lowercase().as_str() {
        "line" | "linenet" => Some(get::<LineNet>()),
        "ring" | "ringnet" => Some(get::<RingNet>()),
        "diamond" | "diamondnet" => Some(get::<DiamondNet>()),
        "ladder" | "laddernet" => Some(get::<LadderNet>()),
        _ => None,
    }
}

/// Add a device with a single interface `eth0` carrying the MAC address, connected to the switch.
fn add_device_at(topology: &mut Topology, name: &str, switch: NodeId, mac: &str) -> NodeId {
    let device = topology.add_device(name);
    let link = topology.add_link(device, switch);
    let port = topology.link(link).source;
    topology.node_mut(device).ports[port.index].params.mac_address = Some(mac.to_string());
    device
}
