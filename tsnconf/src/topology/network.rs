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
//! The `Topology` stores all network nodes with their ports, and the directed links between the
//! ports.

use crate::topology::types::{
    IndexType, Link, LinkId, NetworkNode, NodeId, NodeRole, Port, PortId, PortParameters,
    TopologyError,
};

use log::*;
use petgraph::prelude::*;
use std::collections::HashMap;

/// # Topology
///
/// The topology is a directed graph, where each vertex is a [`NetworkNode`] and each edge is a
/// [`Link`]. Every physical connection between two ports is stored as two links, one in each
/// direction. Iteration over nodes and links always happens in the order in which they were
/// created, which makes every algorithm on the topology deterministic.
///
/// ```
/// use tsnconf::topology::Topology;
///
/// let mut t = Topology::new();
/// let s = t.add_device("S");
/// let a = t.add_switch("A");
/// let d = t.add_device("D");
/// t.add_link(s, a);
/// t.add_link(a, d);
///
/// assert_eq!(t.get_node_id("A").unwrap(), a);
/// assert_eq!(t.node(a).ports().len(), 2);
/// assert!(t.find_link(s, a).is_some());
/// assert!(t.find_link(s, d).is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Topology {
    graph: Graph<NetworkNode, Link, Directed, IndexType>,
    names: HashMap<String, NodeId>,
}

impl Topology {
    /// Generate an empty topology
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an end device to the topology. Node names must be unique.
    pub fn add_device(&mut self, name: impl Into<String>) -> NodeId {
        self.add_node(name.into(), NodeRole::Device)
    }

    /// Add a switch to the topology. Node names must be unique.
    pub fn add_switch(&mut self, name: impl Into<String>) -> NodeId {
        self.add_node(name.into(), NodeRole::Switch)
    }

    pub(crate) fn add_node(&mut self, name: String, role: NodeRole) -> NodeId {
        let id = self.graph.add_node(NetworkNode::new(name.clone(), role));
        self.names.insert(name, id);
        id
    }

    /// Add a port with the given name and attributes to a node. The port is not yet connected.
    pub fn add_port(
        &mut self,
        node: NodeId,
        name: impl Into<String>,
        params: PortParameters,
    ) -> PortId {
        let ports = &mut self.graph[node].ports;
        ports.push(Port { name: name.into(), params, link: None });
        PortId::new(node, ports.len() - 1)
    }

    /// Connect two ports by a bidirectional cable. Returns the link from `a` to `b`, and the link
    /// from `b` to `a`.
    pub fn connect(
        &mut self,
        a: PortId,
        b: PortId,
        propagation_time: f64,
    ) -> Result<(LinkId, LinkId), TopologyError> {
        if a == b {
            return Err(TopologyError::SelfLoop(
                self.node_name(a.node).to_string(),
                self.port(a).name.clone(),
            ));
        }
        for p in [a, b].iter() {
            if self.port(*p).link.is_some() {
                return Err(TopologyError::AlreadyConnected(
                    self.node_name(p.node).to_string(),
                    self.port(*p).name.clone(),
                ));
            }
        }
        Ok(self.link_ports(a, b, propagation_time))
    }

    fn link_ports(&mut self, a: PortId, b: PortId, propagation_time: f64) -> (LinkId, LinkId) {
        let forward = self.graph.add_edge(
            a.node,
            b.node,
            Link { source: a, destination: b, propagation_time },
        );
        let backward = self.graph.add_edge(
            b.node,
            a.node,
            Link { source: b, destination: a, propagation_time },
        );
        self.graph[a.node].ports[a.index].link = Some(forward);
        self.graph[b.node].ports[b.index].link = Some(backward);
        trace!("connected {} and {}", self.port_name(a), self.port_name(b));
        (forward, backward)
    }

    /// Connect two nodes with a new cable using default port attributes and no propagation delay.
    /// On both nodes, a new port named `eth<n>` is created. Returns the link from `a` to `b`.
    pub fn add_link(&mut self, a: NodeId, b: NodeId) -> LinkId {
        self.add_link_with(a, b, PortParameters::default(), 0.0)
    }

    /// Connect two nodes with a new cable, creating a new port named `eth<n>` on both nodes with
    /// the given attributes. Returns the link from `a` to `b`.
    pub fn add_link_with(
        &mut self,
        a: NodeId,
        b: NodeId,
        params: PortParameters,
        propagation_time: f64,
    ) -> LinkId {
        let name_a = format!("eth{}", self.graph[a].ports.len());
        let port_a = self.add_port(a, name_a, params.clone());
        let name_b = format!("eth{}", self.graph[b].ports.len());
        let port_b = self.add_port(b, name_b, params);
        self.link_ports(port_a, port_b, propagation_time).0
    }

    /// Returns a reference to the node. **Panics** if the node does not exist.
    pub fn node(&self, node: NodeId) -> &NetworkNode {
        &self.graph[node]
    }

    pub(crate) fn node_mut(&mut self, node: NodeId) -> &mut NetworkNode {
        &mut self.graph[node]
    }

    /// Returns the name of the node
    pub fn node_name(&self, node: NodeId) -> &str {
        &self.graph[node].name
    }

    /// Returns the node id of the node with the given name
    pub fn get_node_id(&self, name: &str) -> Result<NodeId, TopologyError> {
        self.names.get(name).copied().ok_or_else(|| TopologyError::NodeNotFound(name.to_string()))
    }

    /// Returns an iterator over all nodes, in the order in which they were added.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.node_indices()
    }

    /// Returns the number of nodes
    pub fn num_nodes(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns a reference to the port. **Panics** if the port does not exist.
    pub fn port(&self, port: PortId) -> &Port {
        &self.graph[port.node].ports[port.index]
    }

    /// Returns the full name of the port, formatted as `node.interface`
    pub fn port_name(&self, port: PortId) -> String {
        format!("{}.{}", self.node_name(port.node), self.port(port).name)
    }

    /// Returns the port of the node with the given interface name
    pub fn find_port(&self, node: NodeId, interface: &str) -> Result<PortId, TopologyError> {
        self.graph[node]
            .ports
            .iter()
            .position(|p| p.name == interface)
            .map(|index| PortId::new(node, index))
            .ok_or_else(|| {
                TopologyError::InterfaceNotFound(
                    self.node_name(node).to_string(),
                    interface.to_string(),
                )
            })
    }

    /// Returns a reference to the link. **Panics** if the link does not exist.
    pub fn link(&self, link: LinkId) -> &Link {
        &self.graph[link]
    }

    /// Returns the name of the link, formatted as `source->destination`.
    pub fn link_name(&self, link: LinkId) -> String {
        let l = &self.graph[link];
        format!("{}->{}", self.node_name(l.source.node), self.node_name(l.destination.node))
    }

    /// Returns all directed links, in the order in which they were added.
    pub fn link_ids(&self) -> impl Iterator<Item = LinkId> + '_ {
        self.graph.edge_indices()
    }

    /// Returns all links leaving the node, in the order in which they were added.
    pub fn out_links(&self, node: NodeId) -> Vec<LinkId> {
        let mut links: Vec<LinkId> =
            self.graph.edges_directed(node, Outgoing).map(|e| e.id()).collect();
        links.sort();
        links
    }

    /// Returns all links entering the node, in the order in which they were added.
    pub fn in_links(&self, node: NodeId) -> Vec<LinkId> {
        let mut links: Vec<LinkId> =
            self.graph.edges_directed(node, Incoming).map(|e| e.id()).collect();
        links.sort();
        links
    }

    /// Returns the first link from `from` to `to`, or `None` if they are not adjacent.
    pub fn find_link(&self, from: NodeId, to: NodeId) -> Option<LinkId> {
        self.out_links(from).into_iter().find(|l| self.graph[*l].destination.node == to)
    }

    /// Returns the number of cables connecting `a` and `b`.
    pub fn num_links_between(&self, a: NodeId, b: NodeId) -> usize {
        self.out_links(a).into_iter().filter(|l| self.graph[*l].destination.node == b).count()
    }

    /// Returns the port on the other end of the cable connected to `port`.
    pub fn remote_port(&self, port: PortId) -> Option<PortId> {
        self.port(port).link.map(|l| self.graph[l].destination)
    }

    /// Returns the propagation delay of the cable connected to the port (zero if unconnected).
    pub fn propagation_time(&self, port: PortId) -> f64 {
        self.port(port).link.map(|l| self.graph[l].propagation_time).unwrap_or(0.0)
    }

    /// Returns the underlying graph
    pub(crate) fn graph(&self) -> &Graph<NetworkNode, Link, Directed, IndexType> {
        &self.graph
    }

    /// Remove all stream configuration derived by a previous configuration pass.
    pub fn clear_stream_configuration(&mut self) {
        for node in self.graph.node_weights_mut() {
            node.streams.clear();
        }
    }
}
