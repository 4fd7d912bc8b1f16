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

//! # Paths and Trees
//!
//! A [`Path`] is an ordered sequence of ports, one per node it visits. Every port except the last
//! one is the port over which the frame leaves the node towards the next node of the path. The last
//! port is the port over which the frame enters the last node. A [`Tree`] is a set of paths
//! connecting a source to all destinations.

use crate::topology::{split_reference, LinkId, NodeId, PortId, Topology, TopologyError};

/// Path through the network, represented as the sequence of ports along the path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    ports: Vec<PortId>,
}

impl Path {
    /// Create a new path from the sequence of ports.
    pub fn new(ports: Vec<PortId>) -> Self {
        Self { ports }
    }

    /// Build a path from node names. Each element is either the name of a node, or `node.interface`
    /// to choose one out of several parallel cables. Without an interface, the first cable towards
    /// the next node is used.
    pub fn from_names<S: AsRef<str>>(topology: &Topology, names: &[S]) -> Result<Self, TopologyError> {
        if names.len() < 2 {
            return Err(TopologyError::PathTooShort);
        }
        let mut elements: Vec<(NodeId, Option<PortId>)> = Vec::with_capacity(names.len());
        for name in names.iter() {
            let name = name.as_ref();
            let element = match topology.get_node_id(name) {
                Ok(node) => (node, None),
                Err(e) => match split_reference(name) {
                    Some((node, iface)) => {
                        let node = topology.get_node_id(node)?;
                        (node, Some(topology.find_port(node, iface)?))
                    }
                    None => return Err(e),
                },
            };
            elements.push(element);
        }

        let not_adjacent = |a: NodeId, b: NodeId| {
            TopologyError::NotAdjacent(
                topology.node_name(a).to_string(),
                topology.node_name(b).to_string(),
            )
        };

        let n = elements.len();
        let mut ports = Vec::with_capacity(n);
        let mut ingress: Option<PortId> = None;
        for i in 0..(n - 1) {
            let (node, port) = elements[i];
            let next = elements[i + 1].0;
            let link = match port {
                Some(p) => topology
                    .port(p)
                    .link()
                    .filter(|l| topology.link(*l).destination.node == next),
                None => topology.find_link(node, next),
            }
            .ok_or_else(|| not_adjacent(node, next))?;
            ports.push(topology.link(link).source);
            ingress = Some(topology.link(link).destination);
        }
        let last = match (elements[n - 1].1, ingress) {
            (Some(p), _) => p,
            (None, Some(p)) => p,
            (None, None) => return Err(TopologyError::PathTooShort),
        };
        ports.push(last);
        Ok(Self { ports })
    }

    /// Returns the sequence of ports.
    pub fn ports(&self) -> &[PortId] {
        &self.ports
    }

    /// Returns the number of nodes on the path.
    pub fn len(&self) -> usize {
        self.ports.len()
    }

    /// Returns true if the path visits no node.
    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    /// Returns the `i`-th node of the path.
    pub fn node(&self, i: usize) -> NodeId {
        self.ports[i].node
    }

    /// Iterates over all nodes of the path.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.ports.iter().map(|p| p.node)
    }

    /// Returns the first node
    pub fn first_node(&self) -> Option<NodeId> {
        self.ports.first().map(|p| p.node)
    }

    /// Returns the last node
    pub fn last_node(&self) -> Option<NodeId> {
        self.ports.last().map(|p| p.node)
    }

    /// Returns the position of the node on the path
    pub fn position(&self, node: NodeId) -> Option<usize> {
        self.ports.iter().position(|p| p.node == node)
    }

    /// Returns the link traversed between node `i - 1` and node `i`.
    pub fn hop_link(&self, topology: &Topology, i: usize) -> Option<LinkId> {
        if i == 0 || i >= self.ports.len() {
            return None;
        }
        let to = self.ports[i].node;
        topology
            .port(self.ports[i - 1])
            .link()
            .filter(|l| topology.link(*l).destination.node == to)
            .or_else(|| topology.find_link(self.ports[i - 1].node, to))
    }

    /// Returns the port over which the frame leaves node `i` towards node `i + 1`.
    pub fn egress_port(&self, topology: &Topology, i: usize) -> Option<PortId> {
        self.hop_link(topology, i + 1).map(|l| topology.link(l).source)
    }

    /// Returns the port over which the frame enters node `i` from node `i - 1`.
    pub fn ingress_port(&self, topology: &Topology, i: usize) -> Option<PortId> {
        self.hop_link(topology, i).map(|l| topology.link(l).destination)
    }

    /// Returns the names of all elements. The interface is only added to the node name
    /// (`node.interface`) if there are parallel cables to the neighbor on the path.
    pub fn names(&self, topology: &Topology) -> Vec<String> {
        let n = self.ports.len();
        (0..n)
            .map(|i| {
                let node = self.ports[i].node;
                let neighbor = if i + 1 < n {
                    Some(self.ports[i + 1].node)
                } else if i > 0 {
                    Some(self.ports[i - 1].node)
                } else {
                    None
                };
                match neighbor {
                    Some(x) if topology.num_links_between(node, x) > 1 => {
                        topology.port_name(self.ports[i])
                    }
                    _ => topology.node_name(node).to_string(),
                }
            })
            .collect()
    }

    /// Appends `other` to this path. The last node of this path must be the first node of `other`.
    fn extend(&mut self, other: &Path) {
        self.ports.pop();
        self.ports.extend(other.ports.iter().copied());
    }

    /// Splits the path at position `i`. Both parts contain node `i`.
    fn split_at(&self, i: usize) -> (Path, Path) {
        (Path::new(self.ports[..=i].to_vec()), Path::new(self.ports[i..].to_vec()))
    }
}

/// Tree connecting a source to a set of destinations, represented as a set of paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Tree {
    paths: Vec<Path>,
}

impl Tree {
    /// Create a tree from the given paths, without canonicalizing it.
    pub fn new(paths: Vec<Path>) -> Self {
        Self { paths }
    }

    /// Build a tree from lists of node names (see [`Path::from_names`]).
    pub fn from_names<S: AsRef<str>>(
        topology: &Topology,
        paths: &[Vec<S>],
    ) -> Result<Self, TopologyError> {
        Ok(Self {
            paths: paths.iter().map(|p| Path::from_names(topology, p)).collect::<Result<_, _>>()?,
        })
    }

    /// Returns all paths of the tree
    pub fn paths(&self) -> &[Path] {
        &self.paths
    }

    /// Returns all nodes of the tree, in the order of their first appearance.
    pub fn nodes(&self) -> Vec<NodeId> {
        let mut nodes = Vec::new();
        for n in self.paths.iter().flat_map(|p| p.nodes()) {
            if !nodes.contains(&n) {
                nodes.push(n);
            }
        }
        nodes
    }

    /// Returns the names of all paths (see [`Path::names`]).
    pub fn names(&self, topology: &Topology) -> Vec<Vec<String>> {
        self.paths.iter().map(|p| p.names(topology)).collect()
    }

    /// Computes the canonical form of the tree, where no node is entered by more than one path.
    /// The paths are processed in order:
    ///
    /// 1. If the path starts where an existing path starts, it is added as a new branch.
    /// 2. Else, if the path starts where an existing path ends, the existing path is extended.
    /// 3. Else, if the path starts inside an existing path, the existing path is split at that node
    ///    into two fragments, and both fragments are added, followed by the new path.
    /// 4. Else, the path is added as it is.
    ///
    /// Canonicalizing a canonical tree yields the identical tree.
    pub fn canonical(&self) -> Tree {
        let mut result: Vec<Path> = Vec::with_capacity(self.paths.len());
        for path in self.paths.iter().filter(|p| !p.is_empty()) {
            let start = path.first_node();
            if result.iter().any(|p| p.first_node() == start) {
                result.push(path.clone());
            } else if let Some(p) = result.iter_mut().find(|p| p.last_node() == start) {
                p.extend(path);
            } else if let Some((pos, i)) = result.iter().enumerate().find_map(|(pos, p)| {
                start.and_then(|s| p.position(s)).map(|i| (pos, i))
            }) {
                let (head, tail) = result.remove(pos).split_at(i);
                result.push(head);
                result.push(tail);
                result.push(path.clone());
            } else {
                result.push(path.clone());
            }
        }
        Tree { paths: result }
    }
}
