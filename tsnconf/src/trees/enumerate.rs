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

//! # Path and Tree Enumeration

use super::{Path, Tree};
use crate::topology::{LinkId, NodeId, NodeRole, PortId, Topology};

use log::*;
use std::collections::HashSet;

/// Returns an iterator over all simple paths from any node in `stop_nodes` to `destination` (see
/// [`PathIter`]).
pub fn collect_all_paths<'a>(
    topology: &'a Topology,
    stop_nodes: &HashSet<NodeId>,
    destination: NodeId,
) -> PathIter<'a> {
    PathIter::new(topology, stop_nodes.clone(), destination)
}

/// Single level of the depth-first search
#[derive(Debug)]
struct Frame {
    /// Links entering the node of this level
    links: Vec<LinkId>,
    /// Next link to explore
    next: usize,
    /// Length of the (reversed) port sequence before this level was entered
    entry_len: usize,
}

/// # Path Iterator
///
/// Lazily enumerates every simple path from any node in the set of stop nodes to the destination.
/// The search starts at the destination and walks the links backwards in the order in which they
/// were created. A branch ends when it reaches a stop node (which yields a path), when it would
/// revisit a node of the current branch, or when it reaches an end device that is no stop node
/// (devices never forward frames). The enumeration is deterministic: creating a new iterator with
/// the same arguments yields the same paths in the same order.
///
/// If the destination itself is a stop node, no path is returned.
#[derive(Debug)]
pub struct PathIter<'a> {
    topology: &'a Topology,
    stop_nodes: HashSet<NodeId>,
    stack: Vec<Frame>,
    nodes: Vec<NodeId>,
    ports: Vec<PortId>,
}

impl<'a> PathIter<'a> {
    fn new(topology: &'a Topology, stop_nodes: HashSet<NodeId>, destination: NodeId) -> Self {
        let mut stack = Vec::new();
        let mut nodes = Vec::new();
        if !stop_nodes.contains(&destination) {
            stack.push(Frame { links: topology.in_links(destination), next: 0, entry_len: 0 });
            nodes.push(destination);
        }
        Self { topology, stop_nodes, stack, nodes, ports: Vec::new() }
    }
}

impl<'a> Iterator for PathIter<'a> {
    type Item = Path;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.stack.last_mut()?;

            // backtrack if all links of this level are explored
            if frame.next >= frame.links.len() {
                let entry_len = frame.entry_len;
                self.stack.pop();
                self.nodes.pop();
                self.ports.truncate(entry_len);
                continue;
            }

            let link = self.topology.link(frame.links[frame.next]);
            frame.next += 1;
            let node = link.source.node;
            if self.nodes.contains(&node) {
                continue;
            }

            let entry_len = self.ports.len();
            if self.ports.is_empty() {
                // ingress port of the destination
                self.ports.push(link.destination);
            }
            self.ports.push(link.source);

            if self.stop_nodes.contains(&node) {
                let path = Path::new(self.ports.iter().rev().copied().collect());
                self.ports.truncate(entry_len);
                return Some(path);
            }

            if self.topology.node(node).role() == NodeRole::Device {
                self.ports.truncate(entry_len);
                continue;
            }

            self.nodes.push(node);
            self.stack.push(Frame { links: self.topology.in_links(node), next: 0, entry_len });
        }
    }
}

/// Enumerates all trees from the source to all destinations. The destinations are processed in
/// order. For each destination that is not yet part of the tree, every path from the current tree
/// to the destination is tried, and all switches of that path join the tree. Once all destinations
/// are processed, the collected paths are canonicalized (see [`Tree::canonical`]).
pub fn collect_all_trees(
    topology: &Topology,
    source: NodeId,
    destinations: &[NodeId],
) -> Vec<Tree> {
    let mut stop_nodes = HashSet::new();
    stop_nodes.insert(source);
    let mut trees = Vec::new();
    collect_trees_rec(topology, &stop_nodes, destinations, Vec::new(), &mut trees);
    debug!(
        "Found {} trees from {} to {} destinations",
        trees.len(),
        topology.node_name(source),
        destinations.len()
    );
    trees
}

fn collect_trees_rec(
    topology: &Topology,
    stop_nodes: &HashSet<NodeId>,
    destinations: &[NodeId],
    current: Vec<Path>,
    trees: &mut Vec<Tree>,
) {
    match destinations.split_first() {
        None => trees.push(Tree::new(current).canonical()),
        Some((destination, rest)) if stop_nodes.contains(destination) => {
            collect_trees_rec(topology, stop_nodes, rest, current, trees)
        }
        Some((destination, rest)) => {
            for path in collect_all_paths(topology, stop_nodes, *destination) {
                // reached devices never forward the stream further
                let mut next_stop_nodes = stop_nodes.clone();
                next_stop_nodes.extend(path.nodes().filter(|n| topology.node(*n).is_switch()));
                let mut next = current.clone();
                next.push(path);
                collect_trees_rec(topology, &next_stop_nodes, rest, next, trees);
            }
        }
    }
}
