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

//! # Failure Protection
//!
//! A stream may require protection against node or link failures, declared as "any `k` out of the
//! nodes (links) matching a pattern". A set of trees protects the stream if, for every combination
//! of `k` failed elements, all destinations remain reachable from the source over the trees. Links
//! are named `source->destination`, and each direction of a cable is a separate link.
//!
//! Combinations are enumerated as boolean masks in reverse lexicographic order (see
//! [`k_of_n`](crate::permutators::k_of_n)). None of the functions modify any state, so they can
//! be called repeatedly while searching for the best tree subset.

use crate::permutators::k_of_n;
use crate::topology::{LinkId, NamePattern, NodeId, Topology};
use crate::trees::Tree;

use log::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fmt;

/// Protection against the failure of any `any` elements out of those matching `of`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FailureProtection {
    /// Pattern selecting the nodes or links that may fail
    #[serde(default)]
    pub of: NamePattern,
    /// Number of simultaneous failures
    pub any: usize,
}

impl FailureProtection {
    /// Create a new failure protection requirement
    pub fn new(of: NamePattern, any: usize) -> Self {
        Self { of, any }
    }
}

/// Kind of failing element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Network nodes fail
    Node,
    /// Directed links fail
    Link,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node => write!(f, "node"),
            Self::Link => write!(f, "link"),
        }
    }
}

/// Protection requirement which is not satisfied, together with a failure combination that
/// disconnects at least one destination.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtectionFailure {
    /// Kind of failing elements
    pub kind: FailureKind,
    /// Requirement which is violated
    pub requirement: FailureProtection,
    /// Names of the failed elements that disconnect a destination
    pub failed: Vec<String>,
}

impl fmt::Display for ProtectionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failure of any {} of \"{}\" (e.g., failing [{}])",
            self.kind,
            self.requirement.any,
            self.requirement.of,
            self.failed.join(", ")
        )
    }
}

/// Check that the trees protect all destinations against all configured node failures.
pub fn check_node_failure_protection(
    topology: &Topology,
    source: NodeId,
    destinations: &[NodeId],
    trees: &[Tree],
    protections: &[FailureProtection],
) -> Result<(), ProtectionFailure> {
    for protection in protections {
        let nodes: Vec<NodeId> = topology
            .node_ids()
            .filter(|n| protection.of.matches(topology.node_name(*n)))
            .collect();
        for mask in k_of_n(protection.any, nodes.len()) {
            let failed: HashSet<NodeId> = selected(&nodes, &mask).collect();
            let reached = reached_nodes(topology, source, trees, &failed, &HashSet::new());
            if !destinations.iter().all(|d| reached.contains(d)) {
                let failure = ProtectionFailure {
                    kind: FailureKind::Node,
                    requirement: protection.clone(),
                    failed: selected(&nodes, &mask)
                        .map(|n| topology.node_name(n).to_string())
                        .collect(),
                };
                trace!("Trees do not protect against {}", failure);
                return Err(failure);
            }
        }
    }
    Ok(())
}

/// Check that the trees protect all destinations against all configured link failures.
pub fn check_link_failure_protection(
    topology: &Topology,
    source: NodeId,
    destinations: &[NodeId],
    trees: &[Tree],
    protections: &[FailureProtection],
) -> Result<(), ProtectionFailure> {
    for protection in protections {
        let links: Vec<LinkId> =
            topology.link_ids().filter(|l| protection.of.matches(&topology.link_name(*l))).collect();
        for mask in k_of_n(protection.any, links.len()) {
            let failed: HashSet<LinkId> = selected(&links, &mask).collect();
            let reached = reached_nodes(topology, source, trees, &HashSet::new(), &failed);
            if !destinations.iter().all(|d| reached.contains(d)) {
                let failure = ProtectionFailure {
                    kind: FailureKind::Link,
                    requirement: protection.clone(),
                    failed: selected(&links, &mask).map(|l| topology.link_name(l)).collect(),
                };
                trace!("Trees do not protect against {}", failure);
                return Err(failure);
            }
        }
    }
    Ok(())
}

fn selected<'a, T: Copy>(elements: &'a [T], mask: &'a [bool]) -> impl Iterator<Item = T> + 'a {
    elements.iter().zip(mask.iter()).filter(|(_, m)| **m).map(|(e, _)| *e)
}

/// Forward reachability walk from the source over all paths of all trees. A path is followed from
/// its first node until it hits a failed node or traverses a failed link. Nodes reached this way
/// serve as starting points for further paths.
pub(crate) fn reached_nodes(
    topology: &Topology,
    source: NodeId,
    trees: &[Tree],
    failed_nodes: &HashSet<NodeId>,
    failed_links: &HashSet<LinkId>,
) -> HashSet<NodeId> {
    let mut reached: HashSet<NodeId> = HashSet::new();
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut todo: VecDeque<NodeId> = VecDeque::new();
    todo.push_back(source);
    while let Some(start) = todo.pop_front() {
        if !visited.insert(start) {
            continue;
        }
        for path in trees.iter().flat_map(|t| t.paths()) {
            if path.first_node() != Some(start) {
                continue;
            }
            for (i, node) in path.nodes().enumerate() {
                if failed_nodes.contains(&node) {
                    break;
                }
                if i > 0 {
                    if let Some(link) = path.hop_link(topology, i) {
                        if failed_links.contains(&link) {
                            break;
                        }
                    }
                }
                reached.insert(node);
                todo.push_back(node);
            }
        }
    }
    reached
}
