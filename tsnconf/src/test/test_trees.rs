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

//! Test the enumeration of paths and trees.

use crate::example_networks::*;
use crate::protection::reached_nodes;
use crate::topology::{NodeId, Topology};
use crate::trees::*;

use std::collections::HashSet;

fn id(t: &Topology, name: &str) -> NodeId {
    t.get_node_id(name).unwrap()
}

#[test]
fn ring_paths() {
    let t = RingNet::topology();
    let mut stop = HashSet::new();
    stop.insert(id(&t, "S"));
    let paths: Vec<Vec<String>> =
        collect_all_paths(&t, &stop, id(&t, "D")).map(|p| p.names(&t)).collect();
    assert_eq!(paths, vec![vec!["S", "A", "B", "C", "D"], vec!["S", "A", "E", "C", "D"]]);
}

#[test]
fn path_iter_is_restartable() {
    let t = LadderNet::topology();
    let mut stop = HashSet::new();
    stop.insert(id(&t, "S"));
    let first: Vec<Path> = collect_all_paths(&t, &stop, id(&t, "D1")).collect();
    let second: Vec<Path> = collect_all_paths(&t, &stop, id(&t, "D1")).collect();
    assert!(!first.is_empty());
    assert_eq!(first, second);
    // no path is returned twice
    let unique: HashSet<&Path> = first.iter().collect();
    assert_eq!(unique.len(), first.len());
}

#[test]
fn no_path_to_stop_node() {
    let t = RingNet::topology();
    let mut stop = HashSet::new();
    stop.insert(id(&t, "S"));
    assert_eq!(collect_all_paths(&t, &stop, id(&t, "S")).count(), 0);
}

#[test]
fn devices_never_forward() {
    // S -- A -- X -- B -- D, where X is a device
    let mut t = Topology::new();
    let s = t.add_device("S");
    let a = t.add_switch("A");
    let x = t.add_device("X");
    let b = t.add_switch("B");
    let d = t.add_device("D");
    t.add_link(s, a);
    t.add_link(a, x);
    t.add_link(x, b);
    t.add_link(b, d);
    assert!(collect_all_trees(&t, s, &[d]).is_empty());
    assert_eq!(collect_all_trees(&t, s, &[x]).len(), 1);
    // X is a destination, but still does not forward towards D
    assert!(collect_all_trees(&t, s, &[x, d]).is_empty());
}

#[test]
fn ring_trees() {
    let t = RingNet::topology();
    let trees = collect_all_trees(&t, id(&t, "S"), &[id(&t, "D")]);
    assert_eq!(trees.len(), 2);
    assert_eq!(trees[0].names(&t), vec![vec!["S", "A", "B", "C", "D"]]);
    assert_eq!(trees[1].names(&t), vec![vec!["S", "A", "E", "C", "D"]]);
}

#[test]
fn multicast_trees() {
    let t = LadderNet::topology();
    let s = id(&t, "S");
    let destinations = vec![id(&t, "D1"), id(&t, "D2")];
    let trees = collect_all_trees(&t, s, &destinations);
    assert!(trees.len() > 2);

    for tree in trees.iter() {
        // every tree reaches all destinations
        let reached = reached_nodes(&t, s, &[tree.clone()], &HashSet::new(), &HashSet::new());
        assert!(destinations.iter().all(|d| reached.contains(d)));

        // every node is entered by at most one path
        let mut entered: HashSet<NodeId> = HashSet::new();
        for path in tree.paths() {
            for node in path.nodes().skip(1) {
                assert!(entered.insert(node), "{:?} is not canonical", tree.names(&t));
            }
        }

        // only the source and switches send frames
        for path in tree.paths() {
            for node in path.nodes().take(path.len() - 1) {
                assert!(node == s || t.node(node).is_switch());
            }
        }

        // the tree is canonical
        assert_eq!(&tree.canonical(), tree);
    }

    // the enumeration is deterministic
    assert_eq!(trees, collect_all_trees(&t, s, &destinations));
}
