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

//! Test the selection of tree subsets on prepared networks.

use crate::error::Infeasibility;
use crate::example_networks::*;
use crate::protection::*;
use crate::selector::*;
use crate::topology::{NodeId, Topology};
use crate::trees::collect_all_trees;

fn id(t: &Topology, name: &str) -> NodeId {
    t.get_node_id(name).unwrap()
}

fn protection(of: &str, any: usize) -> FailureProtection {
    FailureProtection::new(of.parse().unwrap(), any)
}

#[test]
fn ring_tree_cost() {
    let t = RingNet::topology();
    let trees = collect_all_trees(&t, id(&t, "S"), &[id(&t, "D")]);
    for tree in trees.iter() {
        assert_eq!(tree_cost(tree, id(&t, "S"), &[id(&t, "D")]), 4.0);
        assert_eq!(tree_cost(tree, id(&t, "S"), &[id(&t, "D"), id(&t, "C")]), 7.0);
        // unreachable destinations do not count
        assert_eq!(tree_cost(tree, id(&t, "D"), &[id(&t, "S")]), 0.0);
    }
}

#[test]
fn ring_without_protection() {
    let t = RingNet::topology();
    let (s, d) = (id(&t, "S"), id(&t, "D"));
    let trees = collect_all_trees(&t, s, &[d]);
    let selected = select_best_tree_subset(&t, "s", s, &[d], &trees, None, &[], &[]).unwrap();
    assert_eq!(selected, vec![trees[0].clone()]);
}

#[test]
fn ring_with_node_protection() {
    let t = RingNet::topology();
    let (s, d) = (id(&t, "S"), id(&t, "D"));
    let trees = collect_all_trees(&t, s, &[d]);
    let p = vec![protection("B or E", 1)];
    let selected = select_best_tree_subset(&t, "s", s, &[d], &trees, None, &p, &[]).unwrap();
    assert_eq!(selected, trees);

    match select_best_tree_subset(&t, "s", s, &[d], &trees, Some(1), &p, &[]) {
        Err(Infeasibility::NoProtectingTreeSubset { stream, max_redundancy, violated }) => {
            assert_eq!(stream, "s");
            assert_eq!(max_redundancy, 1);
            let violated = violated.unwrap();
            assert_eq!(violated.kind, FailureKind::Node);
            assert_eq!(violated.failed, vec!["E".to_string()]);
        }
        r => panic!("Unexpected result: {:?}", r),
    }
}

#[test]
fn unprotectable_requirement() {
    let t = RingNet::topology();
    let (s, d) = (id(&t, "S"), id(&t, "D"));
    let trees = collect_all_trees(&t, s, &[d]);
    let p = vec![protection("A", 1)];
    let result = select_best_tree_subset(&t, "s", s, &[d], &trees, None, &p, &[]);
    assert!(matches!(result, Err(Infeasibility::NoProtectingTreeSubset { max_redundancy: 2, .. })));
}

#[test]
fn ladder_with_link_protection() {
    let t = LadderNet::topology();
    let s = id(&t, "S");
    let destinations = vec![id(&t, "D1"), id(&t, "D2")];
    let trees = collect_all_trees(&t, s, &destinations);
    let p = vec![protection("A2->A3 or B2->B3", 1)];

    // no single tree avoids both links
    for tree in trees.iter() {
        assert!(check_link_failure_protection(&t, s, &destinations, &[tree.clone()], &p).is_err());
    }

    let selected = select_best_tree_subset(&t, "s", s, &destinations, &trees, None, &[], &p).unwrap();
    assert_eq!(selected.len(), 2);
    assert_eq!(check_link_failure_protection(&t, s, &destinations, &selected, &p), Ok(()));

    // the selected trees are the cheapest pair
    let cost = |ts: &[crate::trees::Tree]| {
        ts.iter().map(|x| tree_cost(x, s, &destinations)).sum::<f64>() / ts.len() as f64
    };
    for a in 0..trees.len() {
        for b in a + 1..trees.len() {
            let pair = [trees[a].clone(), trees[b].clone()];
            if check_link_failure_protection(&t, s, &destinations, &pair, &p).is_ok() {
                assert!(cost(&selected) <= cost(&pair));
            }
        }
    }
}
