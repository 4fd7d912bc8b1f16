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

//! # Redundancy Tree Selection
//!
//! Out of all candidate trees of a stream, the selector chooses the cheapest subset that satisfies
//! all failure protection requirements. Subsets of size `k = 1, 2, ...` are tried in turn, and the
//! first size for which any subset qualifies determines the result. Within one size, the subset
//! with the lowest average tree cost wins. Among equal costs, the subset found first (in reverse
//! lexicographic mask order) is kept.

use crate::error::Infeasibility;
use crate::permutators::k_of_n;
use crate::protection::{
    check_link_failure_protection, check_node_failure_protection, FailureProtection,
    ProtectionFailure,
};
use crate::topology::{NodeId, Topology};
use crate::trees::Tree;

use log::*;
use std::collections::{HashMap, HashSet, VecDeque};

/// Computes the cost of a tree: the sum over all destinations of the number of hops from the
/// source to that destination. The paths are followed breadth-first from the source, and each
/// destination is counted when it is reached for the first time. Unreachable destinations do not
/// contribute.
pub fn tree_cost(tree: &Tree, source: NodeId, destinations: &[NodeId]) -> f64 {
    let mut cost: HashMap<NodeId, usize> = HashMap::new();
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut todo: VecDeque<(NodeId, usize)> = VecDeque::new();
    todo.push_back((source, 0));
    while let Some((start, start_cost)) = todo.pop_front() {
        if !visited.insert(start) {
            continue;
        }
        for path in tree.paths().iter().filter(|p| p.first_node() == Some(start)) {
            for (i, node) in path.nodes().enumerate().skip(1) {
                cost.entry(node).or_insert(start_cost + i);
                todo.push_back((node, start_cost + i));
            }
        }
    }
    destinations.iter().filter_map(|d| cost.get(d)).sum::<usize>() as f64
}

/// Searches the cheapest subset of `n` elements that is accepted, with increasing subset size from
/// 1 up to `max_redundancy`. `cost` returns the cost of a single element, and the cost of a subset
/// is the average cost of its elements. `accept` is only called for subsets that are cheaper than
/// the best subset found so far with the same size.
///
/// Returns the indices of the selected subset in ascending order. If no subset is accepted, the
/// rejection of the last rejected subset (if any) is returned.
pub fn select_best_subset<E, C, A>(
    n: usize,
    max_redundancy: usize,
    cost: C,
    mut accept: A,
) -> Result<Vec<usize>, Option<E>>
where
    C: Fn(usize) -> f64,
    A: FnMut(&[usize]) -> Result<(), E>,
{
    let costs: Vec<f64> = (0..n).map(cost).collect();
    let mut last_rejection: Option<E> = None;
    for k in 1..=max_redundancy.min(n) {
        let mut best: Option<(f64, Vec<usize>)> = None;
        for mask in k_of_n(k, n) {
            let subset: Vec<usize> = (0..n).filter(|i| mask[*i]).collect();
            let subset_cost = subset.iter().map(|i| costs[*i]).sum::<f64>() / k as f64;
            if best.as_ref().map(|(c, _)| subset_cost < *c).unwrap_or(true) {
                match accept(&subset) {
                    Ok(()) => best = Some((subset_cost, subset)),
                    Err(e) => last_rejection = Some(e),
                }
            }
        }
        if let Some((c, subset)) = best {
            debug!("Selected subset {:?} of size {} with average cost {}", subset, k, c);
            return Ok(subset);
        }
    }
    Err(last_rejection)
}

/// Selects the best subset of the candidate trees for a stream, protecting it against all
/// configured node and link failures. If `max_redundancy` is `None`, all candidate trees may be
/// used at once.
#[allow(clippy::too_many_arguments)]
pub fn select_best_tree_subset(
    topology: &Topology,
    stream: &str,
    source: NodeId,
    destinations: &[NodeId],
    trees: &[Tree],
    max_redundancy: Option<usize>,
    node_failure_protection: &[FailureProtection],
    link_failure_protection: &[FailureProtection],
) -> Result<Vec<Tree>, Infeasibility> {
    let max_redundancy = max_redundancy.unwrap_or_else(|| trees.len());
    let result = select_best_subset(
        trees.len(),
        max_redundancy,
        |i| tree_cost(&trees[i], source, destinations),
        |subset: &[usize]| -> Result<(), ProtectionFailure> {
            let candidate: Vec<Tree> = subset.iter().map(|i| trees[*i].clone()).collect();
            check_node_failure_protection(
                topology,
                source,
                destinations,
                &candidate,
                node_failure_protection,
            )?;
            check_link_failure_protection(
                topology,
                source,
                destinations,
                &candidate,
                link_failure_protection,
            )
        },
    );
    match result {
        Ok(subset) => Ok(subset.into_iter().map(|i| trees[i].clone()).collect()),
        Err(violated) => Err(Infeasibility::NoProtectingTreeSubset {
            stream: stream.to_string(),
            max_redundancy,
            violated,
        }),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn minimal_subset() {
        // three trees with costs 10, 12 and 15. Only subsets containing tree 1 and tree 2 protect
        // the stream.
        let costs = [10.0, 12.0, 15.0];
        let mut checked: Vec<Vec<usize>> = Vec::new();
        let result = select_best_subset(
            3,
            3,
            |i| costs[i],
            |s: &[usize]| {
                checked.push(s.to_vec());
                if s.contains(&0) && s.contains(&1) {
                    Ok(())
                } else {
                    Err(s.to_vec())
                }
            },
        );
        assert_eq!(result, Ok(vec![0, 1]));
        // {0, 2} and {1, 2} are more expensive than {0, 1}, so they are never checked
        assert_eq!(checked, vec![vec![0], vec![1], vec![2], vec![0, 1]]);
    }

    #[test]
    fn first_found_on_tie() {
        let result: Result<_, Option<()>> = select_best_subset(3, 3, |_| 1.0, |_| Ok(()));
        assert_eq!(result, Ok(vec![0]));
    }

    #[test]
    fn cheapest_of_same_size() {
        let costs = [5.0, 3.0, 4.0];
        let result: Result<_, Option<()>> = select_best_subset(3, 3, |i| costs[i], |_| Ok(()));
        assert_eq!(result, Ok(vec![1]));
    }

    #[test]
    fn max_redundancy_exceeded() {
        let result = select_best_subset(3, 1, |_| 1.0, |s: &[usize]| Err(s.len()));
        assert_eq!(result, Err(Some(1)));
        let result: Result<_, Option<()>> = select_best_subset(0, 3, |_| 1.0, |_| Ok(()));
        assert_eq!(result, Err(None));
    }
}
