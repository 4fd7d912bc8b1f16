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

//! Start offsets of applications.

use super::input::{Flow, Input};
use super::schedule::{PortSchedule, Slot};
use crate::error::Infeasibility;
use crate::topology::{NodeId, PortId};

use log::*;
use std::collections::{BTreeMap, HashMap};

const TOLERANCE: f64 = 1e-12;

/// Earliest time at or after `time` at which a transmission of duration `tx` fits entirely into a
/// slot of the periodic schedule.
pub(crate) fn earliest_fit(time: f64, tx: f64, cycle: f64, slots: &[Slot]) -> Option<f64> {
    if cycle <= 0.0 {
        return None;
    }
    let first = (time / cycle).floor().max(0.0);
    for k in 0..3 {
        let base = (first + k as f64) * cycle;
        for slot in slots {
            let lo = base + slot.start;
            let hi = base + slot.end() - tx;
            if hi + TOLERANCE < lo {
                continue;
            }
            if hi + TOLERANCE >= time {
                return Some(lo.max(time));
            }
        }
    }
    None
}

/// Simulate all packets of the flow sent with the given offset through the fixed schedule, and
/// return the total waiting time. Returns `None` if a packet finds no slot or violates the
/// latency bound.
fn simulate(
    input: &Input,
    schedules: &BTreeMap<PortId, PortSchedule>,
    flow: &Flow,
    offset: f64,
) -> Option<f64> {
    let app = &input.applications[flow.application];
    let n = input.num_packets(flow);
    let releases: Vec<f64> = (0..n).map(|i| offset + i as f64 * app.packet_interval).collect();

    let mut arrivals: HashMap<NodeId, Vec<f64>> = HashMap::new();
    arrivals.insert(app.device, releases.clone());
    let mut done = vec![false; flow.fragments.len()];
    let mut wait = 0.0;

    loop {
        let mut progress = false;
        for (k, path) in flow.fragments.iter().enumerate() {
            if done[k] || path.len() < 2 {
                continue;
            }
            let mut times = match path.first_node().and_then(|n| arrivals.get(&n)) {
                Some(t) => t.clone(),
                None => continue,
            };
            for port in path.ports().iter().take(path.len() - 1) {
                let schedule = schedules.get(port)?;
                let slots = schedule.gates.get(&app.priority)?;
                let params = &input.ports.get(port)?;
                let tx = params.params.transmission_time(app.packet_length);
                for t in times.iter_mut() {
                    let start = earliest_fit(*t, tx, schedule.cycle_duration, slots)?;
                    wait += start - *t;
                    *t = start + tx + params.propagation_time;
                }
            }
            if let Some(max_latency) = app.max_latency {
                if input.ends_at_destination(flow, k)
                    && times.iter().zip(releases.iter()).any(|(t, r)| t - r > max_latency + TOLERANCE)
                {
                    return None;
                }
            }
            if let Some(last) = path.last_node() {
                arrivals.entry(last).or_insert(times);
            }
            done[k] = true;
            progress = true;
        }
        if !progress {
            break;
        }
    }

    if done.iter().zip(flow.fragments.iter()).all(|(d, p)| *d || p.len() < 2) {
        Some(wait)
    } else {
        None
    }
}

/// Compute the start offset of every application, such that every packet of all its flows finds
/// a slot at every hop. Among all feasible offsets, the one with the least total waiting time is
/// chosen, and ties are broken by the smaller offset. Candidates are zero and the start of every
/// slot at the first hop.
pub fn compute_offsets(
    input: &Input,
    schedules: &BTreeMap<PortId, PortSchedule>,
) -> Result<BTreeMap<String, f64>, Infeasibility> {
    let mut result = BTreeMap::new();
    for (a, app) in input.applications.iter().enumerate() {
        let flows: Vec<&Flow> = input.flows.iter().filter(|f| f.application == a).collect();

        let mut candidates: Vec<f64> = vec![0.0];
        for flow in flows.iter() {
            for path in flow.fragments.iter().filter(|p| p.first_node() == Some(app.device)) {
                if let Some(slots) = path
                    .ports()
                    .first()
                    .and_then(|p| schedules.get(p))
                    .and_then(|s| s.gates.get(&app.priority))
                {
                    candidates.extend(slots.iter().map(|s| s.start).filter(|s| *s > TOLERANCE));
                }
            }
        }
        candidates.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        candidates.dedup_by(|a, b| (*a - *b).abs() <= TOLERANCE);

        let mut best: Option<(f64, f64)> = None;
        for offset in candidates {
            let total: Option<f64> =
                flows.iter().map(|f| simulate(input, schedules, f, offset)).sum();
            if let Some(total) = total {
                trace!("offset {} of {} has a total waiting time of {}", offset, app.name, total);
                if best.map(|(_, w)| total < w - TOLERANCE).unwrap_or(true) {
                    best = Some((offset, total));
                }
            }
        }

        match best {
            Some((offset, _)) => {
                debug!("Start offset of application {}: {}s", app.name, offset);
                result.insert(app.name.clone(), offset);
            }
            None => {
                return Err(Infeasibility::NoFeasibleOffset {
                    application: app.name.clone(),
                    node: app.device_name.clone(),
                })
            }
        }
    }
    Ok(result)
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn fit_into_window() {
        let slots = vec![Slot { start: 2.0, duration: 2.0 }, Slot { start: 6.0, duration: 1.0 }];
        assert_approx_eq!(earliest_fit(0.0, 1.0, 10.0, &slots).unwrap(), 2.0);
        assert_approx_eq!(earliest_fit(2.5, 1.0, 10.0, &slots).unwrap(), 2.5);
        assert_approx_eq!(earliest_fit(3.5, 1.0, 10.0, &slots).unwrap(), 6.0);
        assert_approx_eq!(earliest_fit(6.5, 1.0, 10.0, &slots).unwrap(), 12.0);
        // only the first slot is large enough
        assert_approx_eq!(earliest_fit(3.5, 1.5, 10.0, &slots).unwrap(), 12.0);
        assert_eq!(earliest_fit(0.0, 3.0, 10.0, &slots), None);
    }
}
