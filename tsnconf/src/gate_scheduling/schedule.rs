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

//! Output of the gate scheduling. All times are in seconds.

use crate::topology::PortId;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const TOLERANCE: f64 = 1e-12;

/// Window within a cycle in which the gate is open.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    /// Start of the slot, relative to the cycle start
    pub start: f64,
    /// Duration of the slot
    pub duration: f64,
}

impl Slot {
    /// End of the slot, relative to the cycle start
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Gate schedule of all priorities of a single port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortSchedule {
    /// Start of the cycle
    pub cycle_start: f64,
    /// Duration of the cycle
    pub cycle_duration: f64,
    /// Slots of every priority, ordered by start time
    pub gates: BTreeMap<usize, Vec<Slot>>,
}

/// Parameters of a periodic gate: after `offset`, the gate toggles its state after each of the
/// `durations`, starting with `initially_open`. The durations sum up to the cycle duration, and
/// there is always an even number of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodicGate {
    /// Time offset of the schedule
    pub offset: f64,
    /// State of the gate at the start of the cycle
    pub initially_open: bool,
    /// Durations of the alternating open and closed intervals
    pub durations: Vec<f64>,
}

impl PortSchedule {
    /// Convert the slots of the priority into the parameters of a periodic gate. Priorities without
    /// slots are closed during the entire cycle.
    pub fn periodic_gate(&self, priority: usize) -> PeriodicGate {
        let slots: &[Slot] = self.gates.get(&priority).map(|s| s.as_slice()).unwrap_or(&[]);
        let initially_open = slots.first().map(|s| s.start <= TOLERANCE).unwrap_or(false);

        fn push(durations: &mut Vec<f64>, last: &mut Option<bool>, open: bool, length: f64) {
            match (durations.last_mut(), *last == Some(open)) {
                (Some(d), true) => *d += length,
                _ => {
                    durations.push(length);
                    *last = Some(open);
                }
            }
        }

        let mut durations: Vec<f64> = Vec::new();
        let mut last: Option<bool> = None;
        let mut time = 0.0;
        for slot in slots {
            if slot.start > time + TOLERANCE {
                push(&mut durations, &mut last, false, slot.start - time);
            }
            push(&mut durations, &mut last, true, slot.duration);
            time = slot.end();
        }
        if self.cycle_duration > time + TOLERANCE {
            push(&mut durations, &mut last, false, self.cycle_duration - time);
        }
        if durations.len() % 2 == 1 {
            durations.push(0.0);
        }
        PeriodicGate { offset: self.cycle_start, initially_open, durations }
    }
}

/// Result of the gate scheduling
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Output {
    /// Gate schedule of every port transmitting at least one flow
    pub schedules: BTreeMap<PortId, PortSchedule>,
    /// Start offset of every application
    pub application_offsets: BTreeMap<String, f64>,
}

#[cfg(test)]
mod test {
    use super::*;
    use maplit::btreemap;

    fn schedule(slots: Vec<(f64, f64)>) -> PortSchedule {
        PortSchedule {
            cycle_start: 0.0,
            cycle_duration: 10.0,
            gates: btreemap! {
                0 => slots.into_iter().map(|(start, duration)| Slot { start, duration }).collect()
            },
        }
    }

    #[test]
    fn gate_starting_closed() {
        let g = schedule(vec![(2.0, 3.0), (7.0, 1.0)]).periodic_gate(0);
        assert!(!g.initially_open);
        assert_eq!(g.durations, vec![2.0, 3.0, 2.0, 1.0, 2.0, 0.0]);
    }

    #[test]
    fn gate_starting_open() {
        let g = schedule(vec![(0.0, 4.0)]).periodic_gate(0);
        assert!(g.initially_open);
        assert_eq!(g.durations, vec![4.0, 6.0]);
        assert_eq!(g.durations.iter().sum::<f64>(), 10.0);
    }

    #[test]
    fn adjacent_slots_and_full_cycle() {
        let g = schedule(vec![(0.0, 4.0), (4.0, 6.0)]).periodic_gate(0);
        assert!(g.initially_open);
        assert_eq!(g.durations, vec![10.0, 0.0]);
    }

    #[test]
    fn unused_priority_is_closed() {
        let g = schedule(vec![(0.0, 4.0)]).periodic_gate(3);
        assert!(!g.initially_open);
        assert_eq!(g.durations, vec![10.0, 0.0]);
    }
}
