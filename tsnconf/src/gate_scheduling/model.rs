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

//! Constraint model of the gate scheduling problem.

use super::input::{Input, PortInput};
use super::offset::compute_offsets;
use super::schedule::{Output, PortSchedule, Slot};
use crate::config::ConfigError;
use crate::error::{Error, Infeasibility};
use crate::solver::{Formula, LinExpr, SatResult, Solver, Var, STRICT_EPSILON};
use crate::topology::PortId;

use log::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Times are represented in nanoseconds inside the model.
const NS: f64 = 1e9;

#[derive(Debug, Clone, Copy)]
struct SlotVars {
    start: Var,
    duration: Var,
}

/// Packets of one flow transmitted over one port
#[derive(Debug, Clone)]
struct FragmentVars {
    flow: usize,
    port: PortId,
    priority: usize,
    transmission_time: f64,
    arrivals: Vec<LinExpr>,
    scheduled: Vec<Var>,
}

impl FragmentVars {
    /// Packet `i` is transmitted within some slot, in some repetition of the cycle.
    fn in_slot(&self, i: usize, slot: &SlotVars, cycle: Var, repetition: usize) -> Formula {
        let shift = cycle * repetition as f64;
        Formula::and(vec![
            (slot.start + shift.clone() + self.transmission_time).le(self.scheduled[i]),
            LinExpr::from(self.scheduled[i]).le(slot.start + slot.duration + shift),
        ])
    }
}

/// # Gate Schedule Model
///
/// Every port transmitting a flow repeats a cycle with a duration between the lower and upper
/// bound. Within each cycle, every priority has a fixed number of slots (start and duration). A
/// flow is sent as a sequence of packet instances, each with a scheduled time at every port it
/// leaves, at which its transmission is complete. The model asserts:
///
/// - slots lie within the cycle, start in increasing order and do not exceed the maximum slot
///   duration of the port,
/// - slots of different priorities do not overlap (with the `guard-band` feature, they are spaced
///   by the guard band of the port),
/// - the transmission of every packet lies within some slot of its priority, in some repetition
///   of the cycle,
/// - packets are transmitted after they arrive, and a packet arrives at the next hop once its
///   transmission is complete and it propagated over the link,
/// - packets of the same flow keep their order, and packets of different flows with the same
///   priority are transmitted in the order of arrival,
/// - the total duration of all slots leaves the best-effort fraction of the cycle unused,
/// - a slot with a positive duration contains at least one packet,
/// - every packet reaches its destinations within the maximum latency of its application.
///
/// The objective minimizes the scheduled times, the slot starts and the slot durations.
pub struct GateScheduleModel<S> {
    solver: S,
    input: Input,
    cycles: BTreeMap<PortId, Var>,
    slots: BTreeMap<(PortId, usize), Vec<SlotVars>>,
    fragments: Vec<FragmentVars>,
}

impl<S: Solver> GateScheduleModel<S> {
    /// Build the model, asserting all constraints on the solver.
    pub fn build(input: &Input, solver: S) -> Result<Self, Error> {
        let mut model = Self {
            solver,
            input: input.clone(),
            cycles: BTreeMap::new(),
            slots: BTreeMap::new(),
            fragments: Vec::new(),
        };
        model.validate()?;
        let repetitions = model.repetitions()?;
        model.declare_variables();
        model.assert_arrivals();
        model.assert_slots();
        model.assert_packets(&repetitions);
        model.assert_zero_out(&repetitions);
        model.assert_best_effort();
        model.assert_latency();
        model.set_objective();
        debug!(
            "Gate schedule model with {} ports, {} fragments and {} slots",
            model.cycles.len(),
            model.fragments.len(),
            model.slots.values().map(|s| s.len()).sum::<usize>()
        );
        Ok(model)
    }

    /// Returns the solver
    pub fn solver(&self) -> &S {
        &self.solver
    }

    /// Consumes the model and returns the solver
    pub fn into_solver(self) -> S {
        self.solver
    }

    /// Solve the model and extract the schedule. Unsatisfiable problems and problems for which
    /// the solver gives up are both infeasible.
    pub fn solve(&mut self) -> Result<Output, Error> {
        match self.solver.check()? {
            SatResult::Sat => self.extract(),
            SatResult::Unsat => Err(Infeasibility::Unschedulable {
                reason: "the scheduling constraints are unsatisfiable".to_string(),
            }
            .into()),
            SatResult::Unknown => Err(Infeasibility::Unschedulable {
                reason: "the solver gave up before finding a schedule".to_string(),
            }
            .into()),
        }
    }

    fn port(&self, port: PortId) -> Result<&PortInput, Error> {
        self.input.ports.get(&port).ok_or_else(|| {
            ConfigError::InvalidParameter {
                parameter: format!("port {:?}", port),
                reason: "the port is not part of the gate scheduling input".to_string(),
            }
            .into()
        })
    }

    fn validate(&self) -> Result<(), Error> {
        for flow in self.input.flows.iter() {
            let app = self.input.applications.get(flow.application).ok_or_else(|| {
                ConfigError::InvalidParameter {
                    parameter: format!("flow {}", flow.name),
                    reason: "unknown application".to_string(),
                }
            })?;
            for path in flow.fragments.iter() {
                for port in path.ports().iter().take(path.len().saturating_sub(1)) {
                    let p = self.port(*port)?;
                    if app.priority >= p.params.num_priorities {
                        return Err(ConfigError::UnsupportedPriority {
                            stream: flow.name.clone(),
                            priority: app.priority,
                            port: p.name.clone(),
                        }
                        .into());
                    }
                    if app.packet_length > p.params.max_packet_length {
                        return Err(ConfigError::PacketTooLarge {
                            stream: flow.name.clone(),
                            port: p.name.clone(),
                        }
                        .into());
                    }
                    let tx = p.params.transmission_time(app.packet_length);
                    if p.params.max_slot_duration.map(|d| d < tx).unwrap_or(false) {
                        return Err(Infeasibility::Unschedulable {
                            reason: format!(
                                "packets of {} do not fit into a slot of port {}",
                                flow.name, p.name
                            ),
                        }
                        .into());
                    }
                }
            }
        }
        Ok(())
    }

    fn cycle_bounds(&self, port: &PortInput) -> (f64, f64) {
        let upper = match port.params.max_cycle_duration {
            Some(m) => m.min(self.input.max_cycle_duration),
            None => self.input.max_cycle_duration,
        };
        (self.input.min_cycle_duration * NS, upper * NS)
    }

    /// Number of cycle repetitions per port which are needed to cover all packets and their
    /// latency.
    fn repetitions(&self) -> Result<BTreeMap<PortId, usize>, Error> {
        let release = self
            .input
            .flows
            .iter()
            .map(|f| {
                self.input.num_packets(f) as f64
                    * self.input.applications[f.application].packet_interval
            })
            .fold(0.0, f64::max);
        let slack = self
            .input
            .applications
            .iter()
            .filter_map(|a| a.max_latency)
            .fold(self.input.max_cycle_duration, f64::max);
        let horizon = (release + slack) * NS;

        let mut result = BTreeMap::new();
        for (id, port) in self.input.ports.iter() {
            let (lower, upper) = self.cycle_bounds(port);
            if upper < lower || lower <= 0.0 {
                return Err(Infeasibility::Unschedulable {
                    reason: format!(
                        "the cycle duration of port {} cannot be within the configured bounds",
                        port.name
                    ),
                }
                .into());
            }
            result.insert(*id, ((horizon / lower - 1e-9).ceil() as usize).max(1));
        }
        Ok(result)
    }

    fn declare_variables(&mut self) {
        let Self { solver, input, cycles, slots, fragments } = self;
        let mut priorities: BTreeMap<PortId, BTreeSet<usize>> = BTreeMap::new();
        let mut index: HashMap<(usize, PortId), usize> = HashMap::new();

        for (f, flow) in input.flows.iter().enumerate() {
            let app = &input.applications[flow.application];
            let n = input.num_packets(flow);
            for path in flow.fragments.iter() {
                for port in path.ports().iter().take(path.len().saturating_sub(1)) {
                    if index.contains_key(&(f, *port)) {
                        continue;
                    }
                    let p = &input.ports[port];
                    priorities.entry(*port).or_default().insert(app.priority);
                    let scheduled = (0..n)
                        .map(|i| solver.declare_real(&format!("sched[{}][{}][{}]", flow.name, p.name, i)))
                        .collect();
                    index.insert((f, *port), fragments.len());
                    fragments.push(FragmentVars {
                        flow: f,
                        port: *port,
                        priority: app.priority,
                        transmission_time: p.params.transmission_time(app.packet_length) * NS,
                        arrivals: Vec::new(),
                        scheduled,
                    });
                }
            }
        }

        for (port, prios) in priorities.iter() {
            let name = &input.ports[port].name;
            cycles.insert(*port, solver.declare_real(&format!("cycle[{}]", name)));
            for q in prios.iter() {
                let port_slots = (0..input.slots_per_cycle)
                    .map(|s| SlotVars {
                        start: solver.declare_real(&format!("slot_start[{}][{}][{}]", name, q, s)),
                        duration: solver
                            .declare_real(&format!("slot_duration[{}][{}][{}]", name, q, s)),
                    })
                    .collect();
                slots.insert((*port, *q), port_slots);
            }
        }

        // arrival times
        for (f, flow) in input.flows.iter().enumerate() {
            let interval = input.applications[flow.application].packet_interval * NS;
            for (k, path) in flow.fragments.iter().enumerate() {
                let mut previous = input.predecessor(flow, k);
                for port in path.ports().iter().take(path.len().saturating_sub(1)) {
                    let idx = index[&(f, *port)];
                    if fragments[idx].arrivals.is_empty() {
                        let n = fragments[idx].scheduled.len();
                        let prev = previous.and_then(|p| index.get(&(f, p)).map(|i| (p, *i)));
                        let arrivals: Vec<LinExpr> = match prev {
                            Some((p, prev)) => {
                                let propagation = input.ports[&p].propagation_time * NS;
                                (0..n).map(|i| fragments[prev].scheduled[i] + propagation).collect()
                            }
                            None => (0..n).map(|i| LinExpr::constant(i as f64 * interval)).collect(),
                        };
                        fragments[idx].arrivals = arrivals;
                    }
                    previous = Some(*port);
                }
            }
        }
    }

    /// Packets are transmitted after they arrive, and keep their order within a flow.
    fn assert_arrivals(&mut self) {
        for frag in self.fragments.iter() {
            let tx = frag.transmission_time;
            for (i, arrival) in frag.arrivals.iter().enumerate() {
                self.solver.assert(LinExpr::from(frag.scheduled[i]).ge(arrival.clone() + tx));
                if i > 0 {
                    self.solver
                        .assert(LinExpr::from(frag.scheduled[i]).ge(frag.scheduled[i - 1] + tx));
                }
            }
        }
    }

    fn assert_slots(&mut self) {
        for ((port, _), slots) in self.slots.iter() {
            let cycle = self.cycles[port];
            let p = &self.input.ports[port];
            for (s, slot) in slots.iter().enumerate() {
                self.solver.assert(LinExpr::from(slot.start).ge(0.0));
                self.solver.assert(LinExpr::from(slot.duration).ge(0.0));
                self.solver.assert((slot.start + slot.duration).le(cycle));
                if let Some(max) = p.params.max_slot_duration {
                    self.solver.assert(LinExpr::from(slot.duration).le(max * NS));
                }
                if s > 0 {
                    let prev = slots[s - 1];
                    self.solver.assert(LinExpr::from(slot.start).gt(prev.start));
                    self.solver.assert(LinExpr::from(slot.start).ge(prev.start + prev.duration));
                }
            }
        }

        for (port, cycle) in self.cycles.iter() {
            let (lower, upper) = self.cycle_bounds(&self.input.ports[port]);
            self.solver.assert(LinExpr::from(*cycle).ge(lower));
            self.solver.assert(LinExpr::from(*cycle).le(upper));
        }

        // slots of different priorities must not overlap
        let keys: Vec<(PortId, usize)> = self.slots.keys().copied().collect();
        for (a, (port_a, q_a)) in keys.iter().enumerate() {
            for (port_b, q_b) in keys.iter().skip(a + 1) {
                if port_a != port_b {
                    continue;
                }
                let gap = guard_band(&self.input.ports[port_a]);
                for x in self.slots[&(*port_a, *q_a)].iter() {
                    for y in self.slots[&(*port_b, *q_b)].iter() {
                        self.solver.assert(Formula::or(vec![
                            (x.start + x.duration + gap).le(y.start),
                            (y.start + y.duration + gap).le(x.start),
                        ]));
                    }
                }
            }
        }
    }

    fn assert_packets(&mut self, repetitions: &BTreeMap<PortId, usize>) {
        for frag in self.fragments.iter() {
            let cycle = self.cycles[&frag.port];
            let slots = &self.slots[&(frag.port, frag.priority)];
            let reps = repetitions[&frag.port];
            for i in 0..frag.scheduled.len() {
                let mut windows = Vec::with_capacity(slots.len() * reps);
                for j in 0..reps {
                    for slot in slots.iter() {
                        windows.push(frag.in_slot(i, slot, cycle, j));
                    }
                }
                self.solver.assert(Formula::or(windows));
            }
        }

        // first come, first served among flows of the same priority. Equal arrival times are
        // ordered by the flow index.
        for (a, fa) in self.fragments.iter().enumerate() {
            for fb in self.fragments.iter().skip(a + 1) {
                if fa.port != fb.port || fa.priority != fb.priority {
                    continue;
                }
                for i in 0..fa.scheduled.len() {
                    for j in 0..fb.scheduled.len() {
                        let (ai, bj) = (&fa.arrivals[i], &fb.arrivals[j]);
                        self.solver.assert(Formula::or(vec![
                            ai.clone().gt(bj.clone()),
                            (fa.scheduled[i] + fb.transmission_time).le(fb.scheduled[j]),
                        ]));
                        self.solver.assert(Formula::or(vec![
                            bj.clone().ge(ai.clone()),
                            (fb.scheduled[j] + fa.transmission_time).le(fa.scheduled[i]),
                        ]));
                    }
                }
            }
        }
    }

    /// A slot either contains a packet in some repetition of the cycle, or its duration is zero.
    fn assert_zero_out(&mut self, repetitions: &BTreeMap<PortId, usize>) {
        for ((port, priority), slots) in self.slots.iter() {
            let cycle = self.cycles[port];
            let reps = repetitions[port];
            for slot in slots.iter() {
                let mut cases = Vec::new();
                for frag in self.fragments.iter() {
                    if frag.port != *port || frag.priority != *priority {
                        continue;
                    }
                    for i in 0..frag.scheduled.len() {
                        for j in 0..reps {
                            cases.push(frag.in_slot(i, slot, cycle, j));
                        }
                    }
                }
                cases.push(LinExpr::from(slot.duration).eq(0.0));
                self.solver.assert(Formula::or(cases));
            }
        }
    }

    fn assert_best_effort(&mut self) {
        let reserved = 1.0 - self.input.best_effort_fraction;
        for (port, cycle) in self.cycles.iter() {
            let total = self
                .slots
                .range((*port, 0)..=(*port, usize::MAX))
                .flat_map(|(_, slots)| slots.iter())
                .fold(LinExpr::default(), |acc, s| acc + s.duration);
            self.solver.assert(total.le(*cycle * reserved));
        }
    }

    fn assert_latency(&mut self) {
        let mut index: HashMap<(usize, PortId), usize> = HashMap::new();
        for (i, frag) in self.fragments.iter().enumerate() {
            index.insert((frag.flow, frag.port), i);
        }
        for (f, flow) in self.input.flows.iter().enumerate() {
            let app = &self.input.applications[flow.application];
            let max_latency = match app.max_latency {
                Some(l) => l * NS,
                None => continue,
            };
            let interval = app.packet_interval * NS;
            for (k, path) in flow.fragments.iter().enumerate() {
                if path.len() < 2 || !self.input.ends_at_destination(flow, k) {
                    continue;
                }
                let last = path.ports()[path.len() - 2];
                if let Some(idx) = index.get(&(f, last)) {
                    let frag = &self.fragments[*idx];
                    let propagation = self.input.ports[&last].propagation_time * NS;
                    for (i, sched) in frag.scheduled.iter().enumerate() {
                        let release = i as f64 * interval;
                        self.solver
                            .assert((*sched + propagation - release).le(max_latency));
                    }
                }
            }
        }
    }

    fn set_objective(&mut self) {
        let mut objective = LinExpr::default();
        for frag in self.fragments.iter() {
            for s in frag.scheduled.iter() {
                objective.add_term(*s, 1.0);
            }
        }
        for slot in self.slots.values().flat_map(|s| s.iter()) {
            objective.add_term(slot.start, 1.0);
            objective.add_term(slot.duration, 2.0);
        }
        self.solver.set_objective(objective);
    }

    fn value(&self, var: Var) -> Result<f64, Error> {
        self.solver.value(var).ok_or_else(|| {
            Infeasibility::Unschedulable { reason: "the solver returned no model".to_string() }
                .into()
        })
    }

    fn extract(&self) -> Result<Output, Error> {
        let mut schedules: BTreeMap<PortId, PortSchedule> = BTreeMap::new();
        for (port, cycle) in self.cycles.iter() {
            schedules.insert(
                *port,
                PortSchedule {
                    cycle_start: 0.0,
                    cycle_duration: self.value(*cycle)? / NS,
                    gates: BTreeMap::new(),
                },
            );
        }
        for ((port, priority), slots) in self.slots.iter() {
            let mut gate = Vec::new();
            for slot in slots.iter() {
                let duration = self.value(slot.duration)?;
                if duration > STRICT_EPSILON {
                    let start = self.value(slot.start)?.max(0.0);
                    gate.push(Slot { start: start / NS, duration: duration / NS });
                }
            }
            gate.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal));
            if let Some(s) = schedules.get_mut(port) {
                s.gates.insert(*priority, gate);
            }
        }
        for (port, schedule) in schedules.iter() {
            trace!(
                "Schedule of {}: cycle {}s, gates {:?}",
                self.input.ports[port].name,
                schedule.cycle_duration,
                schedule.gates
            );
        }

        let application_offsets = compute_offsets(&self.input, &schedules)?;
        Ok(Output { schedules, application_offsets })
    }
}

#[cfg(feature = "guard-band")]
fn guard_band(port: &PortInput) -> f64 {
    port.params.guard_band * NS
}

#[cfg(not(feature = "guard-band"))]
fn guard_band(_port: &PortInput) -> f64 {
    0.0
}
