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

//! Test the gate scheduling on small networks.

use crate::config::ConfigError;
use crate::error::{Error, Infeasibility};
use crate::gate_scheduling::*;
use crate::solver::CaseSplitSolver;
use crate::topology::{NodeId, Topology};
use crate::trees::Path;

use assert_approx_eq::assert_approx_eq;

const TOL: f64 = 1e-9;

/// ```text
/// S1 ---.
///        A --- B --- D
/// S2 ---'
/// ```
fn topology() -> Topology {
    let mut t = Topology::new();
    let s1 = t.add_device("S1");
    let s2 = t.add_device("S2");
    let a = t.add_switch("A");
    let b = t.add_switch("B");
    let d = t.add_device("D");
    t.add_link(s1, a);
    t.add_link(s2, a);
    t.add_link(a, b);
    t.add_link(b, d);
    t
}

fn id(t: &Topology, name: &str) -> NodeId {
    t.get_node_id(name).unwrap()
}

fn app(t: &Topology, device: &str, priority: usize, bits: f64, interval: f64) -> Application {
    Application {
        name: format!("{}.app{}", device, priority),
        device: id(t, device),
        device_name: device.to_string(),
        priority,
        packet_length: bits,
        packet_interval: interval,
        max_latency: None,
    }
}

fn path(t: &Topology, names: &[&str]) -> Vec<Path> {
    vec![Path::from_names(t, names).unwrap()]
}

/// Check all properties every schedule must have.
fn check_schedule(input: &Input, output: &Output) {
    assert_eq!(output.schedules.len(), input.ports.len());
    for (port, schedule) in output.schedules.iter() {
        assert!(input.ports.contains_key(port));
        let cycle = schedule.cycle_duration;
        assert!(cycle >= input.min_cycle_duration - TOL);
        assert!(cycle <= input.max_cycle_duration + TOL);

        let mut all: Vec<(usize, Slot)> = Vec::new();
        for (priority, slots) in schedule.gates.iter() {
            for (i, slot) in slots.iter().enumerate() {
                assert!(slot.start >= -TOL);
                assert!(slot.end() <= cycle + TOL);
                assert!(slot.duration > 0.0);
                if i > 0 {
                    assert!(slot.start >= slots[i - 1].end() - TOL);
                }
                all.push((*priority, *slot));
            }
            let gate = schedule.periodic_gate(*priority);
            assert_eq!(gate.durations.len() % 2, 0);
            assert_approx_eq!(gate.durations.iter().sum::<f64>(), cycle, TOL);
        }

        // slots of different priorities never overlap
        for (i, (pa, a)) in all.iter().enumerate() {
            for (pb, b) in all.iter().skip(i + 1) {
                if pa != pb {
                    assert!(a.end() <= b.start + TOL || b.end() <= a.start + TOL);
                }
            }
        }

        let open: f64 = all.iter().map(|(_, s)| s.duration).sum();
        assert!(open <= (1.0 - input.best_effort_fraction) * cycle + TOL);
    }
    for a in input.applications.iter() {
        assert!(output.application_offsets.contains_key(&a.name));
    }
}

#[test]
fn single_flow() {
    let t = topology();
    let mut input = Input::new(1e-3);
    let a = input.add_application(app(&t, "S1", 0, 800.0, 1e-3)).unwrap();
    input.add_flow(&t, "f", a, path(&t, &["S1", "A", "B", "D"]));
    let output = compute_schedule(&input, None).unwrap();
    check_schedule(&input, &output);

    let gate = |node: &str, iface: &str| {
        let port = t.find_port(id(&t, node), iface).unwrap();
        output.schedules[&port].gates[&0].clone()
    };
    // every hop opens its gate right when the packet arrives
    for (node, iface, start) in [("S1", "eth0", 0.0), ("A", "eth2", 0.8e-6), ("B", "eth1", 1.6e-6)].iter() {
        let slots = gate(*node, *iface);
        assert_eq!(slots.len(), 1);
        assert_approx_eq!(slots[0].start, *start, TOL);
        assert_approx_eq!(slots[0].duration, 0.8e-6, TOL);
    }
    assert_eq!(output.application_offsets["S1.app0"], 0.0);
}

#[test]
fn two_priorities_do_not_overlap() {
    let t = topology();
    let mut input = Input::new(1e-3);
    let a1 = input.add_application(app(&t, "S1", 1, 12000.0, 1e-3)).unwrap();
    let a2 = input.add_application(app(&t, "S2", 2, 8000.0, 1e-3)).unwrap();
    input.add_flow(&t, "f1", a1, path(&t, &["S1", "A", "B", "D"]));
    input.add_flow(&t, "f2", a2, path(&t, &["S2", "A", "B", "D"]));
    let output = compute_schedule(&input, None).unwrap();
    check_schedule(&input, &output);

    // both priorities are scheduled on the shared port
    let shared = t.find_port(id(&t, "A"), "eth2").unwrap();
    assert_eq!(output.schedules[&shared].gates.len(), 2);
}

#[test]
fn same_priority_flows() {
    let t = topology();
    let mut input = Input::new(1e-3);
    input.best_effort_fraction = 0.5;
    let a1 = input.add_application(app(&t, "S1", 3, 4000.0, 1e-3)).unwrap();
    let a2 = input.add_application(app(&t, "S2", 3, 4000.0, 1e-3)).unwrap();
    input.add_flow(&t, "f1", a1, path(&t, &["S1", "A", "B", "D"]));
    input.add_flow(&t, "f2", a2, path(&t, &["S2", "A", "B", "D"]));
    let output = compute_schedule(&input, None).unwrap();
    check_schedule(&input, &output);

    // the shared port transmits both packets
    let shared = t.find_port(id(&t, "A"), "eth2").unwrap();
    let open: f64 = output.schedules[&shared].gates[&3].iter().map(|s| s.duration).sum();
    assert!(open >= 2.0 * 4e-6 - TOL);
}

#[test]
fn multiple_packets_per_cycle() {
    let t = topology();
    let mut input = Input::new(1e-3);
    input.slots_per_cycle = 2;
    let a = input.add_application(app(&t, "S1", 0, 800.0, 0.5e-3)).unwrap();
    input.add_flow(&t, "f", a, path(&t, &["S1", "A", "B", "D"]));
    assert_eq!(input.num_packets(&input.flows[0]), 2);
    let output = compute_schedule(&input, None).unwrap();
    check_schedule(&input, &output);
    for schedule in output.schedules.values() {
        let open: f64 = schedule.gates[&0].iter().map(|s| s.duration).sum();
        assert!(open >= 2.0 * 0.8e-6 - TOL);
    }
}

#[test]
fn latency_bound() {
    let t = topology();
    let mut input = Input::new(1e-3);
    let mut application = app(&t, "S1", 0, 800.0, 1e-3);
    application.max_latency = Some(3e-6);
    let a = input.add_application(application.clone()).unwrap();
    input.add_flow(&t, "f", a, path(&t, &["S1", "A", "B", "D"]));
    let output = compute_schedule(&input, None).unwrap();
    check_schedule(&input, &output);

    // three hops of 0.8us each cannot be done in 2us
    let mut input = Input::new(1e-3);
    application.max_latency = Some(2e-6);
    let a = input.add_application(application).unwrap();
    input.add_flow(&t, "f", a, path(&t, &["S1", "A", "B", "D"]));
    match compute_schedule(&input, None) {
        Err(Error::Infeasible(Infeasibility::Unschedulable { .. })) => {}
        r => panic!("Unexpected result: {:?}", r),
    }
}

#[test]
fn packet_longer_than_cycle() {
    let t = topology();
    let mut input = Input::new(10e-6);
    let a = input.add_application(app(&t, "S1", 0, 12000.0, 10e-6)).unwrap();
    input.add_flow(&t, "f", a, path(&t, &["S1", "A", "B", "D"]));
    let err = compute_schedule(&input, None).unwrap_err();
    assert!(err.is_infeasible());
}

#[test]
fn invalid_flows() {
    let t = topology();
    let mut input = Input::new(1e-3);
    let a = input.add_application(app(&t, "S1", 8, 800.0, 1e-3)).unwrap();
    input.add_flow(&t, "f", a, path(&t, &["S1", "A", "B", "D"]));
    match compute_schedule(&input, None) {
        Err(Error::ConfigError(ConfigError::UnsupportedPriority { priority: 8, port, .. })) => {
            assert_eq!(port, "S1.eth0")
        }
        r => panic!("Unexpected result: {:?}", r),
    }

    let mut input = Input::new(1e-3);
    let a = input.add_application(app(&t, "S1", 0, 16000.0, 1e-3)).unwrap();
    input.add_flow(&t, "f", a, path(&t, &["S1", "A", "B", "D"]));
    assert!(matches!(
        compute_schedule(&input, None),
        Err(Error::ConfigError(ConfigError::PacketTooLarge { .. }))
    ));
}

#[test]
fn shared_applications() {
    let t = topology();
    let mut input = Input::new(1e-3);
    let first = input.add_application(app(&t, "S1", 0, 800.0, 1e-3)).unwrap();
    let second = input.add_application(app(&t, "S1", 0, 800.0, 1e-3)).unwrap();
    assert_eq!(first, second);
    assert_eq!(input.applications.len(), 1);
    let mut other = app(&t, "S1", 0, 1600.0, 1e-3);
    other.name = "S1.app0".to_string();
    assert!(input.add_application(other).is_err());
}

#[test]
fn interval_out_of_phase_with_cycle() {
    let t = topology();
    let mut input = Input::new(1e-3);
    // the fifth packet would arrive at 1.2ms, which is not at the phase of the first one
    assert!(matches!(
        input.add_application(app(&t, "S1", 0, 800.0, 300e-6)),
        Err(ConfigError::InvalidParameter { .. })
    ));
    assert!(input.applications.is_empty());
    let a = input.add_application(app(&t, "S1", 0, 800.0, 200e-6)).unwrap();
    input.add_flow(&t, "f", a, path(&t, &["S1", "A", "B", "D"]));
    assert_eq!(input.num_packets(&input.flows[0]), 5);
    let b = input.add_application(app(&t, "S2", 0, 800.0, 2e-3)).unwrap();
    input.add_flow(&t, "g", b, path(&t, &["S2", "A", "B", "D"]));
    assert_eq!(input.num_packets(&input.flows[1]), 1);
}

/// ```text
/// S0 ---.
/// ...    A --- B --- D
/// S7 ---'
/// ```
fn star(devices: usize) -> Topology {
    let mut t = Topology::new();
    let a = t.add_switch("A");
    let b = t.add_switch("B");
    let d = t.add_device("D");
    for i in 0..devices {
        let s = t.add_device(format!("S{}", i));
        t.add_link(s, a);
    }
    t.add_link(a, b);
    t.add_link(b, d);
    t
}

fn star_input(t: &Topology, devices: usize, interval: f64, max_latency: f64) -> Input {
    let mut input = Input::new(1e-3);
    input.slots_per_cycle = 4;
    for i in 0..devices {
        let device = format!("S{}", i);
        let mut application = app(t, &device, 0, 800.0, interval);
        application.max_latency = Some(max_latency);
        let a = input.add_application(application).unwrap();
        input.add_flow(t, format!("f{}", i), a, path(t, &[device.as_str(), "A", "B", "D"]));
    }
    input
}

#[test]
fn fallback_solver_agrees_on_small_inputs() {
    let t = star(2);
    let mut input = star_input(&t, 2, 1e-3, 100e-6);
    input.slots_per_cycle = 1;
    let output = compute_schedule_with(&input, CaseSplitSolver::new()).unwrap();
    check_schedule(&input, &output);
    let output = compute_schedule(&input, None).unwrap();
    check_schedule(&input, &output);
}

#[cfg(feature = "z3-solver")]
#[test]
fn many_flows_share_a_link() {
    let t = star(8);
    let input = star_input(&t, 8, 250e-6, 100e-6);
    assert_eq!(input.num_packets(&input.flows[0]), 4);
    let output = compute_schedule(&input, Some(std::time::Duration::from_secs(60))).unwrap();
    check_schedule(&input, &output);
    // 32 packets of 0.8us leave over the shared link, after the eight links from the devices
    let shared = t.find_port(id(&t, "A"), "eth8").unwrap();
    let open: f64 = output.schedules[&shared].gates[&0].iter().map(|s| s.duration).sum();
    assert!(open >= 32.0 * 0.8e-6 - TOL);
}

#[test]
fn empty_input() {
    let input = Input::new(1e-3);
    assert_eq!(compute_schedule(&input, None).unwrap(), Output::default());
}

#[test]
fn smtlib_export() {
    let t = topology();
    let mut input = Input::new(1e-3);
    let a = input.add_application(app(&t, "S1", 0, 800.0, 1e-3)).unwrap();
    input.add_flow(&t, "f", a, path(&t, &["S1", "A", "B", "D"]));
    let script = export_smtlib(&input).unwrap();
    assert!(script.contains("(declare-const |cycle[S1.eth0]| Real)"));
    assert!(script.contains("(minimize "));
    assert!(script.contains("(check-sat)"));
}
