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
//! Test entire configuration passes.

use crate::config::{ConfigError, Configuration, StreamConfig};
use crate::error::{Error, Infeasibility};
use crate::example_networks::*;
use crate::mac_table::MacTableEntry;
use crate::output::*;
use crate::protection::FailureProtection;
use crate::topology::{NamePattern, Topology};
use crate::{configure, export_smtlib};

use assert_approx_eq::assert_approx_eq;

const TOL: f64 = 1e-9;

fn pattern(s: &str) -> NamePattern {
    s.parse().unwrap()
}

fn static_entry(address: &str, interface: &str) -> MacTableEntry {
    MacTableEntry { address: address.to_string(), vlan: None, interface: interface.to_string() }
}

fn stream_entry(address: &str, vlan: u16, interface: &str) -> MacTableEntry {
    MacTableEntry { address: address.to_string(), vlan: Some(vlan), interface: interface.to_string() }
}

fn test_file(name: &str) -> String {
    format!("{}/test_files/{}", env!("CARGO_MANIFEST_DIR"), name)
}

#[test]
fn line() {
    let t = LineNet::topology();
    let c = LineNet::configuration().unwrap();
    let out = configure(&t, &c).unwrap();

    assert_eq!(out.trees["control"], vec![vec![vec!["S", "A", "B", "D"]]]);
    assert_eq!(out.nodes.len(), 4);

    let s = out.node("S").unwrap();
    assert_eq!(
        s.stream_identifications,
        vec![IdentificationOutput {
            packet_filter: "*".to_string(),
            packet_data_filter: None,
            stream: "control".to_string()
        }]
    );
    assert_eq!(
        s.stream_encodings,
        vec![EncodingOutput { stream: "control".to_string(), interface: "eth0".to_string(), vlan: 0 }]
    );
    assert_eq!(s.mac_address_table, vec![stream_entry("D", 0, "eth0")]);

    let a = out.node("A").unwrap();
    assert_eq!(
        a.stream_decodings,
        vec![DecodingOutput { interface: "eth1".to_string(), vlan: 0, stream: "control".to_string() }]
    );
    assert_eq!(a.vlan_filter, vec![0]);
    assert_eq!(
        a.mac_address_table,
        vec![
            stream_entry("D", 0, "eth0"),
            static_entry("0A-00-00-00-00-01", "eth1"),
            static_entry("0A-00-00-00-00-02", "eth0"),
        ]
    );

    let b = out.node("B").unwrap();
    assert_eq!(
        b.mac_address_table,
        vec![
            stream_entry("D", 0, "eth1"),
            static_entry("0A-00-00-00-00-01", "eth0"),
            static_entry("0A-00-00-00-00-02", "eth1"),
        ]
    );

    let d = out.node("D").unwrap();
    assert!(d.stream_encodings.is_empty());
    assert_eq!(d.stream_decodings.len(), 1);
    assert!(d.gate_schedules.is_empty());

    // the packet is forwarded as soon as it arrives at every hop
    for (node, iface, start) in [("S", "eth0", 0.0), ("A", "eth0", 0.8e-6), ("B", "eth1", 1.6e-6)].iter() {
        let schedule = &out.node(node).unwrap().gate_schedules[*iface];
        assert_approx_eq!(schedule.cycle_duration, 1e-3, TOL);
        assert_eq!(schedule.slots[&1].len(), 1);
        assert_approx_eq!(schedule.slots[&1][0].start, *start, TOL);
        assert_approx_eq!(schedule.slots[&1][0].duration, 0.8e-6, TOL);
        let gate = &schedule.periodic_gates[&1];
        assert_eq!(gate.initially_open, *start == 0.0);
        assert_approx_eq!(gate.durations.iter().sum::<f64>(), 1e-3, TOL);
    }
    assert_eq!(out.application_offsets.len(), 1);
    assert_approx_eq!(out.application_offsets["S.app"], 0.0, TOL);
}

#[test]
fn ring() {
    let t = RingNet::topology();
    let c = RingNet::configuration().unwrap();
    let out = configure(&t, &c).unwrap();

    assert_eq!(
        out.trees["sensor"],
        vec![vec![vec!["S", "A", "B", "C", "D"]], vec![vec!["S", "A", "E", "C", "D"]]]
    );

    let a = out.node("A").unwrap();
    assert_eq!(
        a.stream_splittings,
        vec![SplittingOutput {
            input_stream: "sensor".to_string(),
            output_streams: vec!["sensor_B".to_string(), "sensor_E".to_string()]
        }]
    );
    let c_out = out.node("C").unwrap();
    assert_eq!(c_out.stream_mergings.len(), 1);
    assert_eq!(c_out.stream_mergings[0].output_stream, "sensor");
    assert_eq!(c_out.vlan_filter, vec![1]);

    // both replicas are scheduled on their own ports
    assert!(a.gate_schedules.contains_key("eth0"));
    assert!(a.gate_schedules.contains_key("eth1"));
    assert!(c_out.gate_schedules.contains_key("eth2"));
}

#[test]
fn all_examples_are_deterministic() {
    for name in EXAMPLE_NETWORKS.iter() {
        let (t, c) = by_name(name).unwrap().unwrap();
        let first = configure(&t, &c).unwrap();
        let second = configure(&t, &c).unwrap();
        assert_eq!(first, second, "{} differs between passes", name);
        let json = first.to_json().unwrap();
        assert_eq!(json, second.to_json().unwrap());
        let parsed: ConfigurationOutput = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.trees, first.trees);
        assert_eq!(parsed.nodes.keys().collect::<Vec<_>>(), first.nodes.keys().collect::<Vec<_>>());
    }
    assert!(by_name("unknown").is_none());
}

#[test]
fn topology_is_not_modified() {
    let t = RingNet::topology();
    let c = RingNet::configuration().unwrap();
    configure(&t, &c).unwrap();
    assert!(t.node_ids().all(|n| t.node(n).streams().is_empty()));
}

#[test]
fn ladder_multicast() {
    let (t, c) = by_name("ladder").unwrap().unwrap();
    let out = configure(&t, &c).unwrap();
    assert!(out.application_offsets.is_empty());
    assert!(out.nodes.values().all(|n| n.gate_schedules.is_empty()));
    let s = out.node("S").unwrap();
    assert_eq!(s.stream_identifications[0].packet_filter, "udp dst port 5000");
    // every destination receives the stream
    for d in ["D1", "D2"].iter() {
        assert!(!out.node(d).unwrap().stream_decodings.is_empty());
    }
    // all entries use the group address
    for node in out.nodes.values() {
        for entry in node.mac_address_table.iter().filter(|e| e.vlan.is_some()) {
            assert_eq!(entry.address, "01-00-5E-00-00-01");
        }
    }
}

#[test]
fn unknown_source() {
    let t = LineNet::topology();
    let mut c = Configuration::default();
    c.streams.push(StreamConfig::new("s", "X", pattern("D")));
    match configure(&t, &c) {
        Err(Error::ConfigError(ConfigError::UnknownNode { stream, node })) => {
            assert_eq!(stream, "s");
            assert_eq!(node, "X");
        }
        r => panic!("unexpected result: {:?}", r),
    }
}

#[test]
fn switch_as_source() {
    let t = LineNet::topology();
    let mut c = Configuration::default();
    c.streams.push(StreamConfig::new("s", "A", pattern("D")));
    assert!(matches!(
        configure(&t, &c),
        Err(Error::ConfigError(ConfigError::SourceNotADevice { .. }))
    ));
}

#[test]
fn no_destination() {
    let t = LineNet::topology();
    let mut c = Configuration::default();
    // switches and the source itself are never destinations
    c.streams.push(StreamConfig::new("s", "S", pattern("A or S")));
    match configure(&t, &c) {
        Err(Error::ConfigError(ConfigError::NoDestination(s))) => assert_eq!(s, "s"),
        r => panic!("unexpected result: {:?}", r),
    }
}

#[test]
fn unreachable_destination() {
    let mut t = LineNet::topology();
    t.add_device("X");
    let mut c = Configuration::default();
    c.streams.push(StreamConfig::new("s", "S", pattern("D or X")));
    match configure(&t, &c) {
        Err(Error::Infeasible(Infeasibility::Unreachable { stream, destination })) => {
            assert_eq!(stream, "s");
            assert_eq!(destination, "X");
        }
        r => panic!("unexpected result: {:?}", r),
    }
}

#[test]
fn insufficient_redundancy() {
    let t = RingNet::topology();
    let mut c = RingNet::configuration().unwrap();
    c.streams[0].max_redundancy = Some(1);
    let e = configure(&t, &c).unwrap_err();
    assert!(e.is_infeasible());
    match e {
        Error::Infeasible(Infeasibility::NoProtectingTreeSubset { stream, max_redundancy, .. }) => {
            assert_eq!(stream, "sensor");
            assert_eq!(max_redundancy, 1);
        }
        e => panic!("unexpected error: {}", e),
    }
}

#[test]
fn vlan_ids_exhausted() {
    let t = RingNet::topology();
    let mut c = RingNet::configuration().unwrap();
    c.min_vlan_id = 7;
    c.max_vlan_id = 7;
    let e = configure(&t, &c).unwrap_err();
    assert!(e.is_infeasible());
    match e {
        Error::VlanIdExhausted { node, destination, max_vlan_id } => {
            assert_eq!(node, "A");
            assert_eq!(destination, "D");
            assert_eq!(max_vlan_id, 7);
        }
        e => panic!("unexpected error: {}", e),
    }
}

#[test]
fn unschedulable() {
    let t = LineNet::topology();
    let c = Configuration::from_json_str(
        r#"{
            "gateScheduling": { "cycleDuration": "10us" },
            "streams": [
                {
                    "name": "bulk",
                    "source": "S",
                    "destination": "D",
                    "packetLength": "1500B",
                    "packetInterval": "10us"
                }
            ]
        }"#,
    )
    .unwrap();
    let e = configure(&t, &c).unwrap_err();
    assert!(e.is_infeasible(), "unexpected error: {}", e);
}

#[test]
fn conflicting_applications() {
    let t = LineNet::topology();
    let mut c = LineNet::configuration().unwrap();
    let mut other = c.streams[0].clone().with_traffic(1, 1600.0, 1e-3);
    other.name = "other".to_string();
    c.streams.push(other);
    match configure(&t, &c) {
        Err(Error::ConfigError(ConfigError::InvalidParameter { parameter, .. })) => {
            assert_eq!(parameter, "application S.app")
        }
        r => panic!("unexpected result: {:?}", r),
    }
}

#[test]
fn shared_application() {
    let t = LineNet::topology();
    let mut c = LineNet::configuration().unwrap();
    let mut other = c.streams[0].clone();
    other.name = "copy".to_string();
    other.destination_address = Some("0A-00-00-00-00-02".to_string());
    c.streams.push(other);
    let out = configure(&t, &c).unwrap();
    assert_eq!(out.application_offsets.len(), 1);
    // both streams use VLAN 0, since their destination addresses differ
    let s = out.node("S").unwrap();
    assert_eq!(s.stream_encodings.len(), 2);
    assert!(s.stream_encodings.iter().all(|e| e.vlan == 0));
}

#[test]
fn invalid_configured_tree() {
    let t = LineNet::topology();
    let mut c = Configuration::default();
    let mut s = StreamConfig::new("s", "S", pattern("D"));
    s.trees = Some(vec![vec![vec!["S".to_string(), "B".to_string(), "D".to_string()]]]);
    c.streams.push(s.clone());
    assert!(matches!(configure(&t, &c), Err(Error::ConfigError(ConfigError::InvalidTree { .. }))));

    // the tree is valid, but does not reach the destination
    s.trees = Some(vec![vec![vec!["S".to_string(), "A".to_string(), "B".to_string()]]]);
    c.streams[0] = s;
    match configure(&t, &c) {
        Err(Error::ConfigError(ConfigError::InvalidTree { reason, .. })) => {
            assert_eq!(reason, "destination D is not reached")
        }
        r => panic!("unexpected result: {:?}", r),
    }
}

#[test]
fn configured_trees_must_satisfy_protection() {
    let t = RingNet::topology();
    let mut c = RingNet::configuration().unwrap();
    let path = |via: &str| ["S", "A", via, "C", "D"].iter().map(|n| n.to_string()).collect::<Vec<_>>();

    // a single tree over B does not survive the failure of B
    c.streams[0].trees = Some(vec![vec![path("B")]]);
    match configure(&t, &c) {
        Err(Error::ConfigError(ConfigError::InvalidTree { stream, reason })) => {
            assert_eq!(stream, "sensor");
            assert!(reason.contains("failing [B]"), "unexpected reason: {}", reason);
        }
        r => panic!("unexpected result: {:?}", r),
    }

    // link failures are checked as well
    c.streams[0].node_failure_protection.clear();
    c.streams[0].link_failure_protection = vec![FailureProtection::new(pattern("A->B"), 1)];
    assert!(matches!(configure(&t, &c), Err(Error::ConfigError(ConfigError::InvalidTree { .. }))));

    // both trees together satisfy the requirement
    c.streams[0].trees = Some(vec![vec![path("B")], vec![path("E")]]);
    let out = configure(&t, &c).unwrap();
    assert_eq!(out.trees["sensor"].len(), 2);
}

#[test]
fn smtlib() {
    let t = LineNet::topology();
    let c = LineNet::configuration().unwrap();
    let script = export_smtlib(&t, &c).unwrap().unwrap();
    assert!(script.contains("(declare-const |cycle[S.eth0]| Real)"));
    assert!(script.contains("(check-sat)"));

    let mut c = c;
    c.gate_scheduling = None;
    assert_eq!(export_smtlib(&t, &c).unwrap(), None);
}

#[test]
fn dual_homed_from_files() {
    let t = Topology::from_file(test_file("dual_homed_topology.json")).unwrap();
    let c = Configuration::from_file(test_file("dual_homed_config.json")).unwrap();
    // M has no enabled interface
    assert_eq!(t.num_nodes(), 4);
    assert!(t.get_node_id("M").is_err());

    let out = configure(&t, &c).unwrap();

    let mut ctrl = out.trees["ctrl"].clone();
    ctrl.sort();
    assert_eq!(ctrl, vec![vec![vec!["S", "A", "D"]], vec![vec!["S", "B", "D"]]]);
    // the parallel cable is named by the egress interface
    assert_eq!(out.trees["cfg"], vec![vec![vec!["S", "A.eth3", "B", "D"]]]);

    let s = out.node("S").unwrap();
    assert_eq!(s.stream_splittings.len(), 1);
    assert_eq!(s.stream_splittings[0].output_streams.len(), 2);
    let mut ctrl_vlans: Vec<u16> =
        s.stream_encodings.iter().filter(|e| e.stream.starts_with("ctrl_")).map(|e| e.vlan).collect();
    ctrl_vlans.sort_unstable();
    assert_eq!(ctrl_vlans, vec![10, 11]);
    assert!(s.stream_encodings.iter().any(|e| e.stream == "cfg" && e.vlan == 10));
    assert!(s.gate_schedules.contains_key("eth0"));
    assert!(s.gate_schedules.contains_key("eth1"));

    let a = out.node("A").unwrap();
    assert_eq!(
        a.mac_address_table,
        vec![
            stream_entry("D", 10, "eth2"),
            stream_entry("0A-00-00-00-00-02", 10, "eth3"),
            static_entry("0A-00-00-00-00-01", "eth0"),
            static_entry("0A-00-00-00-00-02", "eth2"),
            static_entry("0A-00-00-00-00-03", "eth1"),
        ]
    );

    let b = out.node("B").unwrap();
    assert!(b.stream_decodings.iter().any(|d| d.stream == "cfg" && d.interface == "eth3"));
    assert_eq!(
        b.mac_address_table[2..].to_vec(),
        vec![
            static_entry("0A-00-00-00-00-01", "eth1"),
            static_entry("0A-00-00-00-00-02", "eth1"),
            static_entry("0A-00-00-00-00-03", "eth2"),
        ]
    );

    let d = out.node("D").unwrap();
    assert_eq!(d.stream_mergings.len(), 1);
    assert_eq!(d.stream_mergings[0].output_stream, "ctrl");
    assert_eq!(d.stream_mergings[0].input_streams.len(), 2);
}

#[test]
fn invalid_config_file() {
    match Configuration::from_file(test_file("invalid_config.json")) {
        Err(ConfigError::InvalidParameter { parameter, .. }) => assert_eq!(parameter, "maxVlanId"),
        r => panic!("unexpected result: {:?}", r),
    }
    assert!(matches!(Configuration::from_file(test_file("missing.json")), Err(ConfigError::Io(..))));
}
