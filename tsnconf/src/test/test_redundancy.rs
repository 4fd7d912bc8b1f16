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

//! Test the stream redundancy configuration on prepared networks.

use crate::example_networks::*;
use crate::redundancy::*;
use crate::topology::{NodeId, Topology};
use crate::trees::{collect_all_trees, Path, Tree};
use crate::Error;

use std::collections::HashMap;

fn id(t: &Topology, name: &str) -> NodeId {
    t.get_node_id(name).unwrap()
}

fn ring_stream(t: &Topology) -> RedundantStream {
    let (s, d) = (id(t, "S"), id(t, "D"));
    RedundantStream {
        name: "s1".to_string(),
        packet_filter: "*".to_string(),
        packet_data_filter: None,
        source: s,
        destination_address: "D".to_string(),
        trees: collect_all_trees(t, s, &[d]),
    }
}

/// No node assigns the same VLAN id to two different member streams towards the same destination.
fn assert_vlan_uniqueness(t: &Topology) {
    for node in t.node_ids() {
        let mut assigned: HashMap<(String, u16), String> = HashMap::new();
        for e in t.node(node).streams().encodings.iter() {
            if let Some(other) = assigned.insert((e.destination.clone(), e.vlan), e.stream.clone()) {
                assert_eq!(other, e.stream, "VLAN {} used twice on {}", e.vlan, t.node_name(node));
            }
        }
    }
}

#[test]
fn ring_replication() {
    let mut t = RingNet::topology();
    let stream = ring_stream(&t);
    let mut configurator = StreamRedundancyConfigurator::new(1, 4095);
    configurator.configure_stream(&mut t, &stream).unwrap();
    assert_vlan_uniqueness(&t);

    let names = |n: &str, port: crate::topology::PortId| {
        assert_eq!(port.node, id(&t, n));
        t.port(port).name.clone()
    };

    // the source identifies and encodes the stream
    let src = t.node(id(&t, "S")).streams();
    assert_eq!(src.identifications.len(), 1);
    assert_eq!(src.identifications[0].stream, "s1");
    assert_eq!(src.encodings.len(), 1);
    assert_eq!(src.encodings[0].stream, "s1");
    assert_eq!(src.encodings[0].vlan, 1);
    assert!(src.splittings.is_empty());

    // A replicates the stream towards B and E
    let a = t.node(id(&t, "A")).streams();
    assert_eq!(
        a.splittings,
        vec![StreamSplitting {
            input_stream: "s1".to_string(),
            output_streams: vec!["s1_B".to_string(), "s1_E".to_string()],
        }]
    );
    let encodings: Vec<(String, u16)> =
        a.encodings.iter().map(|e| (e.stream.clone(), e.vlan)).collect();
    assert_eq!(encodings, vec![("s1_B".to_string(), 1), ("s1_E".to_string(), 2)]);
    assert_eq!(a.decodings.len(), 1);
    assert_eq!(a.decodings[0].vlan, 1);
    assert_eq!(a.decodings[0].stream, "s1");
    assert_eq!(names("A", a.decodings[0].port), "eth2");
    assert!(a.mergings.is_empty());

    // C eliminates the duplicates
    let c = t.node(id(&t, "C")).streams();
    assert_eq!(
        c.mergings,
        vec![StreamMerging {
            input_streams: vec!["s1_B".to_string(), "s1_E".to_string()],
            output_stream: "s1".to_string(),
        }]
    );
    let decodings: Vec<(String, u16, String)> = c
        .decodings
        .iter()
        .map(|d| (names("C", d.port), d.vlan, d.stream.clone()))
        .collect();
    assert_eq!(
        decodings,
        vec![
            ("eth0".to_string(), 1, "s1_B".to_string()),
            ("eth1".to_string(), 1, "s1_E".to_string())
        ]
    );
    assert_eq!(c.vlan_filter(), vec![1]);
    assert_eq!(c.encodings.len(), 1);
    assert_eq!(c.encodings[0].stream, "s1");

    // the destination only decodes
    let d = t.node(id(&t, "D")).streams();
    assert_eq!(d.decodings.len(), 1);
    assert!(d.encodings.is_empty());
    assert!(d.identifications.is_empty());
}

#[test]
fn vlan_ids_per_destination() {
    let mut t = RingNet::topology();
    let first = ring_stream(&t);
    let mut second = ring_stream(&t);
    second.name = "s2".to_string();
    let mut third = ring_stream(&t);
    third.name = "s3".to_string();
    third.destination_address = "other".to_string();

    let mut configurator = StreamRedundancyConfigurator::new(0, 4095);
    for s in [first, second, third].iter() {
        configurator.configure_stream(&mut t, s).unwrap();
    }
    assert_vlan_uniqueness(&t);

    let vlans = |stream: &str| -> Vec<u16> {
        t.node(id(&t, "A"))
            .streams()
            .encodings
            .iter()
            .filter(|e| e.stream.starts_with(stream))
            .map(|e| e.vlan)
            .collect()
    };
    // the counter continues for the same destination address, and restarts for a new one
    assert_eq!(vlans("s1"), vec![0, 1]);
    assert_eq!(vlans("s2"), vec![2, 3]);
    assert_eq!(vlans("s3"), vec![0, 1]);
}

#[test]
fn vlan_ids_exhausted() {
    let mut t = RingNet::topology();
    let stream = ring_stream(&t);
    let mut configurator = StreamRedundancyConfigurator::new(7, 7);
    match configurator.configure_stream(&mut t, &stream) {
        Err(e @ Error::VlanIdExhausted { .. }) => {
            assert!(e.is_infeasible());
            if let Error::VlanIdExhausted { node, destination, max_vlan_id } = e {
                assert_eq!(node, "A");
                assert_eq!(destination, "D");
                assert_eq!(max_vlan_id, 7);
            }
        }
        r => panic!("Unexpected result: {:?}", r),
    }
}

#[test]
fn clear_and_rebuild() {
    let mut t = RingNet::topology();
    let stream = ring_stream(&t);
    let mut configurator = StreamRedundancyConfigurator::new(0, 4095);
    configurator.configure_stream(&mut t, &stream).unwrap();
    let first: Vec<NodeStreamConfig> = t.node_ids().map(|n| t.node(n).streams().clone()).collect();

    t.clear_stream_configuration();
    assert!(t.node_ids().all(|n| t.node(n).streams().is_empty()));
    configurator.clear();
    configurator.configure_stream(&mut t, &stream).unwrap();
    let second: Vec<NodeStreamConfig> = t.node_ids().map(|n| t.node(n).streams().clone()).collect();
    assert_eq!(first, second);
}

#[test]
fn ring_fragments() {
    let mut t = RingNet::topology();
    let stream = ring_stream(&t);
    let mut configurator = StreamRedundancyConfigurator::new(0, 4095);
    configurator.configure_stream(&mut t, &stream).unwrap();
    let fragments: Vec<Vec<String>> =
        path_fragments(&t, "s1", &stream.trees).iter().map(|p| p.names(&t)).collect();
    assert_eq!(
        fragments,
        vec![
            vec!["S", "A"],
            vec!["A", "B", "C"],
            vec!["C", "D"],
            vec!["A", "E", "C"],
        ]
    );
}

#[test]
fn fragments_end_at_ingress_port() {
    let mut t = RingNet::topology();
    let stream = ring_stream(&t);
    let mut configurator = StreamRedundancyConfigurator::new(0, 4095);
    configurator.configure_stream(&mut t, &stream).unwrap();
    let fragments = path_fragments(&t, "s1", &stream.trees);
    let mut hops = Vec::new();
    for f in fragments.iter() {
        let last = f.len() - 1;
        assert_eq!(f.ports().last().copied(), f.ingress_port(&t, last));
        let links: Vec<_> = (1..f.len()).map(|i| f.hop_link(&t, i).unwrap()).collect();
        assert!(!hops.contains(&links), "fragment {:?} is duplicated", f.names(&t));
        hops.push(links);
    }
    // the hop S -> A is shared by both trees
    let s_a = fragments.iter().filter(|f| f.names(&t) == vec!["S", "A"]).count();
    assert_eq!(s_a, 1);
}

#[test]
fn ladder_multicast() {
    let mut t = LadderNet::topology();
    let s = id(&t, "S");
    let trees = vec![Tree::new(vec![
        Path::from_names(&t, &["S", "A1", "A2", "A3", "D1"]).unwrap(),
        Path::from_names(&t, &["A2", "B2", "B3", "D2"]).unwrap(),
    ])
    .canonical()];
    let stream = RedundantStream {
        name: "m".to_string(),
        packet_filter: "*".to_string(),
        packet_data_filter: None,
        source: s,
        destination_address: "group".to_string(),
        trees,
    };
    let mut configurator = StreamRedundancyConfigurator::new(0, 4095);
    configurator.configure_stream(&mut t, &stream).unwrap();
    assert_vlan_uniqueness(&t);

    // a single tree never splits on its branching node, it sends the stream to both receivers
    let a2 = t.node(id(&t, "A2")).streams();
    assert!(a2.splittings.is_empty());
    assert_eq!(a2.encodings.len(), 2);
    assert!(a2.encodings.iter().all(|e| e.stream == "m" && e.vlan == 0));
    assert!(a2.encodings.iter().all(|e| e.destination == "group"));
}
