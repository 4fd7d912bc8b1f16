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

//! # LadderNet

use super::{add_device_at, ExampleNetwork};
use crate::config::{ConfigError, Configuration};
use crate::topology::Topology;

/// # LadderNet
///
/// Two rails of three switches each, connected by rungs. The multicast stream from `S` reaches
/// both `D1` and `D2`, and must survive the failure of any single link between the rails.
///
/// ```text
///        A1 --- A2 --- A3 --- D1
///       / |     |      |
///     S   |     |      |
///       \ |     |      |
///        B1 --- B2 --- B3 --- D2
/// ```
pub struct LadderNet {}

impl ExampleNetwork for LadderNet {
    fn topology() -> Topology {
        let mut t = Topology::new();
        let a1 = t.add_switch("A1");
        let a2 = t.add_switch("A2");
        let a3 = t.add_switch("A3");
        let b1 = t.add_switch("B1");
        let b2 = t.add_switch("B2");
        let b3 = t.add_switch("B3");
        t.add_link(a1, a2);
        t.add_link(a2, a3);
        t.add_link(b1, b2);
        t.add_link(b2, b3);
        t.add_link(a1, b1);
        t.add_link(a2, b2);
        t.add_link(a3, b3);
        let s = add_device_at(&mut t, "S", a1, "0A-00-00-00-00-01");
        t.add_link(s, b1);
        add_device_at(&mut t, "D1", a3, "0A-00-00-00-00-02");
        add_device_at(&mut t, "D2", b3, "0A-00-00-00-00-03");
        t
    }

    fn configuration() -> Result<Configuration, ConfigError> {
        Configuration::from_json_str(
            r#"{
                "streams": [
                    {
                        "name": "alarm",
                        "source": "S",
                        "destination": "D*",
                        "destinationAddress": "01-00-5E-00-00-01",
                        "packetFilter": "udp dst port 5000",
                        "linkFailureProtection": [{ "of": "A2->A3 or B2->B3", "any": 1 }]
                    }
                ]
            }"#,
        )
    }
}
