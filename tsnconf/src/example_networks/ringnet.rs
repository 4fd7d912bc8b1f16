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

//! # RingNet

use super::{add_device_at, ExampleNetwork};
use crate::config::{ConfigError, Configuration};
use crate::topology::Topology;

/// # RingNet
///
/// Ring of four switches. The stream from `S` to `D` must survive the failure of either `B` or
/// `E`, so it is replicated at `A` and merged at `C`.
///
/// ```text
///           B
///         /   \
/// S --- A       C --- D
///         \   /
///           E
/// ```
pub struct RingNet {}

impl ExampleNetwork for RingNet {
    fn topology() -> Topology {
        let mut t = Topology::new();
        let a = t.add_switch("A");
        let b = t.add_switch("B");
        let c = t.add_switch("C");
        let e = t.add_switch("E");
        t.add_link(a, b);
        t.add_link(b, c);
        t.add_link(c, e);
        t.add_link(e, a);
        add_device_at(&mut t, "S", a, "0A-00-00-00-00-01");
        add_device_at(&mut t, "D", c, "0A-00-00-00-00-02");
        t
    }

    fn configuration() -> Result<Configuration, ConfigError> {
        Configuration::from_json_str(
            r#"{
                "minVlanId": 1,
                "gateScheduling": { "cycleDuration": "500us" },
                "streams": [
                    {
                        "name": "sensor",
                        "source": "S",
                        "destination": "D",
                        "priority": 2,
                        "packetLength": "200B",
                        "packetInterval": "500us",
                        "maxLatency": "100us",
                        "nodeFailureProtection": [{ "of": "B or E", "any": 1 }]
                    }
                ]
            }"#,
        )
    }
}
