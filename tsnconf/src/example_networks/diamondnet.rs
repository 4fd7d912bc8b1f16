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

//! # DiamondNet

use super::{add_device_at, ExampleNetwork};
use crate::config::{ConfigError, Configuration};
use crate::topology::Topology;

/// # DiamondNet
///
/// Two streams of different priorities from `S` to `D`, each sent over a single tree. Both trees
/// share all ports, so the gates of the two priorities must not overlap.
///
/// ```text
///           B
///         /   \
/// S --- A       E --- D
///         \   /
///           C
/// ```
pub struct DiamondNet {}

impl ExampleNetwork for DiamondNet {
    fn topology() -> Topology {
        let mut t = Topology::new();
        let a = t.add_switch("A");
        let b = t.add_switch("B");
        let c = t.add_switch("C");
        let e = t.add_switch("E");
        t.add_link(a, b);
        t.add_link(a, c);
        t.add_link(b, e);
        t.add_link(c, e);
        add_device_at(&mut t, "S", a, "0A-00-00-00-00-01");
        add_device_at(&mut t, "D", e, "0A-00-00-00-00-02");
        t
    }

    fn configuration() -> Result<Configuration, ConfigError> {
        Configuration::from_json_str(
            r#"{
                "gateScheduling": { "cycleDuration": "1ms", "bestEffortFraction": 0.5 },
                "streams": [
                    {
                        "name": "audio",
                        "source": "S",
                        "destination": "D",
                        "maxRedundancy": 1,
                        "application": "S.audio",
                        "priority": 3,
                        "packetLength": "1500B",
                        "packetInterval": "1ms"
                    },
                    {
                        "name": "video",
                        "source": "S",
                        "destination": "D",
                        "maxRedundancy": 1,
                        "application": "S.video",
                        "priority": 4,
                        "packetLength": "1000B",
                        "packetInterval": "1ms"
                    }
                ]
            }"#,
        )
    }
}
