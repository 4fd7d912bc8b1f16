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

//! # LineNet

use super::{add_device_at, ExampleNetwork};
use crate::config::{ConfigError, Configuration};
use crate::topology::Topology;

/// # LineNet
///
/// Single stream over a chain of two switches, with a gate schedule.
///
/// ```text
/// S --- A --- B --- D
/// ```
pub struct LineNet {}

impl ExampleNetwork for LineNet {
    fn topology() -> Topology {
        let mut t = Topology::new();
        let a = t.add_switch("A");
        let b = t.add_switch("B");
        t.add_link(a, b);
        add_device_at(&mut t, "S", a, "0A-00-00-00-00-01");
        add_device_at(&mut t, "D", b, "0A-00-00-00-00-02");
        t
    }

    fn configuration() -> Result<Configuration, ConfigError> {
        Configuration::from_json_str(
            r#"{
                "gateScheduling": { "cycleDuration": "1ms" },
                "streams": [
                    {
                        "name": "control",
                        "source": "S",
                        "destination": "D",
                        "priority": 1,
                        "packetLength": "100B",
                        "packetInterval": "1ms"
                    }
                ]
            }"#,
        )
    }
}
