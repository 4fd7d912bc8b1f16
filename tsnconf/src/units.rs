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

//! # Quantities with Units
//!
//! Configuration values like `100B`, `1ms` or `1Gbps` are parsed once at the boundary into typed
//! quantities. Internally, data sizes are stored in bits, times in seconds, data rates in bits per
//! second and lengths in meters. Plain numbers (without unit) are interpreted in these base units.

use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Signal propagation speed in cables (meters per second).
pub const SIGNAL_SPEED: f64 = 2e8;

/// Error while parsing a quantity
#[derive(Debug, Error, Clone, PartialEq)]
pub enum UnitError {
    /// The numeric part cannot be parsed
    #[error("Cannot parse the number in {0:?}")]
    InvalidNumber(String),
    /// The unit is not known for this kind of quantity
    #[error("Unknown unit {unit:?} for a {kind}")]
    UnknownUnit {
        /// Kind of quantity
        kind: &'static str,
        /// Unit that was found
        unit: String,
    },
    /// Quantities must be non-negative
    #[error("Quantity must not be negative: {0:?}")]
    Negative(String),
}

/// Raw representation of a quantity in the configuration, either a plain number or a string with
/// unit.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum QuantityRepr {
    /// Number in base units
    Number(f64),
    /// Number followed by a unit
    Text(String),
}

/// Splits `s` into the numeric part and the unit, and returns the value in base units.
fn parse_quantity(s: &str, kind: &'static str, units: &[(&str, f64)]) -> Result<f64, UnitError> {
    let s = s.trim();
    let split = s
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || *c == '.' || *c == '-' || *c == '+'))
        .map(|(i, _)| i)
        .unwrap_or_else(|| s.len());
    let (number, unit) = s.split_at(split);
    let number: f64 = number.parse().map_err(|_| UnitError::InvalidNumber(s.to_string()))?;
    if number < 0.0 || !number.is_finite() {
        return Err(UnitError::Negative(s.to_string()));
    }
    let unit = unit.trim();
    if unit.is_empty() {
        return Ok(number);
    }
    units
        .iter()
        .find(|(u, _)| *u == unit)
        .map(|(_, factor)| number * factor)
        .ok_or_else(|| UnitError::UnknownUnit { kind, unit: unit.to_string() })
}

macro_rules! quantity {
    ($(#[$meta:meta])* $name:ident, $kind:expr, $base:expr, [$(($unit:expr, $factor:expr)),* $(,)?]) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
        #[serde(try_from = "QuantityRepr", into = "String")]
        pub struct $name(pub f64);

        impl $name {
            const UNITS: &'static [(&'static str, f64)] = &[$(($unit, $factor)),*];

            /// Returns the value in base units.
            pub fn value(&self) -> f64 {
                self.0
            }
        }

        impl FromStr for $name {
            type Err = UnitError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_quantity(s, $kind, Self::UNITS).map(Self)
            }
        }

        impl TryFrom<QuantityRepr> for $name {
            type Error = UnitError;

            fn try_from(repr: QuantityRepr) -> Result<Self, Self::Error> {
                match repr {
                    QuantityRepr::Number(x) if x < 0.0 || !x.is_finite() => {
                        Err(UnitError::Negative(x.to_string()))
                    }
                    QuantityRepr::Number(x) => Ok(Self(x)),
                    QuantityRepr::Text(s) => s.parse(),
                }
            }
        }

        impl From<$name> for String {
            fn from(q: $name) -> String {
                q.to_string()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", self.0, $base)
            }
        }
    };
}

quantity!(
    /// Data size in bits
    Bits,
    "data size",
    "b",
    [
        ("b", 1.0),
        ("B", 8.0),
        ("kb", 1e3),
        ("kB", 8e3),
        ("KiB", 8.0 * 1024.0),
        ("Mb", 1e6),
        ("MB", 8e6),
        ("MiB", 8.0 * 1024.0 * 1024.0),
    ]
);

quantity!(
    /// Time in seconds
    Seconds,
    "time",
    "s",
    [("s", 1.0), ("ms", 1e-3), ("us", 1e-6), ("ns", 1e-9), ("ps", 1e-12)]
);

quantity!(
    /// Data rate in bits per second
    BitsPerSecond,
    "data rate",
    "bps",
    [("bps", 1.0), ("kbps", 1e3), ("Mbps", 1e6), ("Gbps", 1e9)]
);

quantity!(
    /// Length in meters
    Meters,
    "length",
    "m",
    [("m", 1.0), ("km", 1e3), ("cm", 1e-2), ("mm", 1e-3)]
);

impl Meters {
    /// Time a signal needs to travel this distance through a cable.
    pub fn propagation_time(&self) -> Seconds {
        Seconds(self.0 / SIGNAL_SPEED)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn parse_sizes() {
        assert_approx_eq!("100B".parse::<Bits>().unwrap().value(), 800.0);
        assert_approx_eq!("12 b".parse::<Bits>().unwrap().value(), 12.0);
        assert_approx_eq!("1.5kB".parse::<Bits>().unwrap().value(), 12000.0);
        assert_approx_eq!("64".parse::<Bits>().unwrap().value(), 64.0);
    }

    #[test]
    fn parse_times() {
        assert_approx_eq!("1ms".parse::<Seconds>().unwrap().value(), 1e-3);
        assert_approx_eq!("250us".parse::<Seconds>().unwrap().value(), 250e-6);
        assert_approx_eq!("0.5s".parse::<Seconds>().unwrap().value(), 0.5);
    }

    #[test]
    fn parse_errors() {
        assert_eq!(
            "10parsec".parse::<Meters>(),
            Err(UnitError::UnknownUnit { kind: "length", unit: "parsec".to_string() })
        );
        assert_eq!("ms".parse::<Seconds>(), Err(UnitError::InvalidNumber("ms".to_string())));
        assert_eq!("-1s".parse::<Seconds>(), Err(UnitError::Negative("-1s".to_string())));
        assert!("1Gbit".parse::<BitsPerSecond>().is_err());
    }

    #[test]
    fn deserialize() {
        let rate: BitsPerSecond = serde_json::from_str("\"1Gbps\"").unwrap();
        assert_approx_eq!(rate.value(), 1e9);
        let size: Bits = serde_json::from_str("1500").unwrap();
        assert_approx_eq!(size.value(), 1500.0);
        assert!(serde_json::from_str::<Seconds>("\"1 fortnight\"").is_err());
    }

    #[test]
    fn propagation() {
        let length: Meters = "20m".parse().unwrap();
        assert_approx_eq!(length.propagation_time().value(), 1e-7);
    }
}
