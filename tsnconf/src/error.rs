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

//! Module containing all error types

use crate::config::ConfigError;
use crate::protection::ProtectionFailure;
use crate::solver::SolverError;
use crate::topology::TopologyError;
use thiserror::Error;

/// Main error type
#[derive(Debug, Error)]
pub enum Error {
    /// Error in the topology description or while querying the topology
    #[error("Topology Error: {0}")]
    TopologyError(#[from] TopologyError),
    /// Invalid configuration
    #[error("Configuration Error: {0}")]
    ConfigError(#[from] ConfigError),
    /// No configuration exists which satisfies all requirements
    #[error("Infeasible: {0}")]
    Infeasible(#[from] Infeasibility),
    /// The constraint solver failed
    #[error("Solver Error: {0}")]
    SolverError(#[from] SolverError),
    /// All VLAN ids for a node and destination are used up
    #[error("No VLAN id left on {node} for destination {destination} (max VLAN id: {max_vlan_id})")]
    VlanIdExhausted {
        /// Node which sends the member streams
        node: String,
        /// Destination address of the stream
        destination: String,
        /// Largest VLAN id that may be assigned
        max_vlan_id: u16,
    },
}

impl Error {
    /// Returns true if the error is caused by requirements which cannot be satisfied, rather than
    /// by an invalid input.
    pub fn is_infeasible(&self) -> bool {
        matches!(self, Self::Infeasible(_) | Self::VlanIdExhausted { .. })
    }
}

/// Reason why no configuration exists
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Infeasibility {
    /// No subset of the candidate trees satisfies all failure protection requirements
    #[error(
        "No subset of at most {max_redundancy} trees for stream {stream} satisfies the failure protection{}",
        fmt_violation(.violated)
    )]
    NoProtectingTreeSubset {
        /// Name of the stream
        stream: String,
        /// Maximum number of trees
        max_redundancy: usize,
        /// Protection requirement which was violated by the last checked subset
        violated: Option<ProtectionFailure>,
    },
    /// The destination cannot be reached from the source of the stream
    #[error("Destination {destination} of stream {stream} is unreachable")]
    Unreachable {
        /// Name of the stream
        stream: String,
        /// Name of the destination
        destination: String,
    },
    /// The gate scheduling problem has no solution
    #[error("Gate schedule cannot be found: {reason}")]
    Unschedulable {
        /// Explanation
        reason: String,
    },
    /// No transmission offset of the application is consistent with the gate schedule
    #[error("No feasible start offset for application {application} on {node}")]
    NoFeasibleOffset {
        /// Name of the application
        application: String,
        /// Name of the device running the application
        node: String,
    },
}

fn fmt_violation(violated: &Option<ProtectionFailure>) -> String {
    match violated {
        Some(v) => format!(": {}", v),
        None => String::new(),
    }
}
