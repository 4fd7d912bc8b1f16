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

//! # Gate Scheduling
//!
//! Computes the periodic gate schedule of every port transmitting time-sensitive flows, and the
//! start offset of every application. The [`Input`] describes the ports, applications and flows
//! (split into path fragments). The [`GateScheduleModel`] asserts the scheduling constraints on any
//! [`Solver`], and extracts the [`Output`] from the model.
//!
//! ```
//! use tsnconf::gate_scheduling::{compute_schedule, Application, Input};
//! use tsnconf::topology::Topology;
//! use tsnconf::trees::Path;
//!
//! let mut t = Topology::new();
//! let s = t.add_device("S");
//! let a = t.add_switch("A");
//! let d = t.add_device("D");
//! t.add_link(s, a);
//! t.add_link(a, d);
//!
//! let mut input = Input::new(1e-3);
//! let app = input.add_application(Application {
//!     name: "S.app".to_string(),
//!     device: s,
//!     device_name: "S".to_string(),
//!     priority: 0,
//!     packet_length: 800.0,
//!     packet_interval: 1e-3,
//!     max_latency: None,
//! }).unwrap();
//! let path = Path::from_names(&t, &["S", "A", "D"]).unwrap();
//! input.add_flow(&t, "flow", app, vec![path]);
//!
//! let output = compute_schedule(&input, None).unwrap();
//! assert_eq!(output.schedules.len(), 2);
//! assert_eq!(output.application_offsets["S.app"], 0.0);
//! ```

mod input;
mod model;
mod offset;
mod schedule;

pub use input::{Application, Flow, Input, PortInput};
pub use model::GateScheduleModel;
pub use offset::compute_offsets;
pub use schedule::{Output, PeriodicGate, PortSchedule, Slot};

use crate::error::Error;
#[cfg(not(feature = "z3-solver"))]
use crate::solver::CaseSplitSolver;
#[cfg(feature = "z3-solver")]
use crate::solver::Z3Solver;
use crate::solver::{SmtLibScript, Solver};

use log::*;
use std::time::{Duration, Instant};

/// Compute the gate schedule with the default solver: Z3 if the `z3-solver` feature is enabled,
/// and the built-in [`CaseSplitSolver`](crate::solver::CaseSplitSolver) otherwise. If the solver
/// does not find a schedule within the timeout, the problem is reported as infeasible.
pub fn compute_schedule(input: &Input, timeout: Option<Duration>) -> Result<Output, Error> {
    if input.flows.is_empty() {
        debug!("No flows to schedule");
        return Ok(Output::default());
    }
    let start = Instant::now();
    let output = compute_schedule_with(input, default_solver(timeout))?;
    info!(
        "Computed the gate schedule of {} ports in {:?}",
        output.schedules.len(),
        start.elapsed()
    );
    Ok(output)
}

#[cfg(feature = "z3-solver")]
fn default_solver(timeout: Option<Duration>) -> Z3Solver {
    Z3Solver::new().with_timeout(timeout)
}

#[cfg(not(feature = "z3-solver"))]
fn default_solver(timeout: Option<Duration>) -> CaseSplitSolver {
    warn!("Built without the z3-solver feature, falling back to the case-splitting solver");
    let solver = CaseSplitSolver::new().with_timeout(timeout);
    // with a timeout, only the time bounds the search
    match timeout {
        Some(_) => solver.with_node_limit(usize::MAX),
        None => solver,
    }
}

/// Build the gate scheduling problem and write it as an SMT-LIB 2 script.
pub fn export_smtlib(input: &Input) -> Result<String, Error> {
    let model = GateScheduleModel::build(input, SmtLibScript::new())?;
    Ok(model.into_solver().to_script())
}

/// Build the gate scheduling problem on any solver, and solve it.
pub fn compute_schedule_with<S: Solver>(input: &Input, solver: S) -> Result<Output, Error> {
    GateScheduleModel::build(input, solver)?.solve()
}
