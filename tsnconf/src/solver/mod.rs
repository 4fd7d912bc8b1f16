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

//! # Constraint Solver Interface
//!
//! The gate scheduling problem is built against the narrow [`Solver`] interface: declare variables,
//! assert formulas, check satisfiability and read back the values of the variables. Formulas are
//! boolean combinations of linear (in)equalities over real and integer variables.
//!
//! Three backends are available:
//!
//! - **`Z3Solver`**: Hands the problem to the Z3 SMT solver, and minimizes the objective with its
//!   optimization engine. Only available with the `z3-solver` feature (enabled by default), which
//!   links against the system's `libz3`.
//! - **[`CaseSplitSolver`]**: Pure Rust fallback without any native dependency. Disjunctions are
//!   resolved by case splitting, and the linear part of every case is decided with a two-phase
//!   simplex. Integer variables are handled by branching on fractional values. The search is
//!   exponential in the number of disjunctions, and the objective is only optimized locally.
//! - **[`SmtLibScript`]**: Does not solve anything, but records the problem as an SMT-LIB 2 script
//!   to be solved by an external SMT solver.
//!
//! ```
//! use tsnconf::solver::*;
//!
//! let mut solver = CaseSplitSolver::new();
//! let x = solver.declare_real("x");
//! let y = solver.declare_real("y");
//! solver.assert(LinExpr::from(x).ge(0.0));
//! solver.assert(Formula::or(vec![LinExpr::from(x).ge(10.0), LinExpr::from(x).le(2.0)]));
//! solver.assert((x + y).eq(12.0));
//! solver.assert(LinExpr::from(y).ge(3.0));
//! assert_eq!(solver.check(), Ok(SatResult::Sat));
//! let x = solver.value(x).unwrap();
//! assert!(x <= 2.0 + 1e-9);
//! ```

mod case_split;
mod expr;
mod simplex;
mod smtlib;
#[cfg(feature = "z3-solver")]
mod z3_backend;

pub use case_split::{CaseSplitSolver, SolverStatistics};
pub use expr::{Constraint, Formula, LinExpr, Relation, Var};
pub use smtlib::SmtLibScript;
#[cfg(feature = "z3-solver")]
pub use z3_backend::Z3Solver;

use std::fmt;
use thiserror::Error;

/// Margin by which strict inequalities are enforced.
pub const STRICT_EPSILON: f64 = 1e-3;
/// Tolerance when evaluating constraints.
pub const TOLERANCE: f64 = 1e-6;

/// Kind of a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarKind {
    /// Real-valued variable
    Real,
    /// Integer-valued variable
    Int,
}

/// Result of a satisfiability check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SatResult {
    /// A model was found
    Sat,
    /// The problem has no solution
    Unsat,
    /// The solver gave up (timeout or resource limit), or cannot solve at all.
    Unknown,
}

impl fmt::Display for SatResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sat => write!(f, "sat"),
            Self::Unsat => write!(f, "unsat"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Solver Error
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolverError {
    /// A formula uses a variable which was not declared by this solver
    #[error("Variable {0} was not declared")]
    UndeclaredVariable(usize),
    /// A formula contains a coefficient or constant that is not finite
    #[error("Formula contains a non-finite number")]
    NonFiniteNumber,
    /// The solver reported a satisfiable problem, but the model cannot be read back
    #[error("The solver returned no readable model")]
    NoModel,
}

/// Narrow interface to a constraint solver.
pub trait Solver {
    /// Declare a new variable with the given name and kind.
    fn declare(&mut self, name: &str, kind: VarKind) -> Var;

    /// Declare a new real-valued variable
    fn declare_real(&mut self, name: &str) -> Var {
        self.declare(name, VarKind::Real)
    }

    /// Declare a new integer-valued variable
    fn declare_int(&mut self, name: &str) -> Var {
        self.declare(name, VarKind::Int)
    }

    /// Assert that the formula holds.
    fn assert(&mut self, formula: Formula);

    /// Set a linear objective, which is minimized among the solutions of the case which is found
    /// to be satisfiable. The solution is not guaranteed to be the global optimum.
    fn set_objective(&mut self, objective: LinExpr);

    /// Check whether all assertions can be satisfied at the same time.
    fn check(&mut self) -> Result<SatResult, SolverError>;

    /// Returns the value of the variable in the model found by the last successful check.
    fn value(&self, var: Var) -> Option<f64>;
}
