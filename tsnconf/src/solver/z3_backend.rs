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

//! Backend solving the problem with the Z3 SMT solver.

use super::{
    Constraint, Formula, LinExpr, Relation, SatResult, Solver, SolverError, Var, VarKind,
    STRICT_EPSILON,
};

use log::*;
use std::time::{Duration, Instant};
use z3::ast::{Ast, Bool, Int, Real};
use z3::{Config, Context, Model, Optimize};

/// # Z3 Solver
///
/// Records all declarations, assertions and the objective, and hands them to a fresh Z3
/// [`Optimize`] instance on every check. Real variables are declared as `Real` and integer
/// variables as `Int` constants. Every number is passed to Z3 as an exact decimal fraction.
/// Strict inequalities are enforced with a margin of [`STRICT_EPSILON`], like in every other
/// backend. If an objective is set, Z3 returns the global minimum.
///
/// If the timeout is reached, the check returns [`SatResult::Unknown`].
#[derive(Debug, Clone, Default)]
pub struct Z3Solver {
    names: Vec<String>,
    kinds: Vec<VarKind>,
    assertions: Vec<Formula>,
    objective: Option<LinExpr>,
    timeout: Option<Duration>,
    model: Option<Vec<f64>>,
    time: Duration,
}

impl Z3Solver {
    /// Create a new, empty solver without a timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timeout for every check. It is passed to Z3 in milliseconds.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Time spent in the last check
    pub fn time(&self) -> Duration {
        self.time
    }

    /// Number of declared variables
    pub fn num_vars(&self) -> usize {
        self.names.len()
    }

    fn solve(&self) -> Result<(SatResult, Option<Vec<f64>>), SolverError> {
        let mut cfg = Config::new();
        cfg.set_model_generation(true);
        if let Some(timeout) = self.timeout {
            cfg.set_timeout_msec(timeout.as_millis().max(1) as u64);
        }
        let ctx = Context::new(&cfg);
        let encoder = Encoder::new(&ctx, &self.names, &self.kinds);

        let optimize = Optimize::new(&ctx);
        for f in self.assertions.iter() {
            optimize.assert(&encoder.formula(f)?);
        }
        if let Some(objective) = self.objective.as_ref() {
            optimize.minimize(&encoder.expr(objective)?);
        }

        match optimize.check(&[]) {
            z3::SatResult::Sat => {
                let model = optimize.get_model().ok_or(SolverError::NoModel)?;
                Ok((SatResult::Sat, Some(encoder.values(&model)?)))
            }
            z3::SatResult::Unsat => Ok((SatResult::Unsat, None)),
            z3::SatResult::Unknown => {
                warn!("Z3 gave up (timeout: {:?})", self.timeout);
                Ok((SatResult::Unknown, None))
            }
        }
    }
}

impl Solver for Z3Solver {
    fn declare(&mut self, name: &str, kind: VarKind) -> Var {
        self.names.push(name.to_string());
        self.kinds.push(kind);
        Var(self.names.len() - 1)
    }

    fn assert(&mut self, formula: Formula) {
        self.assertions.push(formula);
    }

    fn set_objective(&mut self, objective: LinExpr) {
        self.objective = Some(objective);
    }

    fn check(&mut self) -> Result<SatResult, SolverError> {
        let num_vars = self.names.len();
        for f in self.assertions.iter() {
            f.validate(num_vars)?;
        }
        if let Some(objective) = self.objective.as_ref() {
            objective.validate(num_vars)?;
        }
        debug!(
            "Z3: {} variables, {} assertions, objective: {}",
            num_vars,
            self.assertions.len(),
            self.objective.is_some()
        );

        let start = Instant::now();
        self.model = None;
        let (result, model) = self.solve()?;
        self.model = model;
        self.time = start.elapsed();
        info!("Solver result: {} ({:?})", result, self.time);
        Ok(result)
    }

    fn value(&self, var: Var) -> Option<f64> {
        self.model.as_ref().and_then(|m| m.get(var.index()).copied())
    }
}

/// Translation of formulas into Z3 terms of a single context.
struct Encoder<'ctx> {
    ctx: &'ctx Context,
    /// Every variable as a real term. Integer variables are converted with `to_real`.
    vars: Vec<Real<'ctx>>,
}

impl<'ctx> Encoder<'ctx> {
    fn new(ctx: &'ctx Context, names: &[String], kinds: &[VarKind]) -> Self {
        let vars = names
            .iter()
            .zip(kinds.iter())
            .map(|(name, kind)| match kind {
                VarKind::Real => Real::new_const(ctx, name.as_str()),
                VarKind::Int => Int::new_const(ctx, name.as_str()).to_real(),
            })
            .collect();
        Self { ctx, vars }
    }

    fn formula(&self, f: &Formula) -> Result<Bool<'ctx>, SolverError> {
        Ok(match f {
            Formula::True => Bool::from_bool(self.ctx, true),
            Formula::False => Bool::from_bool(self.ctx, false),
            Formula::Atom(c) => self.constraint(c)?,
            Formula::Not(f) => self.formula(f)?.not(),
            Formula::And(fs) => {
                let children = fs.iter().map(|f| self.formula(f)).collect::<Result<Vec<_>, _>>()?;
                Bool::and(self.ctx, &children.iter().collect::<Vec<_>>())
            }
            Formula::Or(fs) => {
                let children = fs.iter().map(|f| self.formula(f)).collect::<Result<Vec<_>, _>>()?;
                Bool::or(self.ctx, &children.iter().collect::<Vec<_>>())
            }
            Formula::Implies(a, b) => self.formula(a)?.implies(&self.formula(b)?),
        })
    }

    fn constraint(&self, c: &Constraint) -> Result<Bool<'ctx>, SolverError> {
        let e = self.expr(&c.expr)?;
        Ok(match c.rel {
            Relation::Le => e.le(&self.number(0.0)?),
            Relation::Lt => e.le(&self.number(-STRICT_EPSILON)?),
            Relation::Eq => e._eq(&self.number(0.0)?),
            Relation::Ge => e.ge(&self.number(0.0)?),
            Relation::Gt => e.ge(&self.number(STRICT_EPSILON)?),
        })
    }

    fn expr(&self, e: &LinExpr) -> Result<Real<'ctx>, SolverError> {
        let mut parts = Vec::new();
        for (v, c) in e.terms() {
            let var = self.vars.get(v.index()).ok_or(SolverError::UndeclaredVariable(v.index()))?;
            if c == 1.0 {
                parts.push(var.clone());
            } else {
                parts.push(Real::mul(self.ctx, &[&self.number(c)?, var]));
            }
        }
        if e.constant_part() != 0.0 || parts.is_empty() {
            parts.push(self.number(e.constant_part())?);
        }
        if parts.len() == 1 {
            Ok(parts.remove(0))
        } else {
            Ok(Real::add(self.ctx, &parts.iter().collect::<Vec<_>>()))
        }
    }

    /// Exact rational of the decimal representation of the number.
    fn number(&self, x: f64) -> Result<Real<'ctx>, SolverError> {
        let (num, den) = decimal_fraction(x).ok_or(SolverError::NonFiniteNumber)?;
        let r = Real::from_real_str(self.ctx, &num, &den).ok_or(SolverError::NonFiniteNumber)?;
        Ok(if x < 0.0 { r.unary_minus() } else { r })
    }

    fn values(&self, model: &Model<'ctx>) -> Result<Vec<f64>, SolverError> {
        self.vars
            .iter()
            .map(|v| {
                model
                    .eval(v, true)
                    .and_then(|r| r.as_real())
                    .map(|(num, den)| num as f64 / den as f64)
                    .ok_or(SolverError::NoModel)
            })
            .collect()
    }
}

/// Numerator and denominator of the absolute value of `x`, both as decimal integers.
fn decimal_fraction(x: f64) -> Option<(String, String)> {
    if !x.is_finite() {
        return None;
    }
    // the display representation of floats never uses an exponent
    let s = format!("{}", x.abs());
    let (int, frac) = match s.find('.') {
        Some(i) => (&s[..i], &s[i + 1..]),
        None => (s.as_str(), ""),
    };
    let num = format!("{}{}", int, frac);
    let num = num.trim_start_matches('0');
    let num = if num.is_empty() { "0" } else { num };
    Some((num.to_string(), format!("1{}", "0".repeat(frac.len()))))
}
