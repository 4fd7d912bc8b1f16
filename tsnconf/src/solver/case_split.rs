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

//! Case-splitting solver on top of the simplex.

use super::simplex::{self, LpResult};
use super::{Constraint, Formula, LinExpr, SatResult, Solver, SolverError, Var, VarKind};

use log::*;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

const INTEGRALITY_TOLERANCE: f64 = 1e-6;
const DEFAULT_NODE_LIMIT: usize = 100_000;
const DEFAULT_LP_ITERATIONS: usize = 50_000;

/// # Case-Splitting Solver
///
/// Every assertion is transformed into negation normal form. Conjunctions of linear constraints
/// are always enforced, while disjunctions are only resolved once the current solution of the
/// linear part violates them. The solver then branches on every disjunct in the given order, and
/// backtracks once the linear part gets infeasible. Integer variables with a fractional value are
/// resolved by branching on `x <= floor(v)` or `x >= floor(v) + 1`.
///
/// If an objective is set, then the solution of the first satisfiable case is optimized, while
/// keeping every disjunction satisfied by the same disjunct. The result is therefore locally
/// optimal, but not necessarily the global optimum.
///
/// The search can be limited by a timeout and by the number of explored cases. Once any of these
/// limits is reached, the check returns [`SatResult::Unknown`].
#[derive(Debug, Clone)]
pub struct CaseSplitSolver {
    names: Vec<String>,
    kinds: Vec<VarKind>,
    assertions: Vec<Formula>,
    objective: Option<LinExpr>,
    timeout: Option<Duration>,
    node_limit: usize,
    lp_iterations: usize,
    model: Option<Vec<f64>>,
    stats: SolverStatistics,
}

/// Statistics of the last check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolverStatistics {
    /// Number of explored cases
    pub nodes: usize,
    /// Number of linear programs solved
    pub lp_calls: usize,
    /// Time spent in the last check
    pub time: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    Timeout,
    NodeLimit,
    IterationLimit,
}

impl fmt::Display for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::NodeLimit => write!(f, "case limit reached"),
            Self::IterationLimit => write!(f, "simplex iteration limit reached"),
        }
    }
}

type Pending = Vec<Rc<Formula>>;

/// Open branching decision
struct Frame {
    atoms: Vec<Constraint>,
    pending: Pending,
    disjuncts: Vec<Formula>,
    next: usize,
}

enum Child {
    Exhausted,
    False,
    Node(Vec<Constraint>, Pending),
}

impl Frame {
    fn next_child(&mut self) -> Child {
        if self.next >= self.disjuncts.len() {
            return Child::Exhausted;
        }
        let disjunct = self.disjuncts[self.next].clone();
        self.next += 1;
        let mut atoms = self.atoms.clone();
        let mut pending = self.pending.clone();
        if collect(disjunct, &mut atoms, &mut pending) {
            Child::Node(atoms, pending)
        } else {
            Child::False
        }
    }
}

enum Leaf {
    Model(Vec<f64>),
    Split(Formula),
}

impl Default for CaseSplitSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl CaseSplitSolver {
    /// Create a new, empty solver without a timeout.
    pub fn new() -> Self {
        Self {
            names: Vec::new(),
            kinds: Vec::new(),
            assertions: Vec::new(),
            objective: None,
            timeout: None,
            node_limit: DEFAULT_NODE_LIMIT,
            lp_iterations: DEFAULT_LP_ITERATIONS,
            model: None,
            stats: SolverStatistics::default(),
        }
    }

    /// Set the timeout for every check.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the maximum number of cases explored in a single check.
    pub fn with_node_limit(mut self, limit: usize) -> Self {
        self.node_limit = limit;
        self
    }

    /// Statistics of the last check
    pub fn statistics(&self) -> SolverStatistics {
        self.stats
    }

    /// Name of the variable
    pub fn name(&self, var: Var) -> Option<&str> {
        self.names.get(var.index()).map(|s| s.as_str())
    }

    /// Number of declared variables
    pub fn num_vars(&self) -> usize {
        self.names.len()
    }

    fn tick(&mut self, deadline: Option<Instant>) -> Result<(), Interrupt> {
        self.stats.nodes += 1;
        if self.stats.nodes > self.node_limit {
            return Err(Interrupt::NodeLimit);
        }
        match deadline {
            Some(d) if Instant::now() > d => Err(Interrupt::Timeout),
            _ => Ok(()),
        }
    }

    fn lp(
        &mut self,
        atoms: &[Constraint],
        objective: Option<&LinExpr>,
    ) -> Result<Option<Vec<f64>>, Interrupt> {
        self.stats.lp_calls += 1;
        match simplex::solve(self.names.len(), atoms, objective, self.lp_iterations) {
            LpResult::Feasible(point) => Ok(Some(point)),
            LpResult::Infeasible => Ok(None),
            LpResult::IterationLimit => Err(Interrupt::IterationLimit),
        }
    }

    fn search(
        &mut self,
        atoms: Vec<Constraint>,
        pending: Pending,
        deadline: Option<Instant>,
    ) -> Result<Option<Vec<f64>>, Interrupt> {
        let mut frames: Vec<Frame> = Vec::new();
        let mut current = Some((atoms, pending));

        loop {
            let (atoms, mut pending) = match current.take() {
                Some(node) => node,
                None => {
                    let child = match frames.last_mut() {
                        Some(frame) => frame.next_child(),
                        None => return Ok(None),
                    };
                    match child {
                        Child::Exhausted => {
                            frames.pop();
                            continue;
                        }
                        Child::False => continue,
                        Child::Node(atoms, pending) => (atoms, pending),
                    }
                }
            };
            self.tick(deadline)?;

            let point = match self.lp(&atoms, None)? {
                Some(point) => point,
                None => continue,
            };

            if let Some(idx) = pending.iter().position(|c| !c.eval(&point)) {
                let clause = pending.remove(idx);
                let disjuncts = match clause.as_ref() {
                    Formula::Or(fs) => fs.clone(),
                    f => vec![f.clone()],
                };
                trace!("split on a disjunction with {} cases", disjuncts.len());
                frames.push(Frame { atoms, pending, disjuncts, next: 0 });
                continue;
            }

            match self.leaf(&atoms, &pending, point)? {
                Leaf::Model(model) => return Ok(Some(model)),
                Leaf::Split(clause) => {
                    pending.push(Rc::new(clause));
                    current = Some((atoms, pending));
                }
            }
        }
    }

    /// All constraints and disjunctions are satisfied by `point`. Optimize the objective (if any)
    /// and check integrality.
    fn leaf(
        &mut self,
        atoms: &[Constraint],
        pending: &[Rc<Formula>],
        point: Vec<f64>,
    ) -> Result<Leaf, Interrupt> {
        let mut point = point;
        if let Some(objective) = self.objective.clone() {
            let mut committed = atoms.to_vec();
            pending.iter().for_each(|c| commit_satisfied(c, &point, &mut committed));
            if let Some(optimized) = self.lp(&committed, Some(&objective))? {
                if pending.iter().all(|c| c.eval(&optimized)) {
                    point = optimized;
                } else {
                    debug!("optimized point violates a disjunction, keep the feasible point");
                }
            }
        }

        for (i, kind) in self.kinds.iter().enumerate() {
            if *kind == VarKind::Int {
                let v = point[i];
                if (v - v.round()).abs() > INTEGRALITY_TOLERANCE {
                    let x = LinExpr::from(Var(i));
                    let floor = v.floor();
                    return Ok(Leaf::Split(Formula::Or(vec![
                        x.clone().le(floor),
                        x.ge(floor + 1.0),
                    ])));
                }
                point[i] = v.round();
            }
        }

        Ok(Leaf::Model(point))
    }
}

/// Split a formula in negation normal form into linear constraints and pending disjunctions.
/// Returns `false` if the formula is trivially false.
fn collect(formula: Formula, atoms: &mut Vec<Constraint>, pending: &mut Pending) -> bool {
    match formula {
        Formula::True => true,
        Formula::False => false,
        Formula::Atom(c) => {
            atoms.push(c);
            true
        }
        Formula::And(fs) => fs.into_iter().all(|f| collect(f, atoms, pending)),
        Formula::Or(fs) => {
            pending.push(Rc::new(Formula::Or(fs)));
            true
        }
        f @ Formula::Not(_) | f @ Formula::Implies(_, _) => collect(f.nnf(), atoms, pending),
    }
}

/// Add the constraints of the part of the formula which is satisfied by the point.
fn commit_satisfied(formula: &Formula, point: &[f64], atoms: &mut Vec<Constraint>) {
    match formula {
        Formula::Atom(c) => atoms.push(c.clone()),
        Formula::And(fs) => fs.iter().for_each(|f| commit_satisfied(f, point, atoms)),
        Formula::Or(fs) => {
            if let Some(f) = fs.iter().find(|f| f.eval(point)) {
                commit_satisfied(f, point, atoms)
            }
        }
        _ => {}
    }
}

impl Solver for CaseSplitSolver {
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
        self.model = None;
        self.stats = SolverStatistics::default();
        let num_vars = self.names.len();
        for f in self.assertions.iter() {
            f.validate(num_vars)?;
        }
        if let Some(objective) = self.objective.as_ref() {
            objective.validate(num_vars)?;
        }

        let start = Instant::now();
        let deadline = self.timeout.map(|t| start + t);

        let mut atoms = Vec::new();
        let mut pending = Vec::new();
        let mut trivially_false = false;
        for f in self.assertions.iter() {
            if !collect(f.clone().nnf(), &mut atoms, &mut pending) {
                trivially_false = true;
                break;
            }
        }
        debug!(
            "checking {} variables, {} constraints and {} disjunctions",
            num_vars,
            atoms.len(),
            pending.len()
        );

        let result = if trivially_false {
            SatResult::Unsat
        } else {
            match self.search(atoms, pending, deadline) {
                Ok(Some(model)) => {
                    self.model = Some(model);
                    SatResult::Sat
                }
                Ok(None) => SatResult::Unsat,
                Err(interrupt) => {
                    warn!("Solver gave up: {}", interrupt);
                    SatResult::Unknown
                }
            }
        };
        self.stats.time = start.elapsed();
        info!(
            "Solver result: {} ({} cases, {} linear programs, {:?})",
            result, self.stats.nodes, self.stats.lp_calls, self.stats.time
        );
        Ok(result)
    }

    fn value(&self, var: Var) -> Option<f64> {
        self.model.as_ref().and_then(|m| m.get(var.index()).copied())
    }
}
