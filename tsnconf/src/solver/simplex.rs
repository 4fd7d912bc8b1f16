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

//! Dense two-phase simplex on a tableau, using Bland's rule for pivoting.
//!
//! Variables of the problem are free. Every variable `x` is split into `x = x_pos - x_neg` with
//! `x_pos, x_neg >= 0`. Strict inequalities are tightened by [`STRICT_EPSILON`].

use super::{Constraint, LinExpr, Relation, STRICT_EPSILON};

const PIVOT_EPS: f64 = 1e-9;

/// Result of solving a linear program.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LpResult {
    /// The constraints cannot be satisfied
    Infeasible,
    /// A feasible point. If an objective was given, then the point minimizes the objective, unless
    /// the objective is unbounded or the iteration limit was hit during optimization.
    Feasible(Vec<f64>),
    /// The iteration limit was hit before feasibility could be decided
    IterationLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Optimum {
    Optimal,
    Unbounded,
    IterationLimit,
}

#[derive(Debug)]
struct Tableau {
    /// Each row has `num_cols + 1` entries, the last one is the right-hand side.
    rows: Vec<Vec<f64>>,
    basis: Vec<usize>,
    num_cols: usize,
}

impl Tableau {
    fn rhs(&self, row: usize) -> f64 {
        self.rows[row][self.num_cols]
    }

    fn pivot(&mut self, objective: &mut [f64], row: usize, col: usize) {
        let p = self.rows[row][col];
        self.rows[row].iter_mut().for_each(|x| *x /= p);
        let pivot_row = self.rows[row].clone();
        for (i, r) in self.rows.iter_mut().enumerate() {
            if i != row {
                eliminate(r, &pivot_row, col);
            }
        }
        eliminate(objective, &pivot_row, col);
        self.basis[row] = col;
    }

    /// Minimize the objective, given as the row of reduced costs (last entry is the negative
    /// objective value). Only columns for which `allowed` returns true may enter the basis.
    fn optimize<F>(&mut self, objective: &mut [f64], allowed: F, max_iter: usize) -> Optimum
    where
        F: Fn(usize) -> bool,
    {
        for _ in 0..max_iter {
            // Bland's rule: smallest index with negative reduced cost
            let col = match (0..self.num_cols).find(|j| allowed(*j) && objective[*j] < -PIVOT_EPS)
            {
                Some(col) => col,
                None => return Optimum::Optimal,
            };
            let mut best: Option<(usize, f64)> = None;
            for i in 0..self.rows.len() {
                let a = self.rows[i][col];
                if a > PIVOT_EPS {
                    let ratio = self.rhs(i) / a;
                    best = match best {
                        None => Some((i, ratio)),
                        Some((b, r)) => {
                            if ratio < r - PIVOT_EPS
                                || (ratio <= r + PIVOT_EPS && self.basis[i] < self.basis[b])
                            {
                                Some((i, ratio))
                            } else {
                                Some((b, r))
                            }
                        }
                    };
                }
            }
            match best {
                Some((row, _)) => self.pivot(objective, row, col),
                None => return Optimum::Unbounded,
            }
        }
        Optimum::IterationLimit
    }

    fn values(&self) -> Vec<f64> {
        let mut values = vec![0.0; self.num_cols];
        for (i, b) in self.basis.iter().enumerate() {
            values[*b] = self.rhs(i).max(0.0);
        }
        values
    }
}

fn eliminate(target: &mut [f64], pivot_row: &[f64], col: usize) {
    let factor = target[col];
    if factor != 0.0 {
        target.iter_mut().zip(pivot_row.iter()).for_each(|(t, p)| *t -= factor * p);
        target[col] = 0.0;
    }
}

/// Solve the linear program over `num_vars` free variables. If an objective is given, it is
/// minimized.
pub(crate) fn solve(
    num_vars: usize,
    constraints: &[Constraint],
    objective: Option<&LinExpr>,
    max_iter: usize,
) -> LpResult {
    // normalize all rows to `a x (<=|==) b`
    let mut rows: Vec<(Vec<f64>, f64, Relation)> = Vec::with_capacity(constraints.len());
    for c in constraints {
        let mut a = vec![0.0; num_vars];
        for (v, coeff) in c.expr.terms() {
            a[v.index()] += coeff;
        }
        let mut b = -c.expr.constant_part();
        // only `<=` and `==` rows remain
        let rel = match c.rel {
            Relation::Lt => {
                b -= STRICT_EPSILON;
                Relation::Le
            }
            Relation::Gt | Relation::Ge => {
                if c.rel == Relation::Gt {
                    b += STRICT_EPSILON;
                }
                a.iter_mut().for_each(|x| *x = -*x);
                b = -b;
                Relation::Le
            }
            rel => rel,
        };
        if a.iter().all(|x| *x == 0.0) {
            let ok = match rel {
                Relation::Le => 0.0 <= b + PIVOT_EPS,
                _ => b.abs() <= PIVOT_EPS,
            };
            if ok {
                continue;
            } else {
                return LpResult::Infeasible;
            }
        }
        rows.push((a, b, rel));
    }

    let num_structural = 2 * num_vars;
    let num_slack = rows.iter().filter(|(_, _, rel)| *rel != Relation::Eq).count();
    // count artificial variables: rows whose slack cannot serve as the initial basis.
    let needs_artificial = |b: f64, rel: Relation| rel == Relation::Eq || b < 0.0;
    let num_artificial = rows.iter().filter(|(_, b, rel)| needs_artificial(*b, *rel)).count();
    let first_slack = num_structural;
    let first_artificial = num_structural + num_slack;
    let num_cols = first_artificial + num_artificial;

    let mut tableau = Tableau { rows: Vec::new(), basis: Vec::new(), num_cols };
    let mut slack = first_slack;
    let mut artificial = first_artificial;
    for (a, b, rel) in rows {
        let mut row = vec![0.0; num_cols + 1];
        for (i, x) in a.iter().enumerate() {
            row[2 * i] = *x;
            row[2 * i + 1] = -*x;
        }
        let slack_col = if rel == Relation::Le { Some(slack) } else { None };
        if let Some(col) = slack_col {
            row[col] = 1.0;
            slack += 1;
        }
        row[num_cols] = b;
        let artificial_needed = needs_artificial(b, rel);
        if b < 0.0 {
            row.iter_mut().for_each(|x| *x = -*x);
        }
        if artificial_needed {
            row[artificial] = 1.0;
            tableau.basis.push(artificial);
            artificial += 1;
        } else if let Some(col) = slack_col {
            tableau.basis.push(col);
        }
        tableau.rows.push(row);
    }

    let is_artificial = |j: usize| j >= first_artificial;

    // phase 1: minimize the sum of all artificial variables
    if num_artificial > 0 {
        let mut phase1 = vec![0.0; num_cols + 1];
        (first_artificial..num_cols).for_each(|j| phase1[j] = 1.0);
        for (i, b) in tableau.basis.iter().enumerate() {
            if is_artificial(*b) {
                let row = &tableau.rows[i];
                phase1.iter_mut().zip(row.iter()).for_each(|(p, r)| *p -= r);
            }
        }
        if tableau.optimize(&mut phase1, |_| true, max_iter) == Optimum::IterationLimit {
            return LpResult::IterationLimit;
        }
        let scale = tableau.rows.iter().map(|r| r[num_cols].abs()).fold(1.0, f64::max);
        if -phase1[num_cols] > PIVOT_EPS * scale {
            return LpResult::Infeasible;
        }
        // drive the artificial variables out of the basis
        for i in 0..tableau.rows.len() {
            if is_artificial(tableau.basis[i]) {
                if let Some(j) =
                    (0..first_artificial).find(|j| tableau.rows[i][*j].abs() > PIVOT_EPS)
                {
                    tableau.pivot(&mut phase1, i, j);
                }
            }
        }
    }

    // phase 2
    if let Some(objective) = objective {
        let mut cost = vec![0.0; num_cols + 1];
        for (v, c) in objective.terms() {
            cost[2 * v.index()] += c;
            cost[2 * v.index() + 1] -= c;
        }
        let basic_costs: Vec<f64> = tableau.basis.iter().map(|b| cost[*b]).collect();
        for (i, cb) in basic_costs.into_iter().enumerate() {
            if cb != 0.0 {
                let row = &tableau.rows[i];
                cost.iter_mut().zip(row.iter()).for_each(|(p, r)| *p -= cb * r);
            }
        }
        // unbounded or limited optimization still leaves a feasible basis.
        tableau.optimize(&mut cost, |j| !is_artificial(j), max_iter);
    }

    let values = tableau.values();
    LpResult::Feasible((0..num_vars).map(|i| values[2 * i] - values[2 * i + 1]).collect())
}
