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

//! Linear expressions and boolean formulas over solver variables.

use super::{SolverError, STRICT_EPSILON, TOLERANCE};

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

/// Handle to a variable declared on a solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Var(pub(crate) usize);

impl Var {
    /// Index of the variable, in order of declaration.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Linear expression `sum(coeff * var) + constant`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LinExpr {
    terms: BTreeMap<Var, f64>,
    constant: f64,
}

impl LinExpr {
    /// Create an expression with no variables
    pub fn constant(value: f64) -> Self {
        Self { terms: BTreeMap::new(), constant: value }
    }

    /// Create the expression `coeff * var`
    pub fn term(var: Var, coeff: f64) -> Self {
        let mut e = Self::default();
        e.add_term(var, coeff);
        e
    }

    /// Add `coeff * var` to the expression
    pub fn add_term(&mut self, var: Var, coeff: f64) {
        let c = self.terms.entry(var).or_insert(0.0);
        *c += coeff;
        if *c == 0.0 {
            self.terms.remove(&var);
        }
    }

    /// Iterator over all variables with non-zero coefficients, ordered by variable.
    pub fn terms(&self) -> impl Iterator<Item = (Var, f64)> + '_ {
        self.terms.iter().map(|(v, c)| (*v, *c))
    }

    /// Constant part of the expression
    pub fn constant_part(&self) -> f64 {
        self.constant
    }

    /// Returns true if the expression contains no variables.
    pub fn is_constant(&self) -> bool {
        self.terms.is_empty()
    }

    /// Evaluate the expression. Variables without a value are treated as zero.
    pub fn eval(&self, values: &[f64]) -> f64 {
        self.terms.iter().map(|(v, c)| c * values.get(v.0).copied().unwrap_or(0.0)).sum::<f64>()
            + self.constant
    }

    pub(crate) fn validate(&self, num_vars: usize) -> Result<(), SolverError> {
        if !self.constant.is_finite() {
            return Err(SolverError::NonFiniteNumber);
        }
        for (v, c) in self.terms.iter() {
            if v.0 >= num_vars {
                return Err(SolverError::UndeclaredVariable(v.0));
            }
            if !c.is_finite() {
                return Err(SolverError::NonFiniteNumber);
            }
        }
        Ok(())
    }

    fn relate(self, rel: Relation, rhs: impl Into<LinExpr>) -> Formula {
        Formula::Atom(Constraint::new(self - rhs.into(), rel))
    }

    /// `self <= rhs`
    pub fn le(self, rhs: impl Into<LinExpr>) -> Formula {
        self.relate(Relation::Le, rhs)
    }

    /// `self < rhs`
    pub fn lt(self, rhs: impl Into<LinExpr>) -> Formula {
        self.relate(Relation::Lt, rhs)
    }

    /// `self == rhs`
    pub fn eq(self, rhs: impl Into<LinExpr>) -> Formula {
        self.relate(Relation::Eq, rhs)
    }

    /// `self >= rhs`
    pub fn ge(self, rhs: impl Into<LinExpr>) -> Formula {
        self.relate(Relation::Ge, rhs)
    }

    /// `self > rhs`
    pub fn gt(self, rhs: impl Into<LinExpr>) -> Formula {
        self.relate(Relation::Gt, rhs)
    }
}

impl From<Var> for LinExpr {
    fn from(v: Var) -> Self {
        Self::term(v, 1.0)
    }
}

impl From<f64> for LinExpr {
    fn from(c: f64) -> Self {
        Self::constant(c)
    }
}

impl<T: Into<LinExpr>> Add<T> for LinExpr {
    type Output = LinExpr;

    fn add(mut self, rhs: T) -> LinExpr {
        let rhs = rhs.into();
        for (v, c) in rhs.terms {
            self.add_term(v, c);
        }
        self.constant += rhs.constant;
        self
    }
}

impl<T: Into<LinExpr>> Sub<T> for LinExpr {
    type Output = LinExpr;

    fn sub(self, rhs: T) -> LinExpr {
        self + (-rhs.into())
    }
}

impl Neg for LinExpr {
    type Output = LinExpr;

    fn neg(self) -> LinExpr {
        self * -1.0
    }
}

impl Mul<f64> for LinExpr {
    type Output = LinExpr;

    fn mul(mut self, rhs: f64) -> LinExpr {
        if rhs == 0.0 {
            return LinExpr::default();
        }
        self.terms.values_mut().for_each(|c| *c *= rhs);
        self.constant *= rhs;
        self
    }
}

impl<T: Into<LinExpr>> Add<T> for Var {
    type Output = LinExpr;

    fn add(self, rhs: T) -> LinExpr {
        LinExpr::from(self) + rhs
    }
}

impl<T: Into<LinExpr>> Sub<T> for Var {
    type Output = LinExpr;

    fn sub(self, rhs: T) -> LinExpr {
        LinExpr::from(self) - rhs
    }
}

impl Mul<f64> for Var {
    type Output = LinExpr;

    fn mul(self, rhs: f64) -> LinExpr {
        LinExpr::term(self, rhs)
    }
}

/// Relation of a [`Constraint`] to zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    /// `<= 0`
    Le,
    /// `< 0`
    Lt,
    /// `== 0`
    Eq,
    /// `>= 0`
    Ge,
    /// `> 0`
    Gt,
}

impl Relation {
    /// Symbol used in SMT-LIB
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Le => "<=",
            Self::Lt => "<",
            Self::Eq => "=",
            Self::Ge => ">=",
            Self::Gt => ">",
        }
    }
}

/// Linear constraint `expr REL 0`
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    /// Left-hand side. The right-hand side is always zero.
    pub expr: LinExpr,
    /// Relation to zero
    pub rel: Relation,
}

impl Constraint {
    /// Create a new constraint `expr REL 0`.
    pub fn new(expr: LinExpr, rel: Relation) -> Self {
        Self { expr, rel }
    }

    /// Check if the constraint holds for the given values. Strict inequalities must hold with a
    /// margin of [`STRICT_EPSILON`], all comparisons are relaxed by [`TOLERANCE`].
    pub fn holds(&self, values: &[f64]) -> bool {
        let v = self.expr.eval(values);
        match self.rel {
            Relation::Le => v <= TOLERANCE,
            Relation::Lt => v <= -STRICT_EPSILON + TOLERANCE,
            Relation::Eq => v.abs() <= TOLERANCE,
            Relation::Ge => v >= -TOLERANCE,
            Relation::Gt => v >= STRICT_EPSILON - TOLERANCE,
        }
    }

    /// Negation of the constraint. The negation of an equality is a disjunction.
    fn negate(self) -> Formula {
        let Constraint { expr, rel } = self;
        let rel = match rel {
            Relation::Le => Relation::Gt,
            Relation::Lt => Relation::Ge,
            Relation::Ge => Relation::Lt,
            Relation::Gt => Relation::Le,
            Relation::Eq => {
                return Formula::Or(vec![
                    Formula::Atom(Constraint::new(expr.clone(), Relation::Lt)),
                    Formula::Atom(Constraint::new(expr, Relation::Gt)),
                ])
            }
        };
        Formula::Atom(Constraint::new(expr, rel))
    }

    /// Evaluate the constraint if it contains no variables.
    fn const_value(&self) -> Option<bool> {
        if self.expr.is_constant() {
            Some(self.holds(&[]))
        } else {
            None
        }
    }
}

/// Boolean combination of linear constraints
#[derive(Debug, Clone, PartialEq)]
pub enum Formula {
    /// Always true
    True,
    /// Always false
    False,
    /// Linear constraint
    Atom(Constraint),
    /// Negation
    Not(Box<Formula>),
    /// Conjunction. The empty conjunction is true.
    And(Vec<Formula>),
    /// Disjunction. The empty disjunction is false.
    Or(Vec<Formula>),
    /// Implication
    Implies(Box<Formula>, Box<Formula>),
}

impl Formula {
    /// Conjunction of all formulas
    pub fn and(children: Vec<Formula>) -> Self {
        Self::And(children)
    }

    /// Disjunction of all formulas
    pub fn or(children: Vec<Formula>) -> Self {
        Self::Or(children)
    }

    /// Negation of the formula
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// `self => other`
    pub fn implies(self, other: Formula) -> Self {
        Self::Implies(Box::new(self), Box::new(other))
    }

    /// Evaluate the formula on the given values.
    pub fn eval(&self, values: &[f64]) -> bool {
        match self {
            Self::True => true,
            Self::False => false,
            Self::Atom(c) => c.holds(values),
            Self::Not(f) => !f.eval(values),
            Self::And(fs) => fs.iter().all(|f| f.eval(values)),
            Self::Or(fs) => fs.iter().any(|f| f.eval(values)),
            Self::Implies(a, b) => !a.eval(values) || b.eval(values),
        }
    }

    /// Check that all variables are declared and that all numbers are finite.
    pub(crate) fn validate(&self, num_vars: usize) -> Result<(), SolverError> {
        match self {
            Self::True | Self::False => Ok(()),
            Self::Atom(c) => c.expr.validate(num_vars),
            Self::Not(f) => f.validate(num_vars),
            Self::And(fs) | Self::Or(fs) => fs.iter().try_for_each(|f| f.validate(num_vars)),
            Self::Implies(a, b) => {
                a.validate(num_vars)?;
                b.validate(num_vars)
            }
        }
    }

    /// Transform the formula into negation normal form. The result only contains `True`, `False`,
    /// `Atom`, `And` and `Or`. Constant atoms are folded, and nested conjunctions (disjunctions)
    /// are flattened.
    pub(crate) fn nnf(self) -> Formula {
        self.nnf_signed(true)
    }

    fn nnf_signed(self, positive: bool) -> Formula {
        match (self, positive) {
            (Self::True, true) | (Self::False, false) => Self::True,
            (Self::True, false) | (Self::False, true) => Self::False,
            (Self::Atom(c), positive) => {
                let f = if positive { Self::Atom(c) } else { c.negate() };
                f.fold_constants()
            }
            (Self::Not(f), positive) => f.nnf_signed(!positive),
            (Self::And(fs), true) | (Self::Or(fs), false) => {
                Self::flatten_and(fs.into_iter().map(|f| f.nnf_signed(positive)))
            }
            (Self::Or(fs), true) | (Self::And(fs), false) => {
                Self::flatten_or(fs.into_iter().map(|f| f.nnf_signed(positive)))
            }
            (Self::Implies(a, b), true) => {
                Self::flatten_or(vec![a.nnf_signed(false), b.nnf_signed(true)])
            }
            (Self::Implies(a, b), false) => {
                Self::flatten_and(vec![a.nnf_signed(true), b.nnf_signed(false)])
            }
        }
    }

    fn fold_constants(self) -> Formula {
        match self {
            Self::Atom(c) => match c.const_value() {
                Some(true) => Self::True,
                Some(false) => Self::False,
                None => Self::Atom(c),
            },
            Self::Or(fs) => Self::flatten_or(fs.into_iter().map(|f| f.fold_constants())),
            f => f,
        }
    }

    fn flatten_and(children: impl IntoIterator<Item = Formula>) -> Formula {
        let mut result = Vec::new();
        for f in children {
            match f {
                Self::True => {}
                Self::False => return Self::False,
                Self::And(fs) => result.extend(fs),
                f => result.push(f),
            }
        }
        match result.len() {
            0 => Self::True,
            1 => result.pop().unwrap_or(Self::True),
            _ => Self::And(result),
        }
    }

    fn flatten_or(children: impl IntoIterator<Item = Formula>) -> Formula {
        let mut result = Vec::new();
        for f in children {
            match f {
                Self::False => {}
                Self::True => return Self::True,
                Self::Or(fs) => result.extend(fs),
                f => result.push(f),
            }
        }
        match result.len() {
            0 => Self::False,
            1 => result.pop().unwrap_or(Self::False),
            _ => Self::Or(result),
        }
    }
}

impl From<Constraint> for Formula {
    fn from(c: Constraint) -> Self {
        Self::Atom(c)
    }
}

impl fmt::Display for LinExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (v, c) in self.terms.iter() {
            if !first {
                write!(f, " + ")?;
            }
            first = false;
            write!(f, "{}*x{}", c, v.0)?;
        }
        if first || self.constant != 0.0 {
            if !first {
                write!(f, " + ")?;
            }
            write!(f, "{}", self.constant)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn expression_arithmetic() {
        let x = Var(0);
        let y = Var(1);
        let e = (x * 2.0 + y - 3.0) - (y + x);
        assert_eq!(e.terms().collect::<Vec<_>>(), vec![(x, 1.0)]);
        assert_eq!(e.constant_part(), -3.0);
        assert_eq!(e.eval(&[5.0, 7.0]), 2.0);
    }

    #[test]
    fn strict_inequalities_need_margin() {
        let x = Var(0);
        let f = LinExpr::from(x).lt(1.0);
        assert!(f.eval(&[0.5]));
        assert!(!f.eval(&[1.0]));
        assert!(!f.eval(&[1.0 - STRICT_EPSILON / 2.0]));
    }

    #[test]
    fn negation_normal_form() {
        let x = Var(0);
        let f = LinExpr::from(x).eq(1.0).not();
        match f.nnf() {
            Formula::Or(fs) => assert_eq!(fs.len(), 2),
            f => panic!("unexpected formula: {:?}", f),
        }

        let g = Formula::and(vec![LinExpr::from(x).le(1.0), Formula::True]).not().nnf();
        assert_eq!(g, Formula::Atom(Constraint::new(LinExpr::from(x) - 1.0, Relation::Gt)));
    }

    #[test]
    fn constant_folding() {
        let f = Formula::or(vec![LinExpr::constant(1.0).le(0.0), LinExpr::constant(0.0).le(1.0)]);
        assert_eq!(f.nnf(), Formula::True);
        let g = Formula::and(vec![LinExpr::constant(1.0).le(0.0), LinExpr::from(Var(0)).le(1.0)]);
        assert_eq!(g.nnf(), Formula::False);
    }
}
