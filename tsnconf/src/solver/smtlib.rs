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

//! Backend writing an SMT-LIB 2 script instead of solving the problem.

use super::{Formula, LinExpr, SatResult, Solver, SolverError, Var, VarKind};

use std::fmt::{self, Write};

/// # SMT-LIB 2 Script
///
/// Records all declarations, assertions and the objective, and renders them as an SMT-LIB 2
/// script (logic `QF_LRA`, or `QF_LIRA` if integer variables are used). The objective is written
/// with the `minimize` command, which is understood by optimizing SMT solvers. Checking the script
/// always returns [`SatResult::Unknown`].
#[derive(Debug, Clone, Default)]
pub struct SmtLibScript {
    names: Vec<String>,
    kinds: Vec<VarKind>,
    assertions: Vec<Formula>,
    objective: Option<LinExpr>,
}

impl SmtLibScript {
    /// Create an empty script
    pub fn new() -> Self {
        Self::default()
    }

    /// Render the script
    pub fn to_script(&self) -> String {
        let mut s = String::new();
        // writing into a string cannot fail
        let _ = self.write_script(&mut s);
        s
    }

    fn write_script(&self, s: &mut String) -> fmt::Result {
        let logic = if self.kinds.contains(&VarKind::Int) { "QF_LIRA" } else { "QF_LRA" };
        writeln!(s, "(set-logic {})", logic)?;
        for (name, kind) in self.names.iter().zip(self.kinds.iter()) {
            let sort = match kind {
                VarKind::Real => "Real",
                VarKind::Int => "Int",
            };
            writeln!(s, "(declare-const {} {})", symbol(name), sort)?;
        }
        for f in self.assertions.iter() {
            writeln!(s, "(assert {})", self.formula(f))?;
        }
        if let Some(objective) = self.objective.as_ref() {
            writeln!(s, "(minimize {})", self.expr(objective))?;
        }
        writeln!(s, "(check-sat)")?;
        writeln!(s, "(get-model)")
    }

    fn formula(&self, f: &Formula) -> String {
        match f {
            Formula::True => "true".to_string(),
            Formula::False => "false".to_string(),
            Formula::Atom(c) => format!("({} {} 0.0)", c.rel.symbol(), self.expr(&c.expr)),
            Formula::Not(f) => format!("(not {})", self.formula(f)),
            Formula::And(fs) if fs.is_empty() => "true".to_string(),
            Formula::Or(fs) if fs.is_empty() => "false".to_string(),
            Formula::And(fs) => self.nary("and", fs),
            Formula::Or(fs) => self.nary("or", fs),
            Formula::Implies(a, b) => format!("(=> {} {})", self.formula(a), self.formula(b)),
        }
    }

    fn nary(&self, op: &str, fs: &[Formula]) -> String {
        let mut s = format!("({}", op);
        for f in fs {
            s.push(' ');
            s.push_str(&self.formula(f));
        }
        s.push(')');
        s
    }

    fn expr(&self, e: &LinExpr) -> String {
        let mut parts: Vec<String> = e
            .terms()
            .map(|(v, c)| {
                let name = symbol(&self.names[v.index()]);
                if c == 1.0 {
                    name
                } else {
                    format!("(* {} {})", number(c), name)
                }
            })
            .collect();
        if e.constant_part() != 0.0 || parts.is_empty() {
            parts.push(number(e.constant_part()));
        }
        if parts.len() == 1 {
            parts.remove(0)
        } else {
            format!("(+ {})", parts.join(" "))
        }
    }
}

/// Quote the symbol if it contains characters not allowed in simple symbols.
fn symbol(name: &str) -> String {
    let simple = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || "~!@$%^&*_-+=<>.?/".contains(c));
    if simple {
        name.to_string()
    } else {
        format!("|{}|", name.replace('|', "_").replace('\\', "_"))
    }
}

fn number(x: f64) -> String {
    let s = format!("{}", x.abs());
    let s = if s.contains('.') { s } else { format!("{}.0", s) };
    if x < 0.0 {
        format!("(- {})", s)
    } else {
        s
    }
}

impl fmt::Display for SmtLibScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_script())
    }
}

impl Solver for SmtLibScript {
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
        Ok(SatResult::Unknown)
    }

    fn value(&self, _var: Var) -> Option<f64> {
        None
    }
}
