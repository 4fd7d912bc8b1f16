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

//! # Name Patterns
//!
//! Nodes, links and destinations are selected by name patterns. A pattern is a list of terms
//! separated by whitespace (the keyword `or` may be used between terms for readability). Each term
//! is a glob, where `*` matches any sequence of characters and `?` matches a single character. A
//! term prefixed by `not` excludes everything it matches. A name matches the pattern if it matches
//! at least one positive term (or there is no positive term), and no negated term.
//!
//! ```
//! use tsnconf::topology::NamePattern;
//!
//! let pattern: NamePattern = "switch* or bridge not switch3".parse().unwrap();
//! assert!(pattern.matches("switch1"));
//! assert!(pattern.matches("bridge"));
//! assert!(!pattern.matches("switch3"));
//! assert!(!pattern.matches("device"));
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error while parsing a pattern
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PatternError {
    /// The pattern contains no term
    #[error("The pattern is empty")]
    Empty,
    /// The keyword `not` is not followed by a term
    #[error("Dangling `not` in pattern {0:?}")]
    DanglingNot(String),
    /// The glob cannot be compiled
    #[error("Invalid glob {0:?}: {1}")]
    InvalidGlob(String, String),
}

/// Compiled name pattern
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NamePattern {
    source: String,
    positive: Vec<Regex>,
    negative: Vec<Regex>,
}

impl NamePattern {
    /// Pattern matching every name
    pub fn any() -> Self {
        Self { source: "*".to_string(), positive: Vec::new(), negative: Vec::new() }
    }

    /// Returns true if the name matches the pattern.
    pub fn matches(&self, name: &str) -> bool {
        (self.positive.is_empty() || self.positive.iter().any(|r| r.is_match(name)))
            && !self.negative.iter().any(|r| r.is_match(name))
    }

    /// Returns the pattern as written in the configuration.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

fn compile_glob(glob: &str) -> Result<Regex, PatternError> {
    let mut re = String::with_capacity(glob.len() + 8);
    re.push('^');
    for c in glob.chars() {
        match c {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            c => re.push_str(&regex::escape(&c.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re).map_err(|e| PatternError::InvalidGlob(glob.to_string(), e.to_string()))
}

impl FromStr for NamePattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut positive = Vec::new();
        let mut negative = Vec::new();
        let mut negate = false;
        let mut terms = 0;
        for word in s.split_whitespace() {
            match word {
                "or" => {}
                "not" => negate = true,
                glob => {
                    terms += 1;
                    if negate {
                        negative.push(compile_glob(glob)?);
                    } else {
                        positive.push(compile_glob(glob)?);
                    }
                    negate = false;
                }
            }
        }
        if negate {
            return Err(PatternError::DanglingNot(s.to_string()));
        }
        if terms == 0 {
            return Err(PatternError::Empty);
        }
        Ok(Self { source: s.to_string(), positive, negative })
    }
}

impl TryFrom<String> for NamePattern {
    type Error = PatternError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<NamePattern> for String {
    fn from(p: NamePattern) -> String {
        p.source
    }
}

impl Default for NamePattern {
    fn default() -> Self {
        Self::any()
    }
}

impl PartialEq for NamePattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}
