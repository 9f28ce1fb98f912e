// src/validate/mod.rs

//! Rule tables and the engine that evaluates them.
//!
//! A rule is a name, a kind and a plain function. Input checks run with
//! [`Mode::FailFast`] and stop at the first violation; output checks run with
//! [`Mode::CollectAll`] so every failing column is reported in one error.

pub mod input;
pub mod output;

use std::{collections::HashSet, fmt};

use arrow::{
    array::ArrayRef,
    error::ArrowError,
    row::{RowConverter, SortField},
};
use thiserror::Error;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    FailFast,
    CollectAll,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViolationKind {
    Schema,
    Integrity,
    Duplicate,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Violation {
    pub rule: &'static str,
    pub kind: ViolationKind,
    pub column: Option<String>,
    pub message: String,
}

impl Violation {
    pub fn new(rule: &'static str, kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            rule,
            kind,
            column: None,
            message: message.into(),
        }
    }

    pub fn in_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.column {
            Some(col) => write!(f, "[{}] {}: {}", self.rule, col, self.message),
            None => write!(f, "[{}] {}", self.rule, self.message),
        }
    }
}

/// One or more violations from a single evaluation.
#[derive(Debug, Error, PartialEq)]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl ValidationError {
    pub fn single(violation: Violation) -> Self {
        Self {
            violations: vec![violation],
        }
    }

    /// Distinct columns named by the violations, in first-seen order.
    pub fn columns(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for col in self.violations.iter().filter_map(|v| v.column.as_deref()) {
            if !out.contains(&col) {
                out.push(col);
            }
        }
        out
    }

    pub fn has_rule(&self, rule: &str) -> bool {
        self.violations.iter().any(|v| v.rule == rule)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cols = self.columns();
        if !cols.is_empty() {
            write!(f, "errors seen in {:?}: ", cols)?;
        }
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", v)?;
        }
        Ok(())
    }
}

pub type RuleResult = Result<(), Violation>;

/// A named check over `T`.
pub struct Rule<T: ?Sized> {
    pub name: &'static str,
    pub kind: ViolationKind,
    pub check: fn(&T) -> Result<(), String>,
}

impl<T: ?Sized> Rule<T> {
    fn apply(&self, target: &T) -> RuleResult {
        (self.check)(target).map_err(|msg| Violation::new(self.name, self.kind, msg))
    }
}

/// Run `rules` over `target` in order.
pub fn evaluate<T: ?Sized>(rules: &[Rule<T>], target: &T, mode: Mode) -> Result<(), ValidationError> {
    let mut violations = Vec::new();
    for rule in rules {
        match rule.apply(target) {
            Ok(()) => debug!(rule = rule.name, "passed"),
            Err(v) if mode == Mode::FailFast => return Err(ValidationError::single(v)),
            Err(v) => violations.push(v),
        }
    }
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { violations })
    }
}

/// Indices of rows that repeat an earlier row across `columns`.
pub fn duplicate_rows(columns: &[ArrayRef]) -> Result<Vec<usize>, ArrowError> {
    if columns.is_empty() {
        return Ok(Vec::new());
    }
    let fields = columns
        .iter()
        .map(|c| SortField::new(c.data_type().clone()))
        .collect();
    let converter = RowConverter::new(fields)?;
    let rows = converter.convert_columns(columns)?;

    let mut seen = HashSet::with_capacity(rows.num_rows());
    Ok(rows
        .iter()
        .enumerate()
        .filter_map(|(idx, row)| (!seen.insert(row)).then_some(idx))
        .collect())
}
