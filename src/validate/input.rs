// src/validate/input.rs

//! Checks on the raw sheet before it is reshaped. All fail fast.

use std::collections::BTreeMap;

use arrow::{
    array::{Array, Float64Array, StringArray},
    datatypes::DataType,
    record_batch::RecordBatch,
};

use super::{duplicate_rows, evaluate, Mode, Rule, ValidationError, ViolationKind};
use crate::transform::parse_period;
use crate::transform::utils::{as_f64, is_numeric};

/// Minimum number of data rows.
pub const MIN_ROWS: usize = 10;

/// Minimum label occurrences (substring, case-insensitive).
pub const MIN_LABEL_COUNTS: [(&str, usize); 6] = [
    ("production", 1),
    ("import", 1),
    ("export", 1),
    ("crude oil", 3),
    ("ngls", 3),
    ("feedstock", 3),
];

/// Highest tolerated mean null fraction across period columns.
pub const MAX_NULL_FRACTION: f64 = 0.1;

/// Rows whose label starts with one of these may carry negative figures.
pub const NEGATIVE_ALLOWED_PREFIXES: [&str; 3] =
    ["stock change", "transfers", "statistical difference"];

const LABEL_IS_STRING: Rule<RecordBatch> = Rule {
    name: "label_is_string",
    kind: ViolationKind::Schema,
    check: label_is_string,
};

const PERIODS_ARE_NUMERIC: Rule<RecordBatch> = Rule {
    name: "periods_are_numeric",
    kind: ViolationKind::Schema,
    check: periods_are_numeric,
};

const ROWS: Rule<RecordBatch> = Rule {
    name: "rows",
    kind: ViolationKind::Integrity,
    check: rows_check,
};

const NULLS: Rule<RecordBatch> = Rule {
    name: "nulls",
    kind: ViolationKind::Integrity,
    check: nulls_check,
};

const DUPLICATES: Rule<RecordBatch> = Rule {
    name: "duplicate_rows",
    kind: ViolationKind::Duplicate,
    check: duplicates_check,
};

const TEMPORAL: Rule<RecordBatch> = Rule {
    name: "temporal_integrity",
    kind: ViolationKind::Integrity,
    check: temporal_check,
};

const NEGATIVES: Rule<RecordBatch> = Rule {
    name: "allowable_negative_quantities",
    kind: ViolationKind::Integrity,
    check: negatives_check,
};

pub static INPUT_SCHEMA_RULES: &[Rule<RecordBatch>] = &[LABEL_IS_STRING, PERIODS_ARE_NUMERIC];

pub static INPUT_INTEGRITY_RULES: &[Rule<RecordBatch>] =
    &[ROWS, NULLS, DUPLICATES, TEMPORAL, NEGATIVES];

/// Label column is a string column; every other column is numeric.
pub fn input_schema_validation(batch: &RecordBatch) -> Result<(), ValidationError> {
    evaluate(INPUT_SCHEMA_RULES, batch, Mode::FailFast)
}

/// Every integrity rule, in order, stopping at the first violation.
pub fn input_checks(batch: &RecordBatch) -> Result<(), ValidationError> {
    evaluate(INPUT_INTEGRITY_RULES, batch, Mode::FailFast)
}

pub fn input_rows_check(batch: &RecordBatch) -> Result<(), ValidationError> {
    evaluate(&[ROWS], batch, Mode::FailFast)
}

pub fn input_nulls_check(batch: &RecordBatch) -> Result<(), ValidationError> {
    evaluate(&[NULLS], batch, Mode::FailFast)
}

pub fn input_duplicate_rows(batch: &RecordBatch) -> Result<(), ValidationError> {
    evaluate(&[DUPLICATES], batch, Mode::FailFast)
}

pub fn input_temporal_integrity(batch: &RecordBatch) -> Result<(), ValidationError> {
    evaluate(&[TEMPORAL], batch, Mode::FailFast)
}

pub fn input_allowable_negative_quantities(batch: &RecordBatch) -> Result<(), ValidationError> {
    evaluate(&[NEGATIVES], batch, Mode::FailFast)
}

fn labels(batch: &RecordBatch) -> Result<&StringArray, String> {
    if batch.num_columns() == 0 {
        return Err("input excel has no columns".into());
    }
    batch
        .column(0)
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| "input excel type incorrect - first column should be string".into())
}

fn period_values(batch: &RecordBatch) -> Result<Vec<(String, Float64Array)>, String> {
    let schema = batch.schema();
    schema
        .fields()
        .iter()
        .zip(batch.columns())
        .skip(1)
        .map(|(field, col)| {
            as_f64(col)
                .map(|values| (field.name().clone(), values))
                .map_err(|e| format!("column `{}`: {}", field.name(), e))
        })
        .collect()
}

fn label_is_string(batch: &RecordBatch) -> Result<(), String> {
    labels(batch).map(|_| ())
}

fn periods_are_numeric(batch: &RecordBatch) -> Result<(), String> {
    let bad: Vec<String> = non_numeric_columns(batch)
        .into_iter()
        .map(|(name, dt)| format!("{} ({})", name, dt))
        .collect();
    if bad.is_empty() {
        Ok(())
    } else {
        Err(format!(
            "input excel type incorrect - should be numeric: {}",
            bad.join(", ")
        ))
    }
}

fn rows_check(batch: &RecordBatch) -> Result<(), String> {
    if batch.num_rows() < MIN_ROWS {
        return Err(format!(
            "input excel - too little rows ({} < {}), please investigate",
            batch.num_rows(),
            MIN_ROWS
        ));
    }

    let lowered: Vec<String> = labels(batch)?
        .iter()
        .flatten()
        .map(|l| l.to_lowercase())
        .collect();

    let short: Vec<String> = MIN_LABEL_COUNTS
        .iter()
        .filter_map(|(kw, min)| {
            let found = lowered.iter().filter(|l| l.contains(kw)).count();
            (found < *min).then(|| format!("{} {}/{}", kw, found, min))
        })
        .collect();

    if short.is_empty() {
        Ok(())
    } else {
        Err(format!(
            "input excel - not enough repetitions of materials: {}",
            short.join(", ")
        ))
    }
}

fn nulls_check(batch: &RecordBatch) -> Result<(), String> {
    let nulls = labels(batch)?.null_count();
    if nulls > 0 {
        return Err(format!(
            "input excel - unexpected nulls in first column, resources ({})",
            nulls
        ));
    }

    let rows = batch.num_rows();
    let columns = &batch.columns()[1..];
    if columns.is_empty() {
        return Err("input excel - no period columns".into());
    }
    if rows == 0 {
        return Ok(());
    }

    let mean = columns
        .iter()
        .map(|c| c.null_count() as f64 / rows as f64)
        .sum::<f64>()
        / columns.len() as f64;
    if mean > MAX_NULL_FRACTION {
        return Err(format!(
            "input excel - nulls make up {:.1}% of dataset, please investigate",
            mean * 100.0
        ));
    }
    Ok(())
}

fn duplicates_check(batch: &RecordBatch) -> Result<(), String> {
    let dups = duplicate_rows(batch.columns()).map_err(|e| e.to_string())?;
    if dups.is_empty() {
        Ok(())
    } else {
        Err(format!("input excel - resources repeated at rows {:?}", dups))
    }
}

fn temporal_check(batch: &RecordBatch) -> Result<(), String> {
    let schema = batch.schema();
    let mut periods = Vec::with_capacity(schema.fields().len().saturating_sub(1));
    for field in schema.fields().iter().skip(1) {
        let (year, quarter) = parse_period(field.name()).ok_or_else(|| {
            format!("input excel - unrecognised period column `{}`", field.name())
        })?;
        if !(1..=4).contains(&quarter) {
            return Err(format!(
                "input excel - quarter {} out of range in `{}`",
                quarter,
                field.name()
            ));
        }
        periods.push((year, quarter));
    }

    if periods.windows(2).any(|w| w[0] > w[1]) {
        return Err("input excel - unexpected ordering of columns".into());
    }

    let mut per_year: BTreeMap<i32, usize> = BTreeMap::new();
    for (year, _) in &periods {
        *per_year.entry(*year).or_default() += 1;
    }
    if let Some((year, n)) = per_year.iter().find(|(_, n)| **n > 4) {
        return Err(format!(
            "input excel - too many quarters for a year ({} has {})",
            year, n
        ));
    }

    if let Some(w) = periods.windows(2).find(|w| w[0] == w[1]) {
        return Err(format!(
            "input excel - repeated year and quarter ({} Q{})",
            w[0].0, w[0].1
        ));
    }
    Ok(())
}

fn negatives_check(batch: &RecordBatch) -> Result<(), String> {
    let labels = labels(batch)?;
    let values = period_values(batch)?;

    for row in 0..batch.num_rows() {
        let label = labels.is_valid(row).then(|| labels.value(row)).unwrap_or_default();
        let lowered = label.to_lowercase();
        if NEGATIVE_ALLOWED_PREFIXES
            .iter()
            .any(|p| lowered.starts_with(p))
        {
            continue;
        }
        for (name, col) in &values {
            if col.is_valid(row) && col.value(row) < 0.0 {
                return Err(format!(
                    "input excel - negative value {} for `{}` in `{}`",
                    col.value(row),
                    label,
                    name
                ));
            }
        }
    }
    Ok(())
}

/// Columns after the label whose type is not numeric.
pub fn non_numeric_columns(batch: &RecordBatch) -> Vec<(String, DataType)> {
    batch
        .schema()
        .fields()
        .iter()
        .skip(1)
        .filter(|f| !is_numeric(f.data_type()))
        .map(|f| (f.name().clone(), f.data_type().clone()))
        .collect()
}
