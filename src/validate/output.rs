// src/validate/output.rs

//! Checks on the normalized table before it reaches the ledger.
//!
//! Column order is checked first and stops everything else. The per-column
//! table below is then evaluated in full so the error names every failing
//! column at once.

use arrow::{
    array::{Array, ArrayRef, Int64Array, StringArray, TimestampMicrosecondArray},
    datatypes::{DataType, TimeUnit},
    record_batch::RecordBatch,
};
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;

use super::{duplicate_rows, evaluate, Mode, Rule, ValidationError, Violation, ViolationKind};
use crate::transform::utils::column;
use crate::transform::Category;

/// Exact `date_processed` text form; no sub-second part.
pub const PROCESSED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static ISO_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date regex should compile"));

type FormatCheck = fn(&ArrayRef) -> Result<(), String>;

/// One output column: name, Arrow type, nullability and optional value check.
pub struct ColumnSpec {
    pub name: &'static str,
    pub data_type: DataType,
    pub nullable: bool,
    pub format: Option<FormatCheck>,
}

pub static OUTPUT_SCHEMA: [ColumnSpec; 8] = [
    ColumnSpec {
        name: "resource",
        data_type: DataType::Utf8,
        nullable: false,
        format: None,
    },
    ColumnSpec {
        name: "category",
        data_type: DataType::Utf8,
        nullable: false,
        format: Some(known_category),
    },
    ColumnSpec {
        name: "figures",
        data_type: DataType::Float64,
        nullable: true,
        format: None,
    },
    ColumnSpec {
        name: "year",
        data_type: DataType::Int64,
        nullable: false,
        format: None,
    },
    ColumnSpec {
        name: "quarter",
        data_type: DataType::Int64,
        nullable: false,
        format: Some(quarter_in_range),
    },
    ColumnSpec {
        name: "date_published",
        data_type: DataType::Utf8,
        nullable: false,
        format: Some(iso_date),
    },
    ColumnSpec {
        name: "date_processed",
        data_type: DataType::Timestamp(TimeUnit::Microsecond, None),
        nullable: false,
        format: Some(whole_seconds),
    },
    ColumnSpec {
        name: "filename",
        data_type: DataType::Utf8,
        nullable: false,
        format: None,
    },
];

/// Key columns for the duplicate check.
pub const KEY_COLUMNS: [&str; 4] = ["category", "year", "quarter", "resource"];

pub fn output_column_names() -> Vec<&'static str> {
    OUTPUT_SCHEMA.iter().map(|c| c.name).collect()
}

/// A column paired with the spec it must satisfy.
pub struct ColumnCheck {
    pub spec: &'static ColumnSpec,
    pub array: ArrayRef,
}

static COLUMN_RULES: &[Rule<ColumnCheck>] = &[
    Rule {
        name: "type",
        kind: ViolationKind::Schema,
        check: type_matches,
    },
    Rule {
        name: "nullability",
        kind: ViolationKind::Schema,
        check: nulls_allowed,
    },
    Rule {
        name: "format",
        kind: ViolationKind::Schema,
        check: format_matches,
    },
];

const COLUMN_ORDER: Rule<RecordBatch> = Rule {
    name: "column_order",
    kind: ViolationKind::Schema,
    check: column_order,
};

/// Column order first (fail fast), then every column rule (collect all).
pub fn output_schema_validation(batch: &RecordBatch) -> Result<(), ValidationError> {
    evaluate(&[COLUMN_ORDER], batch, Mode::FailFast)?;

    let mut violations: Vec<Violation> = Vec::new();
    for (spec, array) in OUTPUT_SCHEMA.iter().zip(batch.columns()) {
        let target = ColumnCheck {
            spec,
            array: array.clone(),
        };
        if let Err(err) = evaluate(COLUMN_RULES, &target, Mode::CollectAll) {
            violations.extend(err.violations.into_iter().map(|v| v.in_column(spec.name)));
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { violations })
    }
}

/// No repeated (category, year, quarter, resource).
pub fn output_check_duplicates(batch: &RecordBatch) -> Result<(), ValidationError> {
    let keys = KEY_COLUMNS
        .iter()
        .map(|name| column(batch, name).cloned())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| {
            ValidationError::single(Violation::new(
                "duplicate_keys",
                ViolationKind::Schema,
                e.to_string(),
            ))
        })?;
    let dups = duplicate_rows(&keys).map_err(|e| {
        ValidationError::single(Violation::new(
            "duplicate_keys",
            ViolationKind::Duplicate,
            e.to_string(),
        ))
    })?;
    if dups.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::single(Violation::new(
            "duplicate_keys",
            ViolationKind::Duplicate,
            format!("output dataframe - repeated values at rows {:?}", dups),
        )))
    }
}

fn column_order(batch: &RecordBatch) -> Result<(), String> {
    let expected = output_column_names();
    let schema = batch.schema();
    let found: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    if found == expected {
        Ok(())
    } else {
        Err(format!(
            "not in correct order or unexpected columns: expected {:?}, found {:?}",
            expected, found
        ))
    }
}

fn type_matches(c: &ColumnCheck) -> Result<(), String> {
    if c.array.data_type() == &c.spec.data_type {
        Ok(())
    } else {
        Err(format!(
            "expected {}, found {}",
            c.spec.data_type,
            c.array.data_type()
        ))
    }
}

fn nulls_allowed(c: &ColumnCheck) -> Result<(), String> {
    let nulls = c.array.null_count();
    if c.spec.nullable || nulls == 0 {
        Ok(())
    } else {
        Err(format!("{} null values in non-nullable column", nulls))
    }
}

fn format_matches(c: &ColumnCheck) -> Result<(), String> {
    match c.spec.format {
        // a wrong type is already reported by `type`
        Some(check) if c.array.data_type() == &c.spec.data_type => check(&c.array),
        _ => Ok(()),
    }
}

fn known_category(arr: &ArrayRef) -> Result<(), String> {
    let Some(values) = arr.as_any().downcast_ref::<StringArray>() else {
        return Ok(());
    };
    values
        .iter()
        .flatten()
        .try_for_each(|v| v.parse::<Category>().map(drop))
        .map_err(|e| e.to_string())
}

fn quarter_in_range(arr: &ArrayRef) -> Result<(), String> {
    let Some(values) = arr.as_any().downcast_ref::<Int64Array>() else {
        return Ok(());
    };
    match values.iter().flatten().find(|q| !(1..=4).contains(q)) {
        Some(bad) => Err(format!("quarter {} outside 1..4", bad)),
        None => Ok(()),
    }
}

fn iso_date(arr: &ArrayRef) -> Result<(), String> {
    let Some(values) = arr.as_any().downcast_ref::<StringArray>() else {
        return Ok(());
    };
    match values.iter().flatten().find(|v| !ISO_DATE_RE.is_match(v)) {
        Some(bad) => Err(format!("`{}` does not match YYYY-MM-DD", bad)),
        None => Ok(()),
    }
}

/// Every timestamp must survive a trip through [`PROCESSED_FORMAT`].
fn whole_seconds(arr: &ArrayRef) -> Result<(), String> {
    let Some(values) = arr.as_any().downcast_ref::<TimestampMicrosecondArray>() else {
        return Ok(());
    };
    for row in 0..values.len() {
        if values.is_null(row) {
            continue;
        }
        let ts = values
            .value_as_datetime(row)
            .ok_or_else(|| format!("timestamp at row {} out of range", row))?;
        let text = ts.format(PROCESSED_FORMAT).to_string();
        let back = NaiveDateTime::parse_from_str(&text, PROCESSED_FORMAT)
            .map_err(|e| format!("`{}` does not parse back: {}", text, e))?;
        if back != ts {
            return Err(format!(
                "date_processed incorrect time representation: {} has sub-second precision",
                ts
            ));
        }
    }
    Ok(())
}
