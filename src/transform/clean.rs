// src/transform/clean.rs

use std::sync::Arc;

use arrow::{
    array::{Array, ArrayRef, Int64Builder, StringArray},
    datatypes::{DataType, Field, FieldRef, Schema},
    record_batch::RecordBatch,
};

use crate::error::EtlError;
use crate::transform::utils::{as_strings, column};

/// Drop a bracketed note and everything after it.
///
/// Only the bracket onwards goes; `"crude oil [note 2]"` keeps its trailing
/// space.
pub fn remove_note_data(label: &str) -> &str {
    label.split('[').next().unwrap_or(label)
}

/// Split `"YYYY Q"` into integers.
fn split_year_quarter(value: &str) -> Option<(i64, i64)> {
    let mut parts = value.split(' ');
    let year = parts.next()?.parse().ok()?;
    let quarter = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((year, quarter))
}

/// Replace `year_quarter` by integer `year` and `quarter` columns (appended at
/// the end) and strip notes and surrounding whitespace from `resource`.
pub fn clean_df(batch: &RecordBatch) -> Result<RecordBatch, EtlError> {
    let yq = as_strings(column(batch, "year_quarter")?, "year_quarter")?;
    let resources = as_strings(column(batch, "resource")?, "resource")?;

    let mut years = Int64Builder::with_capacity(yq.len());
    let mut quarters = Int64Builder::with_capacity(yq.len());
    for (row, value) in yq.iter().enumerate() {
        let value = value.ok_or_else(|| {
            EtlError::Transform(format!("null year_quarter at row {}", row))
        })?;
        let (year, quarter) = split_year_quarter(value).ok_or_else(|| {
            EtlError::Transform(format!(
                "year_quarter `{}` at row {} is not `<year> <quarter>`",
                value, row
            ))
        })?;
        years.append_value(year);
        quarters.append_value(quarter);
    }

    let cleaned: StringArray = resources
        .iter()
        .map(|r| r.map(|s| remove_note_data(s).trim()))
        .collect();

    let schema = batch.schema();
    let mut fields: Vec<FieldRef> = Vec::with_capacity(schema.fields().len() + 1);
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len() + 1);
    for (field, array) in schema.fields().iter().zip(batch.columns()) {
        match field.name().as_str() {
            "year_quarter" => continue,
            "resource" => columns.push(Arc::new(cleaned.clone())),
            _ => columns.push(array.clone()),
        }
        fields.push(field.clone());
    }
    fields.push(Arc::new(Field::new("year", DataType::Int64, false)));
    fields.push(Arc::new(Field::new("quarter", DataType::Int64, false)));
    columns.push(Arc::new(years.finish()));
    columns.push(Arc::new(quarters.finish()));

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::utils::{batch_from, column_names};
    use arrow::array::{Float64Array, Int64Array};

    fn long_batch(year_quarter: Vec<&str>, resource: Vec<&str>) -> RecordBatch {
        let n = resource.len();
        batch_from(vec![
            ("resource", Arc::new(StringArray::from(resource)) as ArrayRef, true),
            (
                "category",
                Arc::new(StringArray::from(vec!["other"; n])) as ArrayRef,
                true,
            ),
            (
                "year_quarter",
                Arc::new(StringArray::from(year_quarter)) as ArrayRef,
                false,
            ),
            ("figures", Arc::new(Float64Array::from(vec![1.0; n])) as ArrayRef, true),
        ])
        .unwrap()
    }

    fn resources(batch: &RecordBatch) -> Vec<String> {
        as_strings(column(batch, "resource").unwrap(), "resource")
            .unwrap()
            .iter()
            .map(|s| s.unwrap().to_string())
            .collect()
    }

    fn ints(batch: &RecordBatch, name: &str) -> Vec<i64> {
        column(batch, name)
            .unwrap()
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap()
            .values()
            .to_vec()
    }

    #[test]
    fn note_removal_keeps_text_before_bracket() {
        assert_eq!(remove_note_data("crude oil [note 2]"), "crude oil ");
        assert_eq!(remove_note_data("feedstocks [note 3]"), "feedstocks ");
        assert_eq!(remove_note_data("crude oil[note 2]"), "crude oil");
        assert_eq!(remove_note_data("total supply"), "total supply");
    }

    #[test]
    fn splits_period_and_strips_notes() {
        let out = clean_df(&long_batch(vec!["2023 1", "2023 2"], vec!["oil [note 2]", "gas [note 3]"])).unwrap();
        assert_eq!(
            column_names(&out),
            vec!["resource", "category", "figures", "year", "quarter"]
        );
        assert_eq!(resources(&out), vec!["oil", "gas"]);
        assert_eq!(ints(&out, "year"), vec![2023, 2023]);
        assert_eq!(ints(&out, "quarter"), vec![1, 2]);
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let out = clean_df(&long_batch(vec!["2023 1", "2023 2"], vec![" oil  ", " blah"])).unwrap();
        assert_eq!(resources(&out), vec!["oil", "blah"]);
    }

    #[test]
    fn trimming_is_idempotent() {
        let once = clean_df(&long_batch(vec!["2023 1"], vec!["  crude oil [note 1] "])).unwrap();
        let again = clean_df(&long_batch(vec!["2023 1"], vec![resources(&once)[0].as_str()])).unwrap();
        assert_eq!(resources(&once), resources(&again));
        assert_eq!(resources(&again), vec!["crude oil"]);
    }

    #[test]
    fn rejects_unnormalized_period() {
        let err = clean_df(&long_batch(vec!["2023 Q1", "2023 Q2"], vec!["oil", "gas"])).unwrap_err();
        assert!(matches!(err, EtlError::Transform(_)));
    }

    #[test]
    fn rejects_missing_year_quarter_column() {
        let batch = batch_from(vec![(
            "resource",
            Arc::new(StringArray::from(vec!["oil", "gas"])) as ArrayRef,
            false,
        )])
        .unwrap();
        assert!(matches!(clean_df(&batch), Err(EtlError::Transform(_))));
    }
}
