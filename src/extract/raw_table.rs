// src/extract/raw_table.rs

use anyhow::{anyhow, bail, Result};
use arrow::{
    array::{Array, ArrayRef, Float64Array, Int64Array, StringArray},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use std::sync::Arc;

use super::workbook::Cell;

/// Name given to the label column when its header cell is blank.
pub const LABEL_COLUMN: &str = "resource";

/// Turn the grid below `header_row` into a typed table.
///
/// Fully blank rows are dropped, as are columns with neither a header nor
/// any values. Column types are inferred: all-integral numbers become
/// Int64, other numbers Float64, anything with text Utf8 (numbers rendered),
/// and an all-blank column Float64 nulls. The label column is lower-cased.
pub fn extract_resource_table(grid: &[Vec<Cell>], header_row: usize) -> Result<RecordBatch> {
    let header = grid
        .get(header_row)
        .ok_or_else(|| anyhow!("sheet has {} rows, no header at row {}", grid.len(), header_row))?;
    let rows: Vec<&Vec<Cell>> = grid[header_row + 1..]
        .iter()
        .filter(|r| r.iter().any(|c| !c.is_empty()))
        .collect();

    let width = rows.iter().map(|r| r.len()).chain([header.len()]).max().unwrap_or(0);
    if width == 0 {
        bail!("sheet is empty below row {}", header_row);
    }

    let cell = |row: &Vec<Cell>, col: usize| row.get(col).cloned().unwrap_or(Cell::Empty);

    let mut fields = Vec::new();
    let mut arrays: Vec<ArrayRef> = Vec::new();
    for col in 0..width {
        let head = header.get(col).cloned().unwrap_or(Cell::Empty);
        let values: Vec<Cell> = rows.iter().map(|r| cell(r, col)).collect();
        if col > 0 && head.is_empty() && values.iter().all(Cell::is_empty) {
            continue;
        }

        let name = match (&head, col) {
            (Cell::Empty, 0) => LABEL_COLUMN.to_string(),
            (Cell::Empty, _) => format!("column_{}", col),
            (h, _) => h.to_string().trim().to_string(),
        };
        let mut array = infer_column(&values);
        if col == 0 {
            array = lowercase_labels(array);
        }
        fields.push(Field::new(name, array.data_type().clone(), true));
        arrays.push(array);
    }

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
}

fn infer_column(values: &[Cell]) -> ArrayRef {
    let has_text = values.iter().any(|c| matches!(c, Cell::Text(_)));
    if has_text {
        let strings: StringArray = values
            .iter()
            .map(|c| (!c.is_empty()).then(|| c.to_string()))
            .collect();
        return Arc::new(strings);
    }

    let numbers: Vec<Option<f64>> = values
        .iter()
        .map(|c| match c {
            Cell::Number(n) => Some(*n),
            _ => None,
        })
        .collect();
    let integral = numbers.iter().any(Option::is_some)
        && numbers
            .iter()
            .flatten()
            .all(|n| n.fract() == 0.0 && n.abs() < i64::MAX as f64);
    if integral {
        Arc::new(numbers.iter().map(|n| n.map(|v| v as i64)).collect::<Int64Array>())
    } else {
        Arc::new(Float64Array::from(numbers))
    }
}

fn lowercase_labels(array: ArrayRef) -> ArrayRef {
    match array.data_type() {
        DataType::Utf8 => {
            let Some(strings) = array.as_any().downcast_ref::<StringArray>() else {
                return array;
            };
            let lowered: StringArray = strings.iter().map(|s| s.map(str::to_lowercase)).collect();
            Arc::new(lowered)
        }
        _ => array,
    }
}
