// src/extract/workbook.rs

use anyhow::{Context, Result};
use calamine::{open_workbook_auto_from_rs, Data, Reader, Sheets};
use std::{fmt, io::Cursor};

/// A single worksheet cell, reduced to what the sheet parser cares about.
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&Data> for Cell {
    fn from(d: &Data) -> Self {
        match d {
            Data::Empty | Data::Error(_) => Cell::Empty,
            Data::String(s) if s.is_empty() => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Float(f) => Cell::Number(*f),
            Data::Int(i) => Cell::Number(*i as f64),
            other => Cell::Text(other.to_string()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Cell::Number(n) => write!(f, "{}", n),
        }
    }
}

/// Rows of cells from the top-left corner of the sheet.
pub type Grid = Vec<Vec<Cell>>;

/// An in-memory workbook; the format (xlsx, xls, ods) is sniffed from the bytes.
pub struct Workbook {
    sheets: Sheets<Cursor<Vec<u8>>>,
}

impl Workbook {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let sheets =
            open_workbook_auto_from_rs(Cursor::new(bytes)).context("opening workbook")?;
        Ok(Self { sheets })
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.sheet_names()
    }

    /// Read `name` into a grid anchored at A1, so row indices match the sheet.
    pub fn sheet_grid(&mut self, name: &str) -> Result<Grid> {
        let range = self
            .sheets
            .worksheet_range(name)
            .with_context(|| format!("reading sheet {:?}", name))?;

        let Some((last_row, last_col)) = range.end() else {
            return Ok(Vec::new());
        };

        let mut grid = Vec::with_capacity(last_row as usize + 1);
        for r in 0..=last_row {
            let row = (0..=last_col)
                .map(|c| range.get_value((r, c)).map(Cell::from).unwrap_or(Cell::Empty))
                .collect();
            grid.push(row);
        }
        Ok(grid)
    }
}
