// src/transform/category.rs

use std::{str::FromStr, sync::Arc};

use arrow::{
    array::{ArrayRef, StringArray},
    record_batch::RecordBatch,
};

use thiserror::Error;
use crate::error::EtlError;
use crate::transform::utils::{as_strings, with_column};

/// Pie category of a resource row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Production,
    Import,
    Export,
    Other,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Production,
        Category::Import,
        Category::Export,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Production => "production",
            Category::Import => "import",
            Category::Export => "export",
            Category::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown category `{0}`")]
pub struct UnknownCategory(pub String);

/// Exact match on the lower-case ledger spelling.
impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Checked in this order; the first hit wins.
const PIE_KEYWORDS: [(&str, Category); 3] = [
    ("production", Category::Production),
    ("import", Category::Import),
    ("export", Category::Export),
];

/// Rows keep a carried-down tag only if their label mentions one of these.
const PIE_MEMBERS: [&str; 6] = [
    "production",
    "import",
    "export",
    "crude oil",
    "ngl",
    "feedstocks",
];

pub fn retrieve_pie_category(label: &str) -> Option<Category> {
    PIE_KEYWORDS
        .iter()
        .find(|(kw, _)| label.contains(kw))
        .map(|(_, cat)| *cat)
}

pub fn nullify_category_if_not_pie(label: &str, category: Option<Category>) -> Option<Category> {
    if PIE_MEMBERS.iter().any(|kw| label.contains(kw)) {
        category
    } else {
        None
    }
}

/// Tag every row with a category and insert it as column 1.
///
/// Tags are forward-filled from the last row naming a pie keyword, re-nulled
/// where the label is not a pie member, and the remaining nulls become
/// `other`.
pub fn extract_pie_df(batch: &RecordBatch) -> Result<RecordBatch, EtlError> {
    let schema = batch.schema();
    let label_name = schema
        .fields()
        .first()
        .map(|f| f.name().clone())
        .ok_or_else(|| EtlError::Transform("empty table has no label column".into()))?;
    let labels = as_strings(batch.column(0), &label_name)?;

    let mut carried: Option<Category> = None;
    let tags: Vec<&str> = labels
        .iter()
        .map(|label| {
            let label = label.unwrap_or_default();
            if let Some(cat) = retrieve_pie_category(label) {
                carried = Some(cat);
            }
            nullify_category_if_not_pie(label, carried)
                .unwrap_or(Category::Other)
                .as_str()
        })
        .collect();

    let category: ArrayRef = Arc::new(StringArray::from(tags));
    with_column(batch, Some(1), "category", category, false)
}
