//! Tabular loader: reads a CSV, keeps the text and label columns, and cleans
//! rows with an ordered list of rules before applying the optional row cap.

use arrow_array::{Array, StringArray};
use arrow_csv::reader::Format;
use arrow_csv::ReaderBuilder;
use arrow_schema::{DataType, Field, Schema};
use regex::Regex;
use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::types::{Dataset, Record};

/// Label cell as it moves through the cleaning rules.
#[derive(Debug, Clone, PartialEq)]
pub enum Label {
    Missing,
    Raw(String),
    Numeric(f64),
}

/// A row before cleaning. `None` text means the cell was empty or absent.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRow {
    pub text: Option<String>,
    pub label: Label,
}

impl CandidateRow {
    pub fn new(text: Option<&str>, label: Option<&str>) -> Self {
        Self {
            text: text.map(str::to_string),
            label: label.map_or(Label::Missing, |s| Label::Raw(s.to_string())),
        }
    }

    fn into_record(self) -> Option<Record> {
        match (self.text, self.label) {
            (Some(text), Label::Numeric(label)) => Some(Record { text, label }),
            _ => None,
        }
    }
}

/// One row predicate. Rules may rewrite the row (trim, parse) or drop it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleaningRule {
    /// Drop rows missing either cell.
    BothPresent,
    /// Trim the text; drop rows whose trimmed text is empty.
    NonBlankText,
    /// Parse the label as a number; unparsable or NaN labels drop the row.
    NumericLabel,
}

pub const DEFAULT_RULES: [CleaningRule; 3] =
    [CleaningRule::BothPresent, CleaningRule::NonBlankText, CleaningRule::NumericLabel];

impl CleaningRule {
    pub fn apply(self, row: CandidateRow) -> Option<CandidateRow> {
        match self {
            Self::BothPresent => {
                (row.text.is_some() && row.label != Label::Missing).then_some(row)
            }
            Self::NonBlankText => {
                let text = row.text?.trim().to_string();
                (!text.is_empty()).then(|| CandidateRow { text: Some(text), label: row.label })
            }
            Self::NumericLabel => {
                let value = match &row.label {
                    Label::Missing => return None,
                    Label::Numeric(v) => *v,
                    Label::Raw(s) => s.trim().parse::<f64>().ok()?,
                };
                (!value.is_nan()).then_some(CandidateRow { text: row.text, label: Label::Numeric(value) })
            }
        }
    }
}

/// Run every row through `rules` in order, then keep at most `limit` survivors.
pub fn clean_rows<I>(rows: I, rules: &[CleaningRule], limit: Option<usize>) -> Vec<Record>
where
    I: IntoIterator<Item = CandidateRow>,
{
    let cleaned = rows
        .into_iter()
        .filter_map(|row| rules.iter().try_fold(row, |row, rule| rule.apply(row)))
        .filter_map(CandidateRow::into_record);
    match limit {
        Some(n) => cleaned.take(n).collect(),
        None => cleaned.collect(),
    }
}

/// Cell values read as missing: the empty cell plus the usual spreadsheet and
/// dataframe NA markers. Matching is exact and case-sensitive.
pub const NA_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

fn na_regex() -> Result<Regex> {
    let alternatives: Vec<String> = NA_MARKERS.iter().map(|m| regex::escape(m)).collect();
    Regex::new(&format!("^(?:{})$", alternatives.join("|")))
        .map_err(|e| Error::InvalidConfig(format!("NA marker pattern: {e}")))
}

/// Header names of a CSV file, in file order.
pub fn read_header(file: &mut File) -> Result<Vec<String>> {
    let (schema, _) = Format::default().with_header(true).infer_schema(&mut *file, Some(0))?;
    file.seek(SeekFrom::Start(0))?;
    Ok(schema.fields().iter().map(|f| f.name().clone()).collect())
}

/// Read the two required columns as raw candidate rows, in file order.
pub fn read_candidates(path: &Path, text_column: &str, label_column: &str) -> Result<Vec<CandidateRow>> {
    let mut file = File::open(path)?;
    let columns = read_header(&mut file)?;
    for required in [text_column, label_column] {
        if !columns.iter().any(|c| c == required) {
            return Err(Error::MissingColumn { column: required.to_string(), available: columns });
        }
    }
    // Everything is read as text; numeric coercion is a cleaning rule. NA
    // markers come back as nulls, so they fail `BothPresent`.
    let schema = Arc::new(Schema::new(
        columns.iter().map(|name| Field::new(name, DataType::Utf8, true)).collect::<Vec<_>>(),
    ));
    let reader = ReaderBuilder::new(schema)
        .with_header(true)
        .with_truncated_rows(true)
        .with_null_regex(na_regex()?)
        .build(file)?;

    let mut rows = Vec::new();
    for batch in reader {
        let batch = batch?;
        let text_col = string_column(&batch, text_column)?;
        let label_col = string_column(&batch, label_column)?;
        for i in 0..batch.num_rows() {
            let text = (!text_col.is_null(i)).then(|| text_col.value(i));
            let label = (!label_col.is_null(i)).then(|| label_col.value(i));
            rows.push(CandidateRow::new(text, label));
        }
    }
    Ok(rows)
}

fn string_column<'a>(batch: &'a arrow_array::RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| Error::InvalidConfig(format!("column '{name}' is not a text column")))
}

/// Load, clean and cap a CSV into aligned texts and labels.
pub fn load_dataset(
    path: &Path,
    text_column: &str,
    label_column: &str,
    limit: Option<usize>,
) -> Result<Dataset> {
    let candidates = read_candidates(path, text_column, label_column)?;
    let total = candidates.len();
    let records = clean_rows(candidates, &DEFAULT_RULES, limit);
    debug!("Kept {} of {} rows after cleaning (cap {:?})", records.len(), total, limit);
    info!("Loaded {} rows from {}", records.len(), path.display());
    Ok(Dataset::from_records(records))
}
