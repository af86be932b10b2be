use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::Path;

use csv::Writer;

use crate::api::models::MessageRecord;
use crate::error::AppResult;
use crate::mail::extract_domain;

/// Headers requested for every analyzed message.
pub const ANALYSIS_HEADERS: [&str; 5] = ["Subject", "From", "Date", "To", "List-Unsubscribe"];

const ID_COLUMN: &str = "id";
const SNIPPET_COLUMN: &str = "snippet";
const COLUMN_ORDER: [&str; 7] = [
    ID_COLUMN,
    "From",
    "To",
    "Subject",
    "Date",
    "List-Unsubscribe",
    SNIPPET_COLUMN,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRow {
    pub id: String,
    pub snippet: String,
    headers: HashMap<&'static str, String>,
}

impl AnalysisRow {
    pub fn from_record(record: &MessageRecord) -> Self {
        let headers = ANALYSIS_HEADERS
            .iter()
            .filter_map(|name| record.header(name).map(|value| (*name, value.to_string())))
            .collect();

        Self {
            id: record.id.clone(),
            snippet: record.snippet.clone(),
            headers,
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        match column {
            ID_COLUMN => Some(self.id.as_str()),
            SNIPPET_COLUMN => Some(self.snippet.as_str()),
            _ => self.headers.get(column).map(String::as_str),
        }
    }

    pub fn sender(&self) -> Option<&str> {
        self.get("From")
    }

    pub fn has_unsubscribe(&self) -> bool {
        self.headers.contains_key("List-Unsubscribe")
    }
}

/// One row per analyzed message. Header columns no message carries are left
/// out entirely.
#[derive(Debug, Clone, Default)]
pub struct AnalysisTable {
    columns: Vec<&'static str>,
    rows: Vec<AnalysisRow>,
}

impl AnalysisTable {
    pub fn from_records(records: &[MessageRecord]) -> Self {
        let rows: Vec<_> = records.iter().map(AnalysisRow::from_record).collect();
        let columns = COLUMN_ORDER
            .into_iter()
            .filter(|column| rows.iter().any(|row| row.get(column).is_some()))
            .collect();

        Self { columns, rows }
    }

    pub fn columns(&self) -> &[&'static str] {
        &self.columns
    }

    pub fn rows(&self) -> &[AnalysisRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn unsubscribe_rows(&self) -> Vec<&AnalysisRow> {
        self.rows.iter().filter(|row| row.has_unsubscribe()).collect()
    }

    /// Missing values are written as empty fields.
    pub fn write_csv<W: Write>(&self, out: W) -> AppResult<()> {
        let mut writer = Writer::from_writer(out);
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(
                self.columns
                    .iter()
                    .map(|column| row.get(column).unwrap_or_default()),
            )?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn save_csv(&self, path: &Path) -> AppResult<()> {
        let file = std::fs::File::create(path)?;
        self.write_csv(file)
    }
}

/// Occurrences of each value, most frequent first, ties by value.
pub fn value_counts<'a, I>(values: I) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in values {
        *counts.entry(value).or_default() += 1;
    }

    let mut ranked: Vec<_> = counts
        .into_iter()
        .map(|(value, count)| (value.to_string(), count))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

/// Message ids keyed by sender domain, as written in the header. Rows with
/// no usable domain are left out.
pub fn group_by_domain<'a, I>(rows: I) -> BTreeMap<String, Vec<String>>
where
    I: IntoIterator<Item = &'a AnalysisRow>,
{
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for row in rows {
        let Some(domain) = row.sender().and_then(extract_domain) else {
            continue;
        };
        if domain.is_empty() {
            continue;
        }
        groups
            .entry(domain.to_string())
            .or_default()
            .push(row.id.clone());
    }
    groups
}

pub fn format_counts(counts: &[(String, usize)], top: usize) -> Vec<String> {
    let width = counts
        .iter()
        .take(top)
        .map(|(value, _)| value.chars().count())
        .max()
        .unwrap_or(0);

    counts
        .iter()
        .take(top)
        .map(|(value, count)| format!("{value:<width$}  {count:>5}"))
        .collect()
}
