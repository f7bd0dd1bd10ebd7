use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::{debug, warn};

use crate::filter::ColumnFilter;

const HEADER_PREFIX: &str = "# assembly_accession";

/// One line of the assembly summary, keyed by the report's own header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblyRow {
    fields: Vec<(String, String)>,
}

impl AssemblyRow {
    pub fn from_pairs(fields: Vec<(String, String)>) -> Self {
        Self { fields }
    }

    /// Zips header names against tab-separated cells; the longer side is
    /// truncated.
    pub fn from_line(columns: &[String], line: &str) -> Self {
        let fields = columns
            .iter()
            .zip(line.split('\t'))
            .map(|(column, value)| (column.clone(), value.to_string()))
            .collect();
        Self { fields }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn accession(&self) -> &str {
        self.get("assembly_accession").unwrap_or_default()
    }

    pub fn ftp_path(&self) -> Option<&str> {
        self.get("ftp_path")
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

impl Serialize for AssemblyRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (column, value) in &self.fields {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

pub fn parse_header(line: &str) -> Option<Vec<String>> {
    if !line.starts_with(HEADER_PREFIX) {
        return None;
    }
    let trimmed = line.trim_start_matches(['#', ' ']);
    Some(trimmed.split('\t').map(str::to_string).collect())
}

/// Parses every data row after the `# assembly_accession` header. Lines
/// before the header are comments and are skipped.
pub fn parse_report(text: &str) -> Vec<AssemblyRow> {
    let mut columns: Option<Vec<String>> = None;
    let mut rows = Vec::new();
    for line in text.lines() {
        if let Some(header) = parse_header(line) {
            debug!(columns = header.len(), "found report header");
            columns = Some(header);
            continue;
        }
        if let Some(columns) = &columns {
            if !line.is_empty() {
                rows.push(AssemblyRow::from_line(columns, line));
            }
        }
    }
    rows
}

/// Rows of `text` that pass every entry of `filter`, in report order, capped
/// at `retmax` when given.
pub fn filter_report(text: &str, filter: &ColumnFilter, retmax: Option<usize>) -> Vec<AssemblyRow> {
    let mut matched: Vec<AssemblyRow> = parse_report(text)
        .into_iter()
        .filter(|row| filter.matches(row))
        .collect();
    if let Some(limit) = retmax {
        if matched.len() > limit {
            warn!(
                matched = matched.len(),
                retmax = limit,
                "more assemblies matched than retmax allows; truncating"
            );
            matched.truncate(limit);
        }
    }
    matched
}
