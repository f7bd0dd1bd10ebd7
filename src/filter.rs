use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::domain::{ASSEMBLY_LEVEL_COLUMN, AssemblyLevel, is_filter_column};
use crate::report::AssemblyRow;

pub const MISSING_VALUE_ERROR: &str = "ERROR: INVALID COLUMN NAME, OR NO VALUE GIVEN";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Expected(String),
    Invalid(String),
}

impl FilterValue {
    pub fn as_str(&self) -> &str {
        match self {
            FilterValue::Expected(value) | FilterValue::Invalid(value) => value,
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, FilterValue::Invalid(_))
    }
}

/// Column filters in the order they were given. A column given twice keeps
/// its first position and takes the last value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnFilter {
    entries: Vec<(String, FilterValue)>,
}

impl ColumnFilter {
    /// Parses `COLUMN=VALUE;COLUMN=VALUE`. Never fails: malformed tokens are
    /// kept as [`FilterValue::Invalid`] so the whole filter can be reported.
    pub fn parse(input: &str) -> Self {
        let mut filter = ColumnFilter::default();
        for token in input.split(';') {
            let Some((column, value)) = token.split_once('=') else {
                filter.insert(token, FilterValue::Invalid(MISSING_VALUE_ERROR.to_string()));
                continue;
            };
            let entry = if value.contains('=') {
                FilterValue::Invalid(format!("{value} <-- ERROR: MULTIPLE '=' IN FILTER"))
            } else if !is_filter_column(column) {
                FilterValue::Invalid(format!("{value} <-- ERROR: INVALID COLUMN NAME"))
            } else {
                FilterValue::Expected(value.to_string())
            };
            filter.insert(column, entry);
        }
        filter
    }

    pub fn insert(&mut self, column: &str, value: FilterValue) {
        match self.entries.iter_mut().find(|(name, _)| name == column) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((column.to_string(), value)),
        }
    }

    pub fn set_assembly_level(&mut self, level: AssemblyLevel) {
        self.insert(
            ASSEMBLY_LEVEL_COLUMN,
            FilterValue::Expected(level.as_str().to_string()),
        );
    }

    /// Applies the assembly level default. An `assembly_level` already in the
    /// filter is kept unless `explicit` says the level was asked for on its own.
    pub fn default_assembly_level(&mut self, level: AssemblyLevel, explicit: bool) {
        if explicit || self.get(ASSEMBLY_LEVEL_COLUMN).is_none() {
            self.set_assembly_level(level);
        }
    }

    pub fn is_invalid(&self) -> bool {
        self.entries.iter().any(|(_, value)| value.is_invalid())
    }

    pub fn get(&self, column: &str) -> Option<&FilterValue> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when the row passes every entry. Invalid entries never match.
    pub fn matches(&self, row: &AssemblyRow) -> bool {
        self.entries
            .iter()
            .all(|(column, value)| entry_matches(column, value, row))
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

fn entry_matches(column: &str, value: &FilterValue, row: &AssemblyRow) -> bool {
    let FilterValue::Expected(expected) = value else {
        return false;
    };
    if column == ASSEMBLY_LEVEL_COLUMN && expected == "all" {
        return true;
    }
    row.get(column)
        .map(|actual| actual.to_lowercase().contains(&expected.to_lowercase()))
        .unwrap_or(false)
}

impl Serialize for ColumnFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (column, value) in &self.entries {
            map.serialize_entry(column, value.as_str())?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> AssemblyRow {
        AssemblyRow::from_pairs(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn parse_valid_filter_keeps_order() {
        let filter = ColumnFilter::parse("taxid=1280;infraspecific_name=USA300");
        assert!(!filter.is_invalid());
        let entries: Vec<_> = filter.iter().map(|(k, v)| (k, v.as_str())).collect();
        assert_eq!(
            entries,
            vec![("taxid", "1280"), ("infraspecific_name", "USA300")]
        );
    }

    #[test]
    fn parse_missing_equals() {
        let filter = ColumnFilter::parse("taxid");
        assert!(filter.is_invalid());
        assert_eq!(
            filter.get("taxid"),
            Some(&FilterValue::Invalid(MISSING_VALUE_ERROR.to_string()))
        );
    }

    #[test]
    fn parse_unknown_column() {
        let filter = ColumnFilter::parse("taxid=1280;color=blue");
        assert!(filter.is_invalid());
        assert_eq!(
            filter.get("color").map(FilterValue::as_str),
            Some("blue <-- ERROR: INVALID COLUMN NAME")
        );
        assert_eq!(
            filter.get("taxid"),
            Some(&FilterValue::Expected("1280".to_string()))
        );
    }

    #[test]
    fn parse_multiple_equals_is_rejected() {
        let filter = ColumnFilter::parse("organism_name=a=b");
        assert!(filter.is_invalid());
        assert!(
            filter
                .get("organism_name")
                .unwrap()
                .as_str()
                .contains("MULTIPLE")
        );
    }

    #[test]
    fn repeated_column_keeps_position() {
        let mut filter = ColumnFilter::parse("assembly_level=contig;taxid=1280");
        filter.set_assembly_level(AssemblyLevel::All);
        let keys: Vec<_> = filter.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["assembly_level", "taxid"]);
        assert_eq!(filter.get("assembly_level").unwrap().as_str(), "all");
    }

    #[test]
    fn explicit_level_overrides_filter() {
        let mut filter = ColumnFilter::parse("assembly_level=contig");
        filter.default_assembly_level(AssemblyLevel::Chromosome, true);
        assert_eq!(filter.get("assembly_level").unwrap().as_str(), "chromosome");
    }

    #[test]
    fn filter_level_survives_default() {
        let mut filter = ColumnFilter::parse("taxid=1280;assembly_level=contig");
        filter.default_assembly_level(AssemblyLevel::default(), false);
        assert_eq!(filter.get("assembly_level").unwrap().as_str(), "contig");
        let keys: Vec<_> = filter.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["taxid", "assembly_level"]);
    }

    #[test]
    fn default_level_fills_gap() {
        let mut filter = ColumnFilter::parse("taxid=1280");
        filter.default_assembly_level(AssemblyLevel::default(), false);
        assert_eq!(filter.get("assembly_level").unwrap().as_str(), "complete");
        assert_eq!(filter.len(), 2);
    }

    #[test]
    fn substring_match_is_case_insensitive() {
        let row = row(&[("organism_name", "Escherichia coli")]);
        assert!(ColumnFilter::parse("organism_name=coli").matches(&row));
        assert!(ColumnFilter::parse("organism_name=ESCH").matches(&row));
        assert!(!ColumnFilter::parse("organism_name=aureus").matches(&row));
    }

    #[test]
    fn all_level_bypasses_assembly_level() {
        let row = row(&[("assembly_level", "Contig")]);
        let mut filter = ColumnFilter::default();
        filter.set_assembly_level(AssemblyLevel::Complete);
        assert!(!filter.matches(&row));
        filter.set_assembly_level(AssemblyLevel::All);
        assert!(filter.matches(&row));
    }

    #[test]
    fn empty_filter_matches_everything() {
        let row = row(&[("taxid", "1")]);
        assert!(ColumnFilter::default().matches(&row));
    }

    #[test]
    fn json_uses_insertion_order() {
        let filter = ColumnFilter::parse("taxid=1280;color=blue");
        let json = filter.to_json_pretty().unwrap();
        assert_eq!(
            json,
            "{\n    \"taxid\": \"1280\",\n    \"color\": \"blue <-- ERROR: INVALID COLUMN NAME\"\n}"
        );
    }
}
