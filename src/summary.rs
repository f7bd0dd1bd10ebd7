use std::fs;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};

use crate::domain::FILTER_COLUMNS;
use crate::error::FetchError;
use crate::report::AssemblyRow;

pub const SUMMARY_FILE: &str = "assembly_summary.txt";

pub fn summary_path(outdir: &Utf8Path) -> Utf8PathBuf {
    outdir.join(SUMMARY_FILE)
}

/// Renders rows as a tab-separated table in [`FILTER_COLUMNS`] order,
/// regardless of the column order of the source report.
pub fn render_summary(rows: &[AssemblyRow]) -> Result<String, FetchError> {
    let mut out = FILTER_COLUMNS.join("\t");
    out.push('\n');
    for row in rows {
        let mut values = Vec::with_capacity(FILTER_COLUMNS.len());
        for column in FILTER_COLUMNS {
            let value = row.get(column).ok_or_else(|| FetchError::MissingColumn {
                accession: row.accession().to_string(),
                column: column.to_string(),
            })?;
            values.push(value);
        }
        out.push_str(&values.join("\t"));
        out.push('\n');
    }
    Ok(out)
}

pub fn write_summary(rows: &[AssemblyRow], outdir: &Utf8Path) -> Result<Utf8PathBuf, FetchError> {
    let content = render_summary(rows)?;
    let path = summary_path(outdir);
    write_atomic(&path, content.as_bytes())?;
    Ok(path)
}

/// Parses a file produced by [`write_summary`]: the first line is a plain
/// header without the `# ` marker of the NCBI report.
pub fn read_summary(text: &str) -> Result<Vec<AssemblyRow>, FetchError> {
    let mut lines = text.lines();
    let header = lines
        .next()
        .ok_or_else(|| FetchError::MalformedSummary("missing header line".to_string()))?;
    let columns: Vec<String> = header.split('\t').map(str::to_string).collect();
    let mut rows = Vec::new();
    for (idx, line) in lines.enumerate() {
        if line.is_empty() {
            continue;
        }
        let cells = line.split('\t').count();
        if cells != columns.len() {
            return Err(FetchError::MalformedSummary(format!(
                "line {} has {cells} cells, expected {}",
                idx + 2,
                columns.len()
            )));
        }
        rows.push(AssemblyRow::from_line(&columns, line));
    }
    Ok(rows)
}

/// Writes through a temp file in the target directory so a crash never
/// leaves a half-written file under the final name.
pub fn write_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), FetchError> {
    let parent = path
        .parent()
        .ok_or_else(|| FetchError::Filesystem("invalid destination path".to_string()))?;
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| FetchError::Filesystem(err.to_string()))?;
    let mut temp = tempfile::Builder::new()
        .prefix(".ncbi-fetch")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| FetchError::Filesystem(err.to_string()))?;
    temp.write_all(content)
        .map_err(|err| FetchError::Filesystem(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| FetchError::Filesystem(err.to_string()))?;
    Ok(())
}
