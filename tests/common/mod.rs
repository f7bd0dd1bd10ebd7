#![allow(dead_code)]

use ncbi_fetch::domain::FILTER_COLUMNS;

/// One report line with every filter column filled; `overrides` replaces
/// selected cells.
pub fn report_line(accession: &str, overrides: &[(&str, &str)]) -> String {
    FILTER_COLUMNS
        .iter()
        .map(|column| {
            overrides
                .iter()
                .find(|(name, _)| name == column)
                .map(|(_, value)| value.to_string())
                .unwrap_or_else(|| match *column {
                    "assembly_accession" => accession.to_string(),
                    "ftp_path" => format!("ftp://ftp.ncbi.nlm.nih.gov/genomes/all/{accession}"),
                    "assembly_level" => "Complete Genome".to_string(),
                    other => format!("{other}-{accession}"),
                })
        })
        .collect::<Vec<_>>()
        .join("\t")
}

pub fn report(lines: &[String]) -> String {
    let mut text = String::from(
        "#   See ftp://ftp.ncbi.nlm.nih.gov/genomes/README_assembly_summary.txt for a description of the columns in this file.\n",
    );
    text.push_str("# ");
    text.push_str(&FILTER_COLUMNS.join("\t"));
    text.push('\n');
    for line in lines {
        text.push_str(line);
        text.push('\n');
    }
    text
}
