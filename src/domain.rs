use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Columns of the assembly summary report that may be filtered on. This is
/// also the column order of the written `assembly_summary.txt`.
pub const FILTER_COLUMNS: [&str; 22] = [
    "assembly_accession",
    "bioproject",
    "biosample",
    "wgs_master",
    "refseq_category",
    "taxid",
    "species_taxid",
    "organism_name",
    "infraspecific_name",
    "isolate",
    "version_status",
    "assembly_level",
    "release_type",
    "genome_rep",
    "seq_rel_date",
    "asm_name",
    "submitter",
    "gbrs_paired_asm",
    "paired_asm_comp",
    "ftp_path",
    "excluded_from_refseq",
    "relation_to_type_material",
];

pub const ASSEMBLY_LEVEL_COLUMN: &str = "assembly_level";

pub fn is_filter_column(name: &str) -> bool {
    FILTER_COLUMNS.contains(&name)
}

pub fn sorted_filter_columns() -> Vec<&'static str> {
    let mut columns = FILTER_COLUMNS.to_vec();
    columns.sort_unstable();
    columns
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AssemblyLevel {
    #[default]
    Complete,
    Chromosome,
    Scaffold,
    Contig,
    All,
}

impl AssemblyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssemblyLevel::Complete => "complete",
            AssemblyLevel::Chromosome => "chromosome",
            AssemblyLevel::Scaffold => "scaffold",
            AssemblyLevel::Contig => "contig",
            AssemblyLevel::All => "all",
        }
    }
}

impl fmt::Display for AssemblyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// True when `value` can name a single entry inside an output directory.
/// Accessions come from remote documents, so anything that could climb out
/// of the directory or name it is refused.
pub fn is_safe_path_component(value: &str) -> bool {
    !value.is_empty()
        && value != "."
        && !value.contains("..")
        && !value.contains(['/', '\\'])
}
