use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum FetchError {
    #[error("filter contains errors: {0}")]
    InvalidFilter(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("NCBI request failed: {0}")]
    NcbiHttp(String),

    #[error("NCBI returned status {status}: {message}")]
    NcbiStatus { status: u16, message: String },

    #[error("{service} unavailable after {attempts} attempts: {message}")]
    #[diagnostic(help("NCBI may be rate limiting or down; try again later"))]
    ServiceUnavailable {
        service: &'static str,
        attempts: usize,
        message: String,
    },

    #[error("unexpected Entrez response: {0}")]
    EntrezResponse(String),

    #[error("required tool not found: {0}")]
    MissingTool(String),

    #[error("assembly {accession} has no value for column {column}")]
    MissingColumn { accession: String, column: String },

    #[error("malformed assembly summary: {0}")]
    MalformedSummary(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
