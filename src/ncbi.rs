use reqwest::blocking::Client;
use tracing::info;

use crate::error::FetchError;
use crate::http;

pub const ASSEMBLY_SUMMARY_URL: &str =
    "https://ftp.ncbi.nlm.nih.gov/genomes/refseq/bacteria/assembly_summary.txt";
pub const ASSEMBLY_README_URL: &str =
    "https://ftp.ncbi.nlm.nih.gov/genomes/README_assembly_summary.txt";

pub trait ReportSource {
    /// Raw tab-separated RefSeq bacteria assembly summary.
    fn fetch_summary(&self) -> Result<String, FetchError>;
    /// NCBI's README describing each summary column.
    fn fetch_readme(&self) -> Result<String, FetchError>;
}

#[derive(Clone)]
pub struct NcbiHttpClient {
    client: Client,
    summary_url: String,
    readme_url: String,
}

impl NcbiHttpClient {
    pub fn new() -> Result<Self, FetchError> {
        Self::with_urls(ASSEMBLY_SUMMARY_URL, ASSEMBLY_README_URL)
    }

    /// Client reading the summary and README from other locations, such as
    /// a local mirror.
    pub fn with_urls(summary_url: &str, readme_url: &str) -> Result<Self, FetchError> {
        Ok(Self {
            client: http::build_client()?,
            summary_url: summary_url.to_string(),
            readme_url: readme_url.to_string(),
        })
    }

    fn get_text(&self, url: &str) -> Result<String, FetchError> {
        info!(url, "downloading");
        http::fetch_text_with_retries("NCBI FTP", || {
            self.client.get(url).timeout(http::BULK_TIMEOUT)
        })
    }
}

impl ReportSource for NcbiHttpClient {
    fn fetch_summary(&self) -> Result<String, FetchError> {
        self.get_text(&self.summary_url)
    }

    fn fetch_readme(&self) -> Result<String, FetchError> {
        self.get_text(&self.readme_url)
    }
}
