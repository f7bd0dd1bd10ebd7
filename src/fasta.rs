use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::{info, warn};

use crate::domain::is_safe_path_component;
use crate::entrez::EntrezClient;
use crate::error::FetchError;
use crate::output::{ProgressEvent, ProgressSink};
use crate::summary::write_atomic;

pub const MANIFEST_FILE: &str = "completed-genomes.txt";

#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub db: String,
    pub retmax: usize,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordState {
    /// FASTA fetched and written.
    Fetched,
    /// `<accession>.fasta` already existed.
    Skipped,
    /// Dry run: resolved but nothing written.
    Listed,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordResult {
    pub id: String,
    pub accession: String,
    pub state: RecordState,
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadResult {
    pub count: u64,
    pub records: Vec<RecordResult>,
    pub manifest_path: Option<String>,
}

impl DownloadResult {
    pub fn accessions(&self) -> Vec<&str> {
        accessions(&self.records)
    }
}

fn accessions(records: &[RecordResult]) -> Vec<&str> {
    records
        .iter()
        .map(|record| record.accession.as_str())
        .collect()
}

pub fn fasta_path(outdir: &Utf8Path, accession: &str) -> Utf8PathBuf {
    outdir.join(format!("{accession}.fasta"))
}

pub fn manifest_path(outdir: &Utf8Path) -> Utf8PathBuf {
    outdir.join(MANIFEST_FILE)
}

pub fn write_manifest(outdir: &Utf8Path, accessions: &[&str]) -> Result<Utf8PathBuf, FetchError> {
    let path = manifest_path(outdir);
    write_atomic(&path, accessions.join("\n").as_bytes())?;
    Ok(path)
}

pub struct FastaDownloader<E: EntrezClient> {
    entrez: E,
}

impl<E: EntrezClient> FastaDownloader<E> {
    pub fn new(entrez: E) -> Self {
        Self { entrez }
    }

    /// Searches once, then resolves and fetches each hit in search order.
    /// Existing `<accession>.fasta` files are left untouched, so re-running
    /// against the same directory only fetches what is missing. If a remote
    /// call fails, the manifest of records handled so far is still written
    /// before the error is returned.
    pub fn run(
        &self,
        query: &str,
        outdir: &Utf8Path,
        options: &DownloadOptions,
        sink: &dyn ProgressSink,
    ) -> Result<DownloadResult, FetchError> {
        if !options.dry_run {
            fs::create_dir_all(outdir.as_std_path())
                .map_err(|err| FetchError::Filesystem(format!("create {outdir}: {err}")))?;
        }

        let search = self.entrez.esearch(&options.db, query, options.retmax)?;
        sink.event(ProgressEvent::new(format!("Database: {}", options.db)));
        sink.event(ProgressEvent::new(format!("Max Records: {}", options.retmax)));
        sink.event(ProgressEvent::new(format!("Output Directory: {outdir}")));
        sink.event(ProgressEvent::new(format!("Query: {query}")));
        sink.event(ProgressEvent::new("----------"));
        sink.event(ProgressEvent::new("Searching for records..."));
        sink.event(ProgressEvent::new(format!("\tFound {} records.\n", search.count)));
        sink.event(ProgressEvent::new("Downloading records..."));
        info!(count = search.count, ids = search.ids.len(), "esearch complete");

        let mut records = Vec::with_capacity(search.ids.len());
        let outcome = self.process_ids(&search.ids, outdir, options, sink, &mut records);

        if let Err(err) = outcome {
            if !options.dry_run {
                warn!(completed = records.len(), "download aborted; writing partial manifest");
                if let Err(manifest_err) = write_manifest(outdir, &accessions(&records)) {
                    warn!(error = %manifest_err, "partial manifest not written");
                }
            }
            return Err(err);
        }

        let manifest = if options.dry_run {
            None
        } else {
            sink.event(ProgressEvent::new("Outputting list of completed genomes."));
            Some(write_manifest(outdir, &accessions(&records))?.to_string())
        };

        Ok(DownloadResult {
            count: search.count,
            records,
            manifest_path: manifest,
        })
    }

    fn process_ids(
        &self,
        ids: &[String],
        outdir: &Utf8Path,
        options: &DownloadOptions,
        sink: &dyn ProgressSink,
        records: &mut Vec<RecordResult>,
    ) -> Result<(), FetchError> {
        for id in ids {
            let accession = self.entrez.esummary(&options.db, id)?;
            if !is_safe_path_component(&accession) {
                return Err(FetchError::EntrezResponse(format!(
                    "accession {accession:?} for {id} is not usable as a file name"
                )));
            }
            sink.event(ProgressEvent::new(format!("\tDownloading {accession}")));
            let state = if options.dry_run {
                RecordState::Listed
            } else {
                let path = fasta_path(outdir, &accession);
                if path.as_std_path().is_file() {
                    sink.event(ProgressEvent::new(format!("\tSkip existing {accession}")));
                    RecordState::Skipped
                } else {
                    let fasta = self.entrez.efetch_fasta(&options.db, id)?;
                    write_atomic(&path, fasta.as_bytes())?;
                    RecordState::Fetched
                }
            };
            records.push(RecordResult {
                id: id.clone(),
                accession,
                state,
            });
        }
        Ok(())
    }
}
