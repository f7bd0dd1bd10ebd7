use std::fs;
use std::thread;
use std::time::Duration;

use camino::Utf8Path;
use serde::Serialize;
use tracing::{info, warn};

use crate::domain::is_safe_path_component;
use crate::error::FetchError;
use crate::filter::ColumnFilter;
use crate::mirror::{Mirror, MirrorOutcome, rsync_url};
use crate::ncbi::ReportSource;
use crate::output::{ProgressEvent, ProgressSink};
use crate::report::{AssemblyRow, filter_report};
use crate::summary::write_summary;

#[derive(Debug, Clone)]
pub struct AssemblyOptions {
    pub retmax: usize,
    pub delay: Duration,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssemblyRunResult {
    pub matched: usize,
    pub dry_run: bool,
    pub summary_path: String,
    pub assemblies: Vec<AssemblyItemResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssemblyItemResult {
    pub accession: String,
    pub action: String,
    pub destination: Option<String>,
    pub exit_code: Option<i32>,
}

impl AssemblyRunResult {
    pub fn failed(&self) -> impl Iterator<Item = &AssemblyItemResult> {
        self.assemblies.iter().filter(|item| item.action == "failed")
    }
}

pub struct AssemblyApp<S: ReportSource, M: Mirror> {
    source: S,
    mirror: M,
}

impl<S: ReportSource, M: Mirror> AssemblyApp<S, M> {
    pub fn new(source: S, mirror: M) -> Self {
        Self { source, mirror }
    }

    pub fn readme(&self) -> Result<String, FetchError> {
        self.source.fetch_readme()
    }

    /// Filters the live report and mirrors every match into
    /// `<outdir>/<accession>`. A failed mirror is recorded and the run moves
    /// on; report download and filesystem errors abort.
    pub fn run(
        &self,
        filter: &ColumnFilter,
        outdir: &Utf8Path,
        options: &AssemblyOptions,
        sink: &dyn ProgressSink,
    ) -> Result<AssemblyRunResult, FetchError> {
        if filter.is_invalid() {
            return Err(FetchError::InvalidFilter(
                filter.to_json_pretty().unwrap_or_default(),
            ));
        }
        if !options.dry_run {
            self.mirror.ensure_ready()?;
        }

        sink.event(ProgressEvent::new("Downloading Bacteria Assembly Report"));
        let text = self.source.fetch_summary()?;
        let rows = filter_report(&text, filter, Some(options.retmax));
        info!(matched = rows.len(), "filtered assembly report");
        sink.event(ProgressEvent::new(format!(
            "Found {} assemblies.\n",
            group_thousands(rows.len())
        )));
        sink.event(ProgressEvent::new("Downloading assemblies..."));

        let total = rows.len();
        let mut assemblies = Vec::with_capacity(total);
        for (idx, row) in rows.iter().enumerate() {
            sink.event(ProgressEvent::new(format!(
                "Working on {} ({} of {})",
                row.accession(),
                idx + 1,
                total
            )));
            if options.dry_run {
                assemblies.push(AssemblyItemResult {
                    accession: row.accession().to_string(),
                    action: "dry-run".to_string(),
                    destination: None,
                    exit_code: None,
                });
                continue;
            }

            assemblies.push(self.mirror_row(row, outdir, sink)?);
            if idx + 1 < total {
                thread::sleep(options.delay);
            }
        }

        sink.event(ProgressEvent::new("Outputting assembly_summary.txt..."));
        let summary_path = write_summary(&rows, outdir)?;

        Ok(AssemblyRunResult {
            matched: total,
            dry_run: options.dry_run,
            summary_path: summary_path.to_string(),
            assemblies,
        })
    }

    fn mirror_row(
        &self,
        row: &AssemblyRow,
        outdir: &Utf8Path,
        sink: &dyn ProgressSink,
    ) -> Result<AssemblyItemResult, FetchError> {
        if !is_safe_path_component(row.accession()) {
            warn!(accession = row.accession(), "refusing to mirror unsafe accession");
            sink.event(ProgressEvent::new(format!(
                "Skipping {:?}: not usable as a directory name",
                row.accession()
            )));
            return Ok(AssemblyItemResult {
                accession: row.accession().to_string(),
                action: "failed".to_string(),
                destination: None,
                exit_code: None,
            });
        }
        let destination = outdir.join(row.accession());
        fs::create_dir_all(destination.as_std_path())
            .map_err(|err| FetchError::Filesystem(format!("create {destination}: {err}")))?;

        let outcome = match row.ftp_path() {
            Some(path) if !path.is_empty() && path != "na" => {
                self.mirror.mirror(&rsync_url(path), destination.as_std_path())
            }
            _ => MirrorOutcome::failed(format!("{} has no ftp_path", row.accession())),
        };
        for line in outcome.stdout.lines() {
            sink.event(ProgressEvent::new(format!("[rsync STDOUT] {line}")));
        }
        for line in outcome.stderr.lines() {
            sink.event(ProgressEvent::new(format!("[rsync STDERR] {line}")));
        }

        Ok(AssemblyItemResult {
            accession: row.accession().to_string(),
            action: if outcome.success { "mirrored" } else { "failed" }.to_string(),
            destination: Some(destination.to_string()),
            exit_code: outcome.exit_code,
        })
    }
}

/// `1234567` -> `1,234,567`.
pub fn group_thousands(value: usize) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
