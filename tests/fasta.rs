use std::collections::HashMap;
use std::fs;
use std::sync::Mutex;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use ncbi_fetch::entrez::{EntrezClient, SearchResult};
use ncbi_fetch::error::FetchError;
use ncbi_fetch::fasta::{
    DownloadOptions, FastaDownloader, MANIFEST_FILE, RecordState, fasta_path,
};
use ncbi_fetch::output::RecordingProgress;

#[derive(Default)]
struct MockEntrez {
    ids: Vec<String>,
    captions: HashMap<String, String>,
    fetches: Mutex<Vec<String>>,
    broken_summary: Option<String>,
}

impl MockEntrez {
    fn with_records(records: &[(&str, &str)]) -> Self {
        Self {
            ids: records.iter().map(|(id, _)| id.to_string()).collect(),
            captions: records
                .iter()
                .map(|(id, acc)| (id.to_string(), acc.to_string()))
                .collect(),
            ..Self::default()
        }
    }

    fn fetches(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }
}

impl EntrezClient for &MockEntrez {
    fn esearch(&self, _db: &str, _term: &str, retmax: usize) -> Result<SearchResult, FetchError> {
        Ok(SearchResult {
            count: self.ids.len() as u64,
            ids: self.ids.iter().take(retmax).cloned().collect(),
        })
    }

    fn esummary(&self, _db: &str, id: &str) -> Result<String, FetchError> {
        if self.broken_summary.as_deref() == Some(id) {
            return Err(FetchError::ServiceUnavailable {
                service: "NCBI Entrez",
                attempts: 4,
                message: "connection reset".to_string(),
            });
        }
        self.captions
            .get(id)
            .cloned()
            .ok_or_else(|| FetchError::EntrezResponse(format!("no caption in summary for {id}")))
    }

    fn efetch_fasta(&self, _db: &str, id: &str) -> Result<String, FetchError> {
        self.fetches.lock().unwrap().push(id.to_string());
        Ok(format!(">{id} synthetic record\nACGTACGT\n"))
    }
}

fn options(dry_run: bool) -> DownloadOptions {
    DownloadOptions {
        db: "nuccore".to_string(),
        retmax: 1000,
        dry_run,
    }
}

fn outdir(temp: &tempfile::TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(temp.path().join("fasta")).unwrap()
}

#[test]
fn fetches_missing_and_skips_existing() {
    let temp = tempfile::tempdir().unwrap();
    let out = outdir(&temp);
    fs::create_dir_all(out.as_std_path()).unwrap();
    fs::write(fasta_path(&out, "NC_000002").as_std_path(), ">kept\n").unwrap();

    let entrez = MockEntrez::with_records(&[("101", "NC_000001"), ("102", "NC_000002")]);
    let downloader = FastaDownloader::new(&entrez);
    let progress = RecordingProgress::default();
    let result = downloader.run("staph", &out, &options(false), &progress).unwrap();

    let states: Vec<_> = result.records.iter().map(|r| r.state).collect();
    assert_eq!(states, vec![RecordState::Fetched, RecordState::Skipped]);
    assert_eq!(entrez.fetches(), vec!["101"]);

    let fetched = fs::read_to_string(fasta_path(&out, "NC_000001").as_std_path()).unwrap();
    assert!(fetched.starts_with(">101"));
    let kept = fs::read_to_string(fasta_path(&out, "NC_000002").as_std_path()).unwrap();
    assert_eq!(kept, ">kept\n");

    let manifest = fs::read_to_string(out.join(MANIFEST_FILE).as_std_path()).unwrap();
    assert_eq!(manifest, "NC_000001\nNC_000002");
    assert!(progress.messages().contains(&"\tSkip existing NC_000002".to_string()));
}

#[test]
fn second_run_skips_everything() {
    let temp = tempfile::tempdir().unwrap();
    let out = outdir(&temp);
    let entrez = MockEntrez::with_records(&[("101", "NC_000001"), ("102", "NC_000002")]);
    let downloader = FastaDownloader::new(&entrez);

    downloader
        .run("staph", &out, &options(false), &RecordingProgress::default())
        .unwrap();
    let first = fs::read_to_string(fasta_path(&out, "NC_000001").as_std_path()).unwrap();

    let second = downloader
        .run("staph", &out, &options(false), &RecordingProgress::default())
        .unwrap();
    assert!(second.records.iter().all(|r| r.state == RecordState::Skipped));
    assert_eq!(entrez.fetches().len(), 2);
    assert_eq!(
        fs::read_to_string(fasta_path(&out, "NC_000001").as_std_path()).unwrap(),
        first
    );
    assert_eq!(second.accessions(), vec!["NC_000001", "NC_000002"]);
}

#[test]
fn dry_run_writes_nothing() {
    let temp = tempfile::tempdir().unwrap();
    let out = outdir(&temp);
    let entrez = MockEntrez::with_records(&[("101", "NC_000001")]);
    let downloader = FastaDownloader::new(&entrez);

    let result = downloader
        .run("staph", &out, &options(true), &RecordingProgress::default())
        .unwrap();

    assert_eq!(result.records[0].state, RecordState::Listed);
    assert!(result.manifest_path.is_none());
    assert!(entrez.fetches().is_empty());
    assert!(!out.as_std_path().exists());
}

#[test]
fn failure_keeps_partial_manifest() {
    let temp = tempfile::tempdir().unwrap();
    let out = outdir(&temp);
    let mut entrez = MockEntrez::with_records(&[
        ("101", "NC_000001"),
        ("102", "NC_000002"),
        ("103", "NC_000003"),
    ]);
    entrez.broken_summary = Some("102".to_string());
    let downloader = FastaDownloader::new(&entrez);

    let err = downloader
        .run("staph", &out, &options(false), &RecordingProgress::default())
        .unwrap_err();
    assert_matches!(err, FetchError::ServiceUnavailable { .. });

    let manifest = fs::read_to_string(out.join(MANIFEST_FILE).as_std_path()).unwrap();
    assert_eq!(manifest, "NC_000001");
    assert!(!fasta_path(&out, "NC_000003").as_std_path().exists());
}

#[test]
fn manifest_failure_does_not_hide_remote_error() {
    let temp = tempfile::tempdir().unwrap();
    let out = outdir(&temp);
    // A directory where the manifest should go makes the manifest write fail.
    let blocker = out.join(MANIFEST_FILE);
    fs::create_dir_all(blocker.join("occupied").as_std_path()).unwrap();
    let mut entrez = MockEntrez::with_records(&[("101", "NC_000001"), ("102", "NC_000002")]);
    entrez.broken_summary = Some("102".to_string());
    let downloader = FastaDownloader::new(&entrez);

    let err = downloader
        .run("staph", &out, &options(false), &RecordingProgress::default())
        .unwrap_err();

    assert_matches!(err, FetchError::ServiceUnavailable { .. });
    assert!(blocker.as_std_path().is_dir());
}

#[test]
fn unsafe_caption_is_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let out = outdir(&temp);
    let entrez = MockEntrez::with_records(&[("101", "NC_000001"), ("102", "../x")]);
    let downloader = FastaDownloader::new(&entrez);

    let err = downloader
        .run("staph", &out, &options(false), &RecordingProgress::default())
        .unwrap_err();

    assert_matches!(err, FetchError::EntrezResponse(_));
    assert_eq!(entrez.fetches(), vec!["101"]);
    assert!(!temp.path().join("x.fasta").exists());
    let manifest = fs::read_to_string(out.join(MANIFEST_FILE).as_std_path()).unwrap();
    assert_eq!(manifest, "NC_000001");
}

#[test]
fn retmax_bounds_search() {
    let temp = tempfile::tempdir().unwrap();
    let out = outdir(&temp);
    let entrez = MockEntrez::with_records(&[("101", "A1"), ("102", "A2"), ("103", "A3")]);
    let downloader = FastaDownloader::new(&entrez);
    let opts = DownloadOptions {
        retmax: 2,
        ..options(false)
    };

    let result = downloader
        .run("staph", &out, &opts, &RecordingProgress::default())
        .unwrap();
    assert_eq!(result.count, 3);
    assert_eq!(result.accessions(), vec!["A1", "A2"]);
}
