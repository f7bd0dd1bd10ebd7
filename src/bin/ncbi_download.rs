use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use ncbi_fetch::config::ConfigLoader;
use ncbi_fetch::entrez::{EntrezConfig, EntrezHttpClient};
use ncbi_fetch::error::FetchError;
use ncbi_fetch::fasta::{DownloadOptions, FastaDownloader};
use ncbi_fetch::output::{ConsoleProgress, JsonOutput, ProgressSink};

#[derive(Parser)]
#[command(name = "ncbi-download")]
#[command(about = "Query NCBI and download FASTA sequences individually.")]
#[command(version)]
struct Cli {
    /// Query to search.
    #[arg(value_name = "QUERY")]
    query: String,

    /// Directory to write FASTA output to.
    #[arg(value_name = "OUTPUT")]
    output: Utf8PathBuf,

    /// NCBI database to query. (Default: nuccore)
    #[arg(long)]
    db: Option<String>,

    /// Email address for NCBI to contact in case of issues.
    #[arg(long)]
    email: Option<String>,

    /// NCBI API key to increase max queries per second.
    #[arg(long = "api_key")]
    api_key: Option<String>,

    /// Maximum number of genomes to download. (Default: 1000)
    #[arg(long, value_name = "INT")]
    retmax: Option<usize>,

    /// Run as normal, but do not download any data.
    #[arg(long = "dry_run")]
    dry_run: bool,

    /// JSON settings file with defaults (ncbi-fetch.json if present).
    #[arg(long)]
    config: Option<String>,

    /// Print the run result as JSON instead of progress lines.
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<FetchError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &FetchError) -> u8 {
    match error {
        FetchError::NcbiHttp(_)
        | FetchError::NcbiStatus { .. }
        | FetchError::ServiceUnavailable { .. }
        | FetchError::EntrezResponse(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = ConfigLoader::resolve(cli.config.as_deref())?;

    let entrez = EntrezConfig::new(settings.email(cli.email), settings.api_key(cli.api_key));
    let downloader = FastaDownloader::new(EntrezHttpClient::new(entrez)?);
    let options = DownloadOptions {
        db: settings.db(cli.db),
        retmax: settings.retmax(cli.retmax),
        dry_run: cli.dry_run,
    };

    let sink: &dyn ProgressSink = if cli.json { &JsonOutput } else { &ConsoleProgress };
    let result = downloader.run(&cli.query, &cli.output, &options, sink)?;
    if cli.json {
        JsonOutput::print_download(&result).into_diagnostic()?;
    }
    Ok(())
}
