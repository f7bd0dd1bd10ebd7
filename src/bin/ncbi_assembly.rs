use std::process::ExitCode;
use std::time::Duration;

use camino::Utf8PathBuf;
use clap::{CommandFactory, Parser};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use ncbi_fetch::assembly::{AssemblyApp, AssemblyOptions};
use ncbi_fetch::config::ConfigLoader;
use ncbi_fetch::domain::{AssemblyLevel, sorted_filter_columns};
use ncbi_fetch::error::FetchError;
use ncbi_fetch::filter::ColumnFilter;
use ncbi_fetch::mirror::RsyncMirror;
use ncbi_fetch::ncbi::NcbiHttpClient;
use ncbi_fetch::output::{ConsoleProgress, JsonOutput, OutputMode, ProgressSink};

#[derive(Parser)]
#[command(name = "ncbi-assembly")]
#[command(about = "Query NCBI's bacterial assembly report and mirror matching assemblies.")]
#[command(version)]
struct Cli {
    /// Columns to filter. Expects COLUMN_NAME=VALUE format, e.g. "taxid=1280".
    /// Multiple filters are separated by ";", e.g. "taxid=1280;infraspecific_name=USA300".
    #[arg(value_name = "FILTER")]
    filter: Option<String>,

    /// Directory to download assemblies to.
    #[arg(value_name = "OUTPUT")]
    output: Option<Utf8PathBuf>,

    /// Maximum number of assemblies to download. (Default: 1000)
    #[arg(long, value_name = "INT")]
    retmax: Option<usize>,

    /// Level of assemblies to download. See NCBI's README (--report_readme)
    /// for more information about each level. Overrides an assembly_level
    /// given in FILTER. (Default: complete)
    #[arg(long = "assembly_level", value_enum)]
    assembly_level: Option<AssemblyLevel>,

    /// Delay between downloads in seconds. (Default: 3)
    #[arg(long, value_name = "INT")]
    delay: Option<u64>,

    /// Print a list of filterable columns.
    #[arg(long = "filter_columns")]
    filter_columns: bool,

    /// Print the expected filter to be applied.
    #[arg(long = "validate_filter")]
    validate_filter: bool,

    /// Print NCBI's assembly report README for filterable columns.
    #[arg(long = "report_readme")]
    report_readme: bool,

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
    match run() {
        Ok(code) => code,
        Err(report) => {
            eprintln!("{report:?}");
            if let Some(err) = report.downcast_ref::<FetchError>() {
                return ExitCode::from(map_exit_code(err));
            }
            ExitCode::from(1)
        }
    }
}

fn map_exit_code(error: &FetchError) -> u8 {
    match error {
        FetchError::NcbiHttp(_)
        | FetchError::NcbiStatus { .. }
        | FetchError::ServiceUnavailable { .. }
        | FetchError::MissingTool(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if std::env::args_os().len() == 1 {
        Cli::command().print_help().into_diagnostic()?;
        return Ok(ExitCode::SUCCESS);
    }

    let cli = Cli::parse();
    let settings = ConfigLoader::resolve(cli.config.as_deref())?;

    if cli.filter_columns {
        println!("{:?}", sorted_filter_columns());
        return Ok(ExitCode::SUCCESS);
    }

    let app = AssemblyApp::new(NcbiHttpClient::new()?, RsyncMirror::new());
    if cli.report_readme {
        println!("{}", app.readme()?);
        return Ok(ExitCode::SUCCESS);
    }

    let Some(filter_text) = cli.filter.as_deref() else {
        return Err(miette::Report::msg("FILTER is required (try --help)"));
    };
    let mut filter = ColumnFilter::parse(filter_text);
    if filter.is_invalid() {
        eprintln!("Given filter contains errors, please check...");
        eprintln!("{}", filter.to_json_pretty().into_diagnostic()?);
        return Ok(ExitCode::from(1));
    }
    if cli.validate_filter {
        println!("The following filter will be applied:");
        println!("{}", filter.to_json_pretty().into_diagnostic()?);
        return Ok(ExitCode::SUCCESS);
    }

    let Some(output) = cli.output else {
        return Err(miette::Report::msg("OUTPUT is required (try --help)"));
    };
    filter.default_assembly_level(
        settings.assembly_level(cli.assembly_level),
        cli.assembly_level.is_some(),
    );
    let options = AssemblyOptions {
        retmax: settings.retmax(cli.retmax),
        delay: Duration::from_secs(settings.delay(cli.delay)),
        dry_run: cli.dry_run,
    };

    let mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Console
    };
    let sink: &dyn ProgressSink = match mode {
        OutputMode::Json => &JsonOutput,
        OutputMode::Console => &ConsoleProgress,
    };
    let result = app.run(&filter, &output, &options, sink)?;
    if mode == OutputMode::Json {
        JsonOutput::print_assembly(&result).into_diagnostic()?;
    }
    Ok(ExitCode::SUCCESS)
}
