mod config;
mod report;
mod runner;

use std::path::{Path, PathBuf};
use std::process;

use bindpath_core::{
    DiagnosticOracle, FileSystemProvider, Limits, ShapeCheckOracle, TscOracle,
};
use clap::error::ErrorKind;
use clap::{ArgAction, Parser, ValueEnum};
use tracing::{debug, Level};

use config::{FileConfig, OracleKind};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Check annotated samples against the diagnostics an oracle reports.
#[derive(Parser)]
#[command(
    name = "bindpath",
    version,
    about = "Expectation-driven checker for binding path samples"
)]
struct Cli {
    /// Directory containing the sample files
    dir: PathBuf,

    /// Diagnostic source: the built-in checker or an external tsc
    #[arg(long, value_enum)]
    oracle: Option<OracleKind>,

    /// tsc executable to run with --oracle tsc
    #[arg(long, value_name = "PROGRAM")]
    tsc: Option<String>,

    /// tsconfig passed to tsc as -p
    #[arg(long, value_name = "TSCONFIG")]
    project: Option<PathBuf>,

    /// Sample file extension to collect (repeatable)
    #[arg(long = "extension", value_name = "EXT")]
    extensions: Vec<String>,

    /// Config file (default: <DIR>/bindpath.toml when present)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long)]
    quiet: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

/// Settings after merging the config file under the command line.
struct Settings {
    oracle: OracleKind,
    extensions: Vec<String>,
    tsc_program: String,
    tsc_project: Option<PathBuf>,
    limits: Limits,
}

impl Settings {
    fn merge(cli: &Cli, file: FileConfig) -> Settings {
        let oracle = cli
            .oracle
            .or(file.runner.oracle)
            .unwrap_or(OracleKind::Builtin);
        let extensions = if !cli.extensions.is_empty() {
            cli.extensions.clone()
        } else {
            file.runner
                .extensions
                .unwrap_or_else(|| vec![oracle.default_extension().to_owned()])
        };
        let mut limits = Limits::default();
        if let Some(max) = file.limits.max_union_members {
            limits.max_union_members = max;
        }
        Settings {
            oracle,
            extensions: extensions
                .into_iter()
                .map(|e| e.trim_start_matches('.').to_owned())
                .collect(),
            tsc_program: cli
                .tsc
                .clone()
                .or(file.tsc.program)
                .unwrap_or_else(|| "tsc".to_owned()),
            tsc_project: cli.project.clone().or(file.tsc.project),
            limits,
        }
    }

    fn oracle(&self) -> Box<dyn DiagnosticOracle> {
        match self.oracle {
            OracleKind::Builtin => Box::new(ShapeCheckOracle::with_limits(
                FileSystemProvider,
                self.limits,
            )),
            OracleKind::Tsc => Box::new(TscOracle::new(
                self.tsc_program.clone(),
                self.tsc_project.clone(),
            )),
        }
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            process::exit(code);
        }
    };

    init_logging(cli.verbose, cli.quiet);
    cmd_check(&cli);
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::ERROR,
        (false, 0) => Level::WARN,
        (false, 1) => Level::INFO,
        (false, 2) => Level::DEBUG,
        _ => Level::TRACE,
    };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn cmd_check(cli: &Cli) {
    let dir: &Path = &cli.dir;
    if !dir.is_dir() {
        report_error(
            &format!("The provided path \"{}\" is not a valid directory.", dir.display()),
            cli.output,
            false,
        );
        process::exit(1);
    }

    let file_config = match FileConfig::load(cli.config.as_deref(), dir) {
        Ok(c) => c,
        Err(e) => {
            report_error(&format!("error: {}", e), cli.output, cli.quiet);
            process::exit(1);
        }
    };
    let settings = Settings::merge(cli, file_config);
    debug!(oracle = ?settings.oracle, extensions = ?settings.extensions, "settings resolved");

    let files = match runner::discover(dir, &settings.extensions) {
        Ok(f) => f,
        Err(e) => {
            report_error(&format!("error: {}", e), cli.output, cli.quiet);
            process::exit(1);
        }
    };

    let oracle = settings.oracle();
    let outcome = match runner::run(&files, oracle.as_ref()) {
        Ok(o) => o,
        Err(e) => {
            report_error(&format!("error: {}", e), cli.output, cli.quiet);
            process::exit(1);
        }
    };

    match cli.output {
        OutputFormat::Text => {
            if !cli.quiet {
                print!("{}", report::TextReport(&outcome));
            }
        }
        OutputFormat::Json => {
            let value = report::render_json(&outcome);
            match serde_json::to_string_pretty(&value) {
                Ok(s) => println!("{}", s),
                Err(e) => {
                    report_error(&format!("error: {}", e), cli.output, cli.quiet);
                    process::exit(1);
                }
            }
        }
    }

    process::exit(outcome.digest.status_code);
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
