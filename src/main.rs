//! idrecon CLI
//!
//! Commands:
//!   run        - Full reconciliation run, writes the report workbook
//!   export     - Directory export only
//!   normalize  - Print canonical keys for names
//!   config     - Check, print the schema of, or create the config file

mod cli;

use clap::{Parser, Subcommand, ValueEnum};
use idrecon::{Config, Result, DEFAULT_CONFIG_FILE};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "idrecon",
    version,
    about = "Reconcile employee identities across the directory, the staffing roster and external services"
)]
pub struct Opts {
    /// Config file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Increase verbosity (-v, -vv). Default INFO.
    #[arg(short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Decrease verbosity (-q, -qq)
    #[arg(short = 'q', global = true, action = clap::ArgAction::Count)]
    pub quiet: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Export the directory, compare every source and write the report
    Run(RunArgs),
    /// Run the directory export only
    Export {
        /// Print the export summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the canonical key of each name
    Normalize {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Config file commands
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(clap::Args)]
pub struct RunArgs {
    /// Service ids to process (comma separated, or `all`); prompts when omitted
    #[arg(long, value_delimiter = ',')]
    pub services: Option<Vec<String>>,

    /// Directory categories to compare against; prompts when omitted
    #[arg(long, value_delimiter = ',', value_enum)]
    pub categories: Option<Vec<CategoryArg>>,

    /// Reuse existing listing files instead of running the directory export
    #[arg(long)]
    pub skip_export: bool,

    /// Report workbook path (default: timestamped file in the output directory)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CategoryArg {
    Employees,
    Contractors,
    All,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Validate the config file
    Check {
        #[arg(long)]
        json: bool,
    },
    /// Print a JSON schema (`config` or `report`)
    Schema {
        #[arg(default_value = "config")]
        name: String,
    },
    /// Write the default config
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_tracing(verbosity: i16, log_file: Option<&Path>) {
    // Map -q/-v to tracing levels; default INFO
    let level = match verbosity {
        i16::MIN..=-2 => Level::ERROR,
        -1 => Level::WARN,
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let env_filter = EnvFilter::from_default_env().add_directive(level.into());

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .compact();

    let file_layer = log_file.and_then(open_log).map(|file| {
        fmt::layer()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_target(false)
    });

    // Ignore error if already set in tests or env
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init();
}

fn open_log(path: &Path) -> Option<std::fs::File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = std::fs::create_dir_all(parent) {
            eprintln!("warning: cannot create {}: {}", parent.display(), e);
            return None;
        }
    }
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!("warning: cannot open log file {}: {}", path.display(), e);
            None
        }
    }
}

fn main() -> ExitCode {
    let opts = Opts::parse();
    let verbosity = i16::from(opts.verbose) - i16::from(opts.quiet);

    let result = match opts.command {
        // Config commands work on the file itself and must not require it to load.
        Command::Config { action } => {
            init_tracing(verbosity, None);
            cli::cmd_config(&opts.config, action)
        }
        Command::Normalize { names } => {
            init_tracing(verbosity, None);
            cli::cmd_normalize(&names)
        }
        Command::Run(args) => with_config(&opts.config, verbosity, |config| {
            cli::cmd_run(config, args)
        }),
        Command::Export { json } => with_config(&opts.config, verbosity, |config| {
            cli::cmd_export(config, json)
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}

/// Load the config, then start logging into its output directory.
fn with_config<F>(path: &Path, verbosity: i16, command: F) -> Result<()>
where
    F: FnOnce(&Config) -> Result<()>,
{
    let config = Config::load(path)?;
    init_tracing(verbosity, Some(&config.log_path()));
    command(&config)
}
