//! cfgvault command line: one backup run over the configured inventory.
//!
//! # Usage
//!
//! ```bash
//! cfgvault --config /etc/cfgvault/config.toml --backup
//! ```
//!
//! Exit status is 0 when at least one device was backed up, 1 when none
//! was, 2 when the run could not start and 64 on bad arguments.

use std::env;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use cfgvault::config::LoggingConfig;
use cfgvault::error::ConfigError;
use cfgvault::{AppConfig, BackupRun, Inventory, RunSummary};
use log::{error, info};

const USAGE: &str = "\
Usage: cfgvault [--config <path>] --backup

Options:
  -c, --config <path>  Configuration file (default: config.toml)
  -b, --backup         Back up every device in the inventory
      --help           Print this help";

const EXIT_NO_BACKUP: u8 = 1;
const EXIT_FATAL: u8 = 2;
const EXIT_USAGE: u8 = 64;

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::parse(env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("error: {message}\n\n{USAGE}");
            return ExitCode::from(EXIT_USAGE);
        }
    };

    if args.help {
        println!("{USAGE}");
        return ExitCode::SUCCESS;
    }
    if !args.backup {
        eprintln!("{USAGE}");
        return ExitCode::from(EXIT_USAGE);
    }

    match run(&args.config).await {
        Ok(summary) => {
            print!("{summary}");
            if summary.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_NO_BACKUP)
            }
        }
        Err(e) => {
            error!("{e}");
            eprintln!("error: {e}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

async fn run(config_path: &Path) -> Result<RunSummary, cfgvault::Error> {
    let config = AppConfig::load(config_path)?;
    init_logging(&config.logging)?;
    info!("configuration loaded from {}", config_path.display());

    let inventory = Inventory::load(&config.application.devices_path)?;
    info!(
        "{} devices to back up, {} rejected",
        inventory.len(),
        inventory.rejected.len()
    );

    BackupRun::from_config(&config).execute(inventory).await
}

/// Initialise env_logger at the configured level; `RUST_LOG` still wins.
fn init_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(logging.level_filter());
    builder.parse_env(env_logger::Env::default());

    if let Some(path) = &logging.file_path {
        let create_error = |source| ConfigError::CreateDir {
            key: "logging.file_path",
            path: path.clone(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(create_error)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(create_error)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    // A logger installed earlier (e.g. by a test harness) is kept.
    let _ = builder.try_init();
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
struct Args {
    config: PathBuf,
    backup: bool,
    help: bool,
}

impl Args {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, String> {
        let mut config = PathBuf::from("config.toml");
        let mut backup = false;
        let mut help = false;

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => {
                    let path = args
                        .next()
                        .ok_or_else(|| format!("{arg} needs a path"))?;
                    config = PathBuf::from(path);
                }
                "--backup" | "-b" => backup = true,
                "--help" | "-h" => {
                    help = true;
                    break;
                }
                other => return Err(format!("unknown argument '{other}'")),
            }
        }

        Ok(Self {
            config,
            backup,
            help,
        })
    }
}
