//! check_confdrift entry point: parse arguments, take the execution lock,
//! run the drift engine, print one Nagios line, exit 0/1/2/3.

use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use confdrift_cli::args::Args;
use confdrift_cli::engine::DriftEngine;
use confdrift_cli::output;
use confdrift_cli::source::ClientSource;
use confdrift_core::{
    aggregate, AlertResult, CheckConfig, CheckError, CliOverrides, Severity, Target,
};
use confdrift_storage::{signature, ExecutionLock, SnapshotStore};

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            // Help/version text is not a check result.
            print!("{e}");
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            // Usage errors map to unknown, before any side effect.
            println!(
                "{} - {}",
                Severity::Unknown.label(),
                e.to_string().lines().next().unwrap_or("invalid arguments")
            );
            return ExitCode::from(Severity::Unknown.exit_code());
        }
    };

    let target = Target::new(args.instance.clone(), args.database.clone());
    let alert = match run(&args, &target) {
        Ok(alert) => alert,
        Err(e) => AlertResult::unknown(e.to_string()),
    };

    println!("{}", output::render(&alert, &target, args.mk));
    ExitCode::from(alert.severity.exit_code())
}

fn run(args: &Args, target: &Target) -> Result<AlertResult, CheckError> {
    let config = CheckConfig::load(Some(&CliOverrides {
        store_root: args.directory.clone(),
    }))?;
    init_tracing(args, &config);

    // Local validation first: no lock, no snapshot, no side effects.
    ClientSource::validate_instance(target)?;

    let lock = ExecutionLock::new(&config.lock_dir);
    let parts = args.signature_parts(&config.store_root);
    let parts: Vec<&str> = parts.iter().map(String::as_str).collect();
    let guard = lock.acquire(&signature(&parts))?;

    let store = SnapshotStore::open(&config.store_root, target);
    let source = ClientSource::new(target, &config, store.dir().to_path_buf());
    source.validate_catalog()?;

    let run = DriftEngine::new(&store, &source).run()?;
    guard.release();

    Ok(aggregate(&run))
}

/// Stderr diagnostics at the `-v` ladder level, or the full trace appended
/// to the trace log under the store root when `-T` is given.
fn init_tracing(args: &Args, config: &CheckConfig) {
    if args.trace {
        let _ = std::fs::create_dir_all(&config.store_root);
        let path = config.store_root.join("check_confdrift.trace");
        if let Ok(file) = std::fs::OpenOptions::new().create(true).append(true).open(&path) {
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::new("trace"))
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
            return;
        }
        eprintln!("could not open trace log {}, tracing to stderr", path.display());
    }

    let level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();
}
