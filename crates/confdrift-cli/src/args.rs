//! Command-line surface, uniform across the check family.

use std::path::{Path, PathBuf};

use clap::Parser;

/// Configuration drift check for a database instance.
#[derive(Debug, Parser)]
#[command(
    name = "check_confdrift",
    version,
    about = "Checks one (instance, database) pair for configuration drift \
             against the previously stored snapshots"
)]
pub struct Args {
    /// Target instance root directory.
    #[arg(short = 'i', long = "instance", value_name = "PATH")]
    pub instance: PathBuf,

    /// Database name within the instance.
    #[arg(short = 'd', long = "database", value_name = "NAME")]
    pub database: String,

    /// Snapshot store root (defaults to a fixed temp location).
    #[arg(short = 'D', long = "directory", value_name = "PATH")]
    pub directory: Option<PathBuf>,

    /// Emit the alternate single-line (check_mk) output format.
    #[arg(short = 'K', long = "mk")]
    pub mk: bool,

    /// Append the full run trace to the trace log under the store root.
    #[arg(short = 'T', long = "trace")]
    pub trace: bool,

    /// Increase diagnostic output on stderr (repeatable).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// All invocation parameters, in order, for the lock signature.
    /// Distinct parameter sets must yield distinct signatures.
    pub fn signature_parts(&self, store_root: &Path) -> Vec<String> {
        let mut parts = vec![
            self.instance.to_string_lossy().into_owned(),
            self.database.clone(),
            store_root.to_string_lossy().into_owned(),
        ];
        if self.mk {
            parts.push("mk".to_string());
        }
        if self.trace {
            parts.push("trace".to_string());
        }
        if self.verbose > 0 {
            parts.push(format!("v{}", self.verbose));
        }
        parts
    }
}
