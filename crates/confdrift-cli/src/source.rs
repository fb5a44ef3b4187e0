//! Configuration retrieval from the monitored system.
//!
//! `ConfigSource` is the seam the drift engine works against; the
//! production implementation invokes the external database client with one
//! read-only command per domain. The four policy domains are exported
//! asynchronously by the monitored system into a shared drop directory
//! and fetched through the freshness poller.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, warn};

use confdrift_core::{CheckConfig, ConfigDomain, SourceError, Target};
use confdrift_storage::{PolicyFetch, PolicyPoller};

/// Named retrieval operations against the live system.
pub trait ConfigSource {
    /// Current text representation of one configuration domain.
    fn fetch(&self, domain: ConfigDomain) -> Result<String, SourceError>;
}

/// Output markers the client emits when the instance itself is
/// unreachable, as opposed to a single query failing.
const CONNECTIVITY_MARKERS: [&str; 4] = ["SQL1032N", "SQL1031N", "SQL30081N", "SQL1224N"];

/// Profile marker that a valid instance root must contain.
const PROFILE_MARKER: &str = "sqllib/db2profile";

/// Production source backed by the external database client.
pub struct ClientSource<'a> {
    target: &'a Target,
    config: &'a CheckConfig,
    /// Target's store directory; fresh policy files are copied in here.
    store_dir: PathBuf,
    poller: PolicyPoller,
}

enum ClientFailure {
    /// Connectivity-class: client missing or instance unreachable.
    Unreachable(String),
    /// The command ran but the query failed.
    Failed(String),
}

impl<'a> ClientSource<'a> {
    pub fn new(target: &'a Target, config: &'a CheckConfig, store_dir: PathBuf) -> Self {
        let poller = PolicyPoller::new(
            &config.policy_drop_dir,
            config.freshness_window(),
            config.poll_interval(),
            config.poll_deadline(),
        );
        Self {
            target,
            config,
            store_dir,
            poller,
        }
    }

    /// Check the instance path for the client profile marker. Local, no
    /// side effects; runs before the execution lock is taken.
    pub fn validate_instance(target: &Target) -> Result<(), SourceError> {
        if target.instance().join(PROFILE_MARKER).is_file() {
            Ok(())
        } else {
            Err(SourceError::InstanceInvalid {
                path: target.instance().display().to_string(),
            })
        }
    }

    /// Check that the database appears in the client's catalog listing.
    pub fn validate_catalog(&self) -> Result<(), SourceError> {
        let listing = match self.run_client(&["list", "database", "directory"]) {
            Ok(listing) => listing,
            Err(ClientFailure::Unreachable(message)) => {
                return Err(SourceError::Connectivity { message })
            }
            // A failing listing means no catalog to find the database in.
            Err(ClientFailure::Failed(_)) => String::new(),
        };
        if catalog_contains(&listing, self.target.database()) {
            Ok(())
        } else {
            Err(SourceError::DatabaseNotCataloged {
                database: self.target.database().to_string(),
            })
        }
    }

    fn run_client(&self, args: &[&str]) -> Result<String, ClientFailure> {
        self.run_program(&self.config.client_command, args)
    }

    fn run_program(&self, program: &str, args: &[&str]) -> Result<String, ClientFailure> {
        debug!(program, ?args, "invoking client");
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| ClientFailure::Unreachable(format!("{program}: {e}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if output.status.success() {
            return Ok(stdout);
        }

        let mut message = stdout;
        message.push_str(&String::from_utf8_lossy(&output.stderr));
        let message = message.trim().to_string();
        if CONNECTIVITY_MARKERS.iter().any(|m| message.contains(m)) {
            Err(ClientFailure::Unreachable(message))
        } else {
            Err(ClientFailure::Failed(message))
        }
    }

    /// Ask the monitored system to export a policy file, then poll the
    /// drop directory for a fresh copy and move it into the store.
    fn fetch_policy(&self, domain: ConfigDomain) -> Result<String, SourceError> {
        let kind = domain.policy_kind().ok_or_else(|| SourceError::Query {
            domain,
            message: "not a policy domain".to_string(),
        })?;
        let file_name = domain.policy_file().ok_or_else(|| SourceError::Query {
            domain,
            message: "not a policy domain".to_string(),
        })?;

        let statement =
            format!("call sysproc.automaint_get_policyfile('{kind}', '{file_name}')");
        if let Err(failure) = self.run_client(&["-x", &statement]) {
            return Err(self.domain_error(domain, failure));
        }

        match self.poller.wait_for_fresh(file_name) {
            PolicyFetch::Fresh(path) => self.claim_policy_file(domain, &path, file_name),
            PolicyFetch::Stale => Err(SourceError::Stale { domain }),
        }
    }

    /// Copy a fresh policy file into the target's store directory and
    /// return its text.
    fn claim_policy_file(
        &self,
        domain: ConfigDomain,
        path: &Path,
        file_name: &str,
    ) -> Result<String, SourceError> {
        let text = std::fs::read_to_string(path).map_err(|e| SourceError::Query {
            domain,
            message: format!("{}: {e}", path.display()),
        })?;
        if let Err(e) = std::fs::copy(path, self.store_dir.join(file_name)) {
            // The snapshot text is already in hand; a failed copy only
            // loses the side file.
            warn!(domain = domain.id(), error = %e, "could not copy policy file into store");
        }
        Ok(text)
    }

    fn domain_error(&self, domain: ConfigDomain, failure: ClientFailure) -> SourceError {
        match failure {
            ClientFailure::Unreachable(message) => SourceError::Connectivity { message },
            ClientFailure::Failed(message) => SourceError::Query { domain, message },
        }
    }
}

impl ConfigSource for ClientSource<'_> {
    fn fetch(&self, domain: ConfigDomain) -> Result<String, SourceError> {
        if domain.is_policy() {
            return self.fetch_policy(domain);
        }

        let database = self.target.database();
        let result = match domain {
            // Registry variables come from the companion settings tool.
            ConfigDomain::RegistryVariables => {
                let program = format!("{}set", self.config.client_command);
                self.run_program(&program, &["-all"])
            }
            ConfigDomain::DbmConfig => self.run_client(&["get", "dbm", "cfg"]),
            ConfigDomain::DbConfig => self.run_client(&["get", "db", "cfg", "for", database]),
            ConfigDomain::Bufferpools => self.run_client(&[
                "-x",
                "select bpname, npages, pagesize from syscat.bufferpools order by bpname",
            ]),
            ConfigDomain::Tablespaces => self.run_client(&[
                "-x",
                "select tbspace, tbspacetype, datatype from syscat.tablespaces order by tbspace",
            ]),
            ConfigDomain::Schemas => self.run_client(&[
                "-x",
                "select schemaname, owner from syscat.schemata order by schemaname",
            ]),
            ConfigDomain::Tables => self.run_client(&[
                "-x",
                "select tabschema, tabname, type from syscat.tables order by tabschema, tabname",
            ]),
            // Handled above.
            _ => unreachable!("policy domains take the poller path"),
        };

        result.map_err(|failure| self.domain_error(domain, failure))
    }
}

/// True when the catalog listing names `database` (case-insensitive).
/// Listing lines look like `Database alias = SAMPLE`.
pub fn catalog_contains(listing: &str, database: &str) -> bool {
    listing.lines().any(|line| {
        line.split_once('=')
            .map(|(key, value)| {
                key.to_ascii_lowercase().contains("alias")
                    && value.trim().eq_ignore_ascii_case(database)
            })
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const LISTING: &str = "\
 Database 1 entry:

 Database alias                       = SAMPLE
 Database name                        = SAMPLE
 Local database directory             = /home/inst1

 Database 2 entry:

 Database alias                       = PAYROLL
 Database name                        = PAYROLL
";

    #[test]
    fn test_catalog_contains_matches_alias_case_insensitively() {
        assert!(catalog_contains(LISTING, "SAMPLE"));
        assert!(catalog_contains(LISTING, "payroll"));
        assert!(!catalog_contains(LISTING, "MISSING"));
    }

    #[test]
    fn test_catalog_does_not_match_on_unrelated_lines() {
        // "/home/inst1" sits on a directory line, not an alias line.
        assert!(!catalog_contains(LISTING, "/home/inst1"));
    }

    #[test]
    fn test_validate_instance_requires_profile_marker() {
        let dir = TempDir::new().unwrap();
        let target = Target::new(dir.path(), "SAMPLE");

        let err = ClientSource::validate_instance(&target).unwrap_err();
        assert_eq!(err.to_string(), "Instance directory is invalid.");

        std::fs::create_dir_all(dir.path().join("sqllib")).unwrap();
        std::fs::write(dir.path().join("sqllib").join("db2profile"), "# profile").unwrap();
        assert!(ClientSource::validate_instance(&target).is_ok());
    }
}
