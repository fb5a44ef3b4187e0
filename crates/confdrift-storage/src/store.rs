//! Snapshot store — per-target, append-only revision history per domain.
//!
//! Each domain owns one history file under the target's store directory.
//! Records are length-prefixed so snapshot text needs no escaping:
//!
//! ```text
//! %%% rev=<n> len=<bytes> xxh3=<hex> at=<epoch-secs>
//! <exactly len bytes of snapshot text>
//! ```
//!
//! Histories are never truncated or rewritten. `diff` must be called
//! before `commit` for the same domain: committing mutates what "latest"
//! means.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;
use xxhash_rust::xxh3::xxh3_64;

use confdrift_core::errors::StoreError;
use confdrift_core::{ConfigDomain, Target};

const RECORD_MARKER: &str = "%%% ";

/// Outcome of diffing fresh text against the latest committed revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffOutcome {
    /// No committed revision exists for this domain yet.
    Baseline,
    /// Byte-identical to the latest committed revision.
    Unchanged,
    /// Differs from the latest committed revision.
    Changed,
}

/// Revision history store for one target.
pub struct SnapshotStore {
    dir: PathBuf,
}

struct Record {
    revision: u64,
    hash: u64,
    content: Vec<u8>,
}

impl SnapshotStore {
    /// Bind a store to the target's directory under `store_root`.
    /// Nothing is created until [`SnapshotStore::bootstrap`] runs.
    pub fn open(store_root: &Path, target: &Target) -> Self {
        Self {
            dir: store_root.join(target.store_key()),
        }
    }

    /// Create the target's storage root if absent. Returns `true` when the
    /// root did not exist before — the "first execution" condition.
    pub fn bootstrap(&self) -> Result<bool, StoreError> {
        let first_execution = !self.dir.is_dir();
        std::fs::create_dir_all(&self.dir).map_err(|e| StoreError::Io {
            path: self.dir.display().to_string(),
            message: e.to_string(),
        })?;
        if first_execution {
            debug!(dir = %self.dir.display(), "bootstrapped snapshot store");
        }
        Ok(first_execution)
    }

    /// The target's store directory (policy files are copied in here).
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn history_path(&self, domain: ConfigDomain) -> PathBuf {
        self.dir.join(domain.history_file())
    }

    /// Compare `text` against the latest committed revision for `domain`.
    pub fn diff(&self, domain: ConfigDomain, text: &str) -> Result<DiffOutcome, StoreError> {
        let (_, last) = self.scan(domain)?;
        let Some(last) = last else {
            return Ok(DiffOutcome::Baseline);
        };
        // Hash and length as fast pre-check; byte comparison stays
        // authoritative on a hash match.
        if last.content.len() != text.len() || last.hash != xxh3_64(text.as_bytes()) {
            return Ok(DiffOutcome::Changed);
        }
        if last.content == text.as_bytes() {
            Ok(DiffOutcome::Unchanged)
        } else {
            Ok(DiffOutcome::Changed)
        }
    }

    /// Append `text` as the new latest revision for `domain`.
    /// Returns the new revision number (1-based).
    pub fn commit(&self, domain: ConfigDomain, text: &str) -> Result<u64, StoreError> {
        let path = self.history_path(domain);
        let (count, _) = self.scan(domain)?;
        let revision = count + 1;

        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let header = format!(
            "{RECORD_MARKER}rev={revision} len={} xxh3={:016x} at={now}\n",
            text.len(),
            xxh3_64(text.as_bytes()),
        );

        let io_err = |e: std::io::Error| StoreError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(io_err)?;
        file.write_all(header.as_bytes()).map_err(io_err)?;
        file.write_all(text.as_bytes()).map_err(io_err)?;
        file.write_all(b"\n").map_err(io_err)?;
        file.sync_all().map_err(io_err)?;

        debug!(domain = domain.id(), revision, bytes = text.len(), "committed snapshot");
        Ok(revision)
    }

    /// Latest committed revision text, if any.
    pub fn latest(&self, domain: ConfigDomain) -> Result<Option<String>, StoreError> {
        let (_, last) = self.scan(domain)?;
        match last {
            None => Ok(None),
            Some(record) => {
                let path = self.history_path(domain);
                let text = String::from_utf8(record.content).map_err(|e| {
                    StoreError::CorruptHistory {
                        path: path.display().to_string(),
                        message: format!("revision {} is not UTF-8: {e}", record.revision),
                    }
                })?;
                Ok(Some(text))
            }
        }
    }

    /// Number of committed revisions for `domain`.
    pub fn revision_count(&self, domain: ConfigDomain) -> Result<u64, StoreError> {
        let (count, _) = self.scan(domain)?;
        Ok(count)
    }

    /// Walk the history file, returning the record count and the last record.
    fn scan(&self, domain: ConfigDomain) -> Result<(u64, Option<Record>), StoreError> {
        let path = self.history_path(domain);
        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok((0, None)),
            Err(e) => {
                return Err(StoreError::Io {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })
            }
        };

        let corrupt = |message: String| StoreError::CorruptHistory {
            path: path.display().to_string(),
            message,
        };

        let mut count = 0u64;
        let mut last = None;
        let mut pos = 0usize;
        while pos < data.len() {
            let line_end = data[pos..]
                .iter()
                .position(|&b| b == b'\n')
                .map(|i| pos + i)
                .ok_or_else(|| corrupt(format!("unterminated header at offset {pos}")))?;
            let header = std::str::from_utf8(&data[pos..line_end])
                .map_err(|_| corrupt(format!("non-UTF-8 header at offset {pos}")))?;
            let record = parse_header(header)
                .ok_or_else(|| corrupt(format!("bad header at offset {pos}: {header:?}")))?;

            let start = line_end + 1;
            let end = start + record.len;
            if end + 1 > data.len() {
                return Err(corrupt(format!(
                    "revision {} truncated (expected {} bytes)",
                    record.revision, record.len
                )));
            }
            if data[end] != b'\n' {
                return Err(corrupt(format!(
                    "revision {} missing record separator",
                    record.revision
                )));
            }

            count += 1;
            last = Some(Record {
                revision: record.revision,
                hash: record.hash,
                content: data[start..end].to_vec(),
            });
            pos = end + 1;
        }

        Ok((count, last))
    }
}

struct Header {
    revision: u64,
    len: usize,
    hash: u64,
}

/// Parse `%%% rev=<n> len=<bytes> xxh3=<hex> at=<epoch>`.
fn parse_header(line: &str) -> Option<Header> {
    let rest = line.strip_prefix(RECORD_MARKER)?;
    let mut revision = None;
    let mut len = None;
    let mut hash = None;
    for field in rest.split_whitespace() {
        let (key, value) = field.split_once('=')?;
        match key {
            "rev" => revision = value.parse::<u64>().ok(),
            "len" => len = value.parse::<usize>().ok(),
            "xxh3" => hash = u64::from_str_radix(value, 16).ok(),
            "at" => {}
            _ => return None,
        }
    }
    Some(Header {
        revision: revision?,
        len: len?,
        hash: hash?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(root: &TempDir) -> SnapshotStore {
        let target = Target::new("/home/inst1", "SAMPLE");
        SnapshotStore::open(root.path(), &target)
    }

    #[test]
    fn test_bootstrap_reports_first_execution_once() {
        let root = TempDir::new().unwrap();
        let store = store(&root);
        assert!(store.bootstrap().unwrap(), "fresh root is first execution");
        assert!(!store.bootstrap().unwrap(), "second bootstrap is not");
    }

    #[test]
    fn test_diff_without_history_is_baseline() {
        let root = TempDir::new().unwrap();
        let store = store(&root);
        store.bootstrap().unwrap();
        let outcome = store.diff(ConfigDomain::DbConfig, "LOGFILSIZ = 1024").unwrap();
        assert_eq!(outcome, DiffOutcome::Baseline);
    }

    #[test]
    fn test_commit_then_diff_identical_is_unchanged() {
        let root = TempDir::new().unwrap();
        let store = store(&root);
        store.bootstrap().unwrap();
        store.commit(ConfigDomain::DbConfig, "LOGFILSIZ = 1024").unwrap();
        let outcome = store.diff(ConfigDomain::DbConfig, "LOGFILSIZ = 1024").unwrap();
        assert_eq!(outcome, DiffOutcome::Unchanged);
    }

    #[test]
    fn test_diff_detects_changed_text() {
        let root = TempDir::new().unwrap();
        let store = store(&root);
        store.bootstrap().unwrap();
        store.commit(ConfigDomain::DbConfig, "LOGFILSIZ = 1024").unwrap();
        let outcome = store.diff(ConfigDomain::DbConfig, "LOGFILSIZ = 4096").unwrap();
        assert_eq!(outcome, DiffOutcome::Changed);
    }

    #[test]
    fn test_history_is_append_only_and_latest_wins() {
        let root = TempDir::new().unwrap();
        let store = store(&root);
        store.bootstrap().unwrap();

        assert_eq!(store.commit(ConfigDomain::Tables, "rev one").unwrap(), 1);
        assert_eq!(store.commit(ConfigDomain::Tables, "rev two").unwrap(), 2);
        assert_eq!(store.commit(ConfigDomain::Tables, "rev three").unwrap(), 3);

        assert_eq!(store.revision_count(ConfigDomain::Tables).unwrap(), 3);
        assert_eq!(store.latest(ConfigDomain::Tables).unwrap().unwrap(), "rev three");
    }

    #[test]
    fn test_snapshot_text_containing_marker_lines_round_trips() {
        let root = TempDir::new().unwrap();
        let store = store(&root);
        store.bootstrap().unwrap();

        // Length framing must protect content that looks like a header.
        let tricky = "%%% rev=9 len=0 xxh3=0 at=0\nreal content\n";
        store.commit(ConfigDomain::Schemas, tricky).unwrap();
        assert_eq!(store.latest(ConfigDomain::Schemas).unwrap().unwrap(), tricky);
        assert_eq!(
            store.diff(ConfigDomain::Schemas, tricky).unwrap(),
            DiffOutcome::Unchanged
        );
    }

    #[test]
    fn test_empty_snapshot_is_a_valid_revision() {
        let root = TempDir::new().unwrap();
        let store = store(&root);
        store.bootstrap().unwrap();
        store.commit(ConfigDomain::Bufferpools, "").unwrap();
        assert_eq!(store.latest(ConfigDomain::Bufferpools).unwrap().unwrap(), "");
        assert_eq!(
            store.diff(ConfigDomain::Bufferpools, "").unwrap(),
            DiffOutcome::Unchanged
        );
    }

    #[test]
    fn test_domains_have_independent_histories() {
        let root = TempDir::new().unwrap();
        let store = store(&root);
        store.bootstrap().unwrap();
        store.commit(ConfigDomain::Tables, "tables").unwrap();
        assert_eq!(store.revision_count(ConfigDomain::Schemas).unwrap(), 0);
        assert!(store.latest(ConfigDomain::Schemas).unwrap().is_none());
    }

    #[test]
    fn test_truncated_history_is_reported_corrupt() {
        let root = TempDir::new().unwrap();
        let store = store(&root);
        store.bootstrap().unwrap();
        let path = store.dir().join(ConfigDomain::Tables.history_file());
        std::fs::write(&path, "%%% rev=1 len=100 xxh3=0 at=0\nshort\n").unwrap();
        let err = store.latest(ConfigDomain::Tables).unwrap_err();
        assert!(matches!(err, StoreError::CorruptHistory { .. }));
    }

    #[test]
    fn test_commit_failure_surfaces_as_io_error() {
        let root = TempDir::new().unwrap();
        let store = store(&root);
        store.bootstrap().unwrap();
        // A directory squatting on the history path makes the append fail.
        std::fs::create_dir(store.dir().join(ConfigDomain::Tables.history_file())).unwrap();
        let err = store.commit(ConfigDomain::Tables, "text").unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }
}
