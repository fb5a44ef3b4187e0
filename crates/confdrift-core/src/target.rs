//! The monitored target: one (instance, database) pair.

use std::path::{Path, PathBuf};

/// Identifies the (instance, database) pair under test. Immutable for the
/// run; determines the snapshot store's per-target directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    instance: PathBuf,
    database: String,
}

impl Target {
    pub fn new(instance: impl Into<PathBuf>, database: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
            database: database.into(),
        }
    }

    /// Instance root path.
    pub fn instance(&self) -> &Path {
        &self.instance
    }

    /// Database name.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Store directory key: `<instance>_<database>` with path-hazard
    /// characters removed so it is safe as a file system name.
    pub fn store_key(&self) -> String {
        format!(
            "{}_{}",
            sanitize(&self.instance.to_string_lossy()),
            sanitize(&self.database)
        )
    }
}

/// Strip whitespace and path-hazard characters (`/ \ : * |`) so the result
/// can be embedded in a file name. Used for the store key and the lock
/// signature.
pub fn sanitize(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '/' | '\\' | ':' | '*' | '|'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_hazard_characters() {
        assert_eq!(sanitize("/home/db2inst1"), "homedb2inst1");
        assert_eq!(sanitize("a\\b:c*d|e f\tg"), "abcdefg");
        assert_eq!(sanitize("plain"), "plain");
    }

    #[test]
    fn test_store_key_combines_instance_and_database() {
        let target = Target::new("/home/db2inst1", "SAMPLE");
        assert_eq!(target.store_key(), "homedb2inst1_SAMPLE");
    }

    #[test]
    fn test_distinct_targets_have_distinct_keys() {
        let a = Target::new("/home/db2inst1", "SAMPLE");
        let b = Target::new("/home/db2inst1", "OTHER");
        assert_ne!(a.store_key(), b.store_key());
    }
}
