//! Drift engine: orchestrates retrieval, diffing, and committing across
//! all 11 domains for one run.
//!
//! Diff-then-commit ordering is mandatory: committing mutates what
//! "latest" means. The fresh text is committed regardless of the diff
//! outcome so the history always reflects the most recent observation.
//! A single domain's retrieval failure never aborts the others; a
//! connectivity-class failure aborts the loop because a half-connected
//! snapshot would be inconsistent.

use tracing::{debug, info, warn};

use confdrift_core::{CheckError, ConfigDomain, DriftVerdict, RunResult, SourceError};
use confdrift_storage::{DiffOutcome, SnapshotStore};

use crate::source::ConfigSource;

pub struct DriftEngine<'a> {
    store: &'a SnapshotStore,
    source: &'a dyn ConfigSource,
}

impl<'a> DriftEngine<'a> {
    pub fn new(store: &'a SnapshotStore, source: &'a dyn ConfigSource) -> Self {
        Self { store, source }
    }

    /// Execute one run. Fatal conditions (connectivity loss, store write
    /// failure) propagate as errors; everything else lands in the result.
    pub fn run(&self) -> Result<RunResult, CheckError> {
        let first_execution = self.store.bootstrap()?;
        let mut run = RunResult::new(first_execution);

        if first_execution {
            info!("first execution, committing baseline snapshots");
            self.baseline(&mut run)?;
            return Ok(run);
        }

        for domain in ConfigDomain::ALL {
            let text = match self.source.fetch(domain) {
                Ok(text) => text,
                Err(e) => {
                    self.record_failure(&mut run, domain, e)?;
                    continue;
                }
            };

            // Diff before commit; commit unconditionally.
            let outcome = self.store.diff(domain, &text)?;
            self.store.commit(domain, &text)?;

            let verdict = match outcome {
                DiffOutcome::Changed => DriftVerdict::Changed,
                // No prior revision (e.g. the policy file was stale on
                // every earlier run): this commit is that domain's
                // baseline, not drift.
                DiffOutcome::Baseline | DiffOutcome::Unchanged => DriftVerdict::Unchanged,
            };
            debug!(domain = domain.id(), ?verdict, "domain processed");
            run.record(domain, verdict);
        }

        Ok(run)
    }

    /// First execution: commit every domain's first snapshot directly as
    /// revision 1, no diffs, baseline verdicts.
    fn baseline(&self, run: &mut RunResult) -> Result<(), CheckError> {
        for domain in ConfigDomain::ALL {
            match self.source.fetch(domain) {
                Ok(text) => {
                    self.store.commit(domain, &text)?;
                    run.record(domain, DriftVerdict::Unchanged);
                }
                Err(e) => self.record_failure(run, domain, e)?,
            }
        }
        Ok(())
    }

    /// Domain-level failures become verdicts and notes; connectivity loss
    /// escalates and skips the remaining domains.
    fn record_failure(
        &self,
        run: &mut RunResult,
        domain: ConfigDomain,
        error: SourceError,
    ) -> Result<(), CheckError> {
        if error.is_connectivity() {
            return Err(error.into());
        }
        warn!(domain = domain.id(), error = %error, "domain retrieval failed, continuing");
        run.record(domain, DriftVerdict::RetrievalFailed);
        run.add_note(error.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    use tempfile::TempDir;

    use confdrift_core::{aggregate, Severity, Target};

    #[derive(Clone)]
    enum Response {
        Text(String),
        Stale,
        Query(String),
        Connectivity,
    }

    struct MockSource {
        responses: HashMap<ConfigDomain, Response>,
        calls: RefCell<Vec<ConfigDomain>>,
    }

    impl MockSource {
        fn uniform(text: &str) -> Self {
            let responses = ConfigDomain::ALL
                .iter()
                .map(|d| (*d, Response::Text(format!("{} {text}", d.id()))))
                .collect();
            Self {
                responses,
                calls: RefCell::new(Vec::new()),
            }
        }

        fn set(&mut self, domain: ConfigDomain, response: Response) {
            self.responses.insert(domain, response);
        }

        fn calls(&self) -> Vec<ConfigDomain> {
            self.calls.borrow().clone()
        }
    }

    impl ConfigSource for MockSource {
        fn fetch(&self, domain: ConfigDomain) -> Result<String, SourceError> {
            self.calls.borrow_mut().push(domain);
            match self.responses.get(&domain).expect("unconfigured domain") {
                Response::Text(text) => Ok(text.clone()),
                Response::Stale => Err(SourceError::Stale { domain }),
                Response::Query(message) => Err(SourceError::Query {
                    domain,
                    message: message.clone(),
                }),
                Response::Connectivity => Err(SourceError::Connectivity {
                    message: "SQL1032N no start database manager command was issued".to_string(),
                }),
            }
        }
    }

    fn store(root: &TempDir) -> SnapshotStore {
        SnapshotStore::open(root.path(), &Target::new("/home/inst1", "SAMPLE"))
    }

    #[test]
    fn test_first_run_commits_one_revision_per_domain() {
        let root = TempDir::new().unwrap();
        let store = store(&root);
        let source = MockSource::uniform("v1");

        let run = DriftEngine::new(&store, &source).run().unwrap();
        assert!(run.first_execution());

        for domain in ConfigDomain::ALL {
            assert_eq!(
                store.revision_count(domain).unwrap(),
                1,
                "{domain} must have exactly one committed revision"
            );
        }

        let alert = aggregate(&run);
        assert_eq!(alert.severity, Severity::Ok);
        assert_eq!(alert.changes, Some(0), "baseline counter");
    }

    #[test]
    fn test_second_identical_run_is_ok_with_sentinel_counter() {
        let root = TempDir::new().unwrap();
        let store = store(&root);
        let source = MockSource::uniform("v1");

        DriftEngine::new(&store, &source).run().unwrap();
        let run = DriftEngine::new(&store, &source).run().unwrap();

        assert!(!run.first_execution());
        let alert = aggregate(&run);
        assert_eq!(alert.severity, Severity::Ok);
        assert_eq!(alert.changes, Some(1));

        // History reflects the newest observation even when identical.
        for domain in ConfigDomain::ALL {
            assert_eq!(store.revision_count(domain).unwrap(), 2);
        }
    }

    #[test]
    fn test_changed_domains_are_named_exactly() {
        let root = TempDir::new().unwrap();
        let store = store(&root);
        let mut source = MockSource::uniform("v1");

        DriftEngine::new(&store, &source).run().unwrap();

        source.set(ConfigDomain::DbConfig, Response::Text("db_cfg v2".into()));
        source.set(ConfigDomain::Tables, Response::Text("tables v2".into()));
        let run = DriftEngine::new(&store, &source).run().unwrap();

        assert_eq!(
            run.changed_domains(),
            vec![ConfigDomain::DbConfig, ConfigDomain::Tables]
        );

        let alert = aggregate(&run);
        assert_eq!(alert.severity, Severity::Warning);
        assert_eq!(alert.changes, Some(3));
        assert!(alert.summary.contains("database configuration"));
        assert!(alert.summary.contains("tables"));
        assert!(!alert.summary.contains("bufferpools"));
    }

    #[test]
    fn test_stale_policy_degrades_only_that_domain() {
        let root = TempDir::new().unwrap();
        let store = store(&root);
        let mut source = MockSource::uniform("v1");

        DriftEngine::new(&store, &source).run().unwrap();

        source.set(ConfigDomain::RunstatsPolicy, Response::Stale);
        let run = DriftEngine::new(&store, &source).run().unwrap();

        let alert = aggregate(&run);
        assert_eq!(alert.severity, Severity::Ok, "staleness is non-fatal");
        assert!(alert.summary.contains("is too old"));

        // Prior committed snapshot left untouched for the stale domain.
        assert_eq!(store.revision_count(ConfigDomain::RunstatsPolicy).unwrap(), 1);
        assert_eq!(store.revision_count(ConfigDomain::DbConfig).unwrap(), 2);
    }

    #[test]
    fn test_query_failure_continues_with_remaining_domains() {
        let root = TempDir::new().unwrap();
        let store = store(&root);
        let mut source = MockSource::uniform("v1");

        DriftEngine::new(&store, &source).run().unwrap();

        source.set(
            ConfigDomain::Bufferpools,
            Response::Query("SQL0204N table not found".into()),
        );
        let run = DriftEngine::new(&store, &source).run().unwrap();

        assert_eq!(source.calls().len(), 22, "all domains attempted in both runs");
        let failed: Vec<_> = run
            .verdicts()
            .iter()
            .filter(|(_, v)| *v == DriftVerdict::RetrievalFailed)
            .collect();
        assert_eq!(failed.len(), 1);

        let alert = aggregate(&run);
        assert_eq!(alert.severity, Severity::Ok);
        assert!(alert.summary.contains("SQL0204N"));
    }

    #[test]
    fn test_connectivity_failure_aborts_remaining_domains() {
        let root = TempDir::new().unwrap();
        let store = store(&root);
        let mut source = MockSource::uniform("v1");

        DriftEngine::new(&store, &source).run().unwrap();
        let calls_after_first = source.calls().len();

        source.set(ConfigDomain::DbConfig, Response::Connectivity);
        let err = DriftEngine::new(&store, &source).run().unwrap_err();
        assert!(matches!(
            err,
            CheckError::Source(SourceError::Connectivity { .. })
        ));

        // Domains before the failure were processed, later ones skipped.
        let second_run_calls = source.calls().len() - calls_after_first;
        assert_eq!(second_run_calls, 3, "stopped at the third domain");

        // Earlier commits of this run are not rolled back.
        assert_eq!(store.revision_count(ConfigDomain::RegistryVariables).unwrap(), 2);
        assert_eq!(store.revision_count(ConfigDomain::Tables).unwrap(), 1);
    }

    #[test]
    fn test_store_write_failure_is_fatal() {
        let root = TempDir::new().unwrap();
        let store = store(&root);
        let source = MockSource::uniform("v1");

        DriftEngine::new(&store, &source).run().unwrap();

        // Squat a directory on one history file so its commit fails.
        let path = store.dir().join(ConfigDomain::Schemas.history_file());
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        let err = DriftEngine::new(&store, &source).run().unwrap_err();
        assert!(matches!(err, CheckError::Store(_)));
    }

    #[test]
    fn test_revision_histories_never_shrink() {
        let root = TempDir::new().unwrap();
        let store = store(&root);
        let mut source = MockSource::uniform("v1");

        DriftEngine::new(&store, &source).run().unwrap();
        let mut previous: HashMap<ConfigDomain, u64> = ConfigDomain::ALL
            .iter()
            .map(|d| (*d, store.revision_count(*d).unwrap()))
            .collect();

        for round in 0..3 {
            if round == 1 {
                source.set(ConfigDomain::Tables, Response::Text("tables v2".into()));
            }
            if round == 2 {
                source.set(ConfigDomain::ReorgPolicy, Response::Stale);
            }
            DriftEngine::new(&store, &source).run().unwrap();
            for domain in ConfigDomain::ALL {
                let count = store.revision_count(domain).unwrap();
                assert!(
                    count >= previous[&domain],
                    "{domain} history shrank in round {round}"
                );
                previous.insert(domain, count);
            }
        }
    }
}
