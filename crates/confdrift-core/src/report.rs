//! Per-run verdicts, the run result accumulator, and alert aggregation.
//!
//! The engine threads one `RunResult` through the domain loop and returns
//! it once; `aggregate` then reduces it to the single `AlertResult` the
//! plugin prints. Fatal conditions never reach `aggregate` — they are
//! propagated as `CheckError` and mapped to unknown by the caller.

use crate::domains::ConfigDomain;

/// Per-domain result of one run. Ephemeral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftVerdict {
    Unchanged,
    Changed,
    RetrievalFailed,
}

/// Accumulates per-domain verdicts and non-fatal notes for one run.
/// Allows partial observability: a failed domain never hides the others.
#[derive(Debug, Default)]
pub struct RunResult {
    first_execution: bool,
    verdicts: Vec<(ConfigDomain, DriftVerdict)>,
    notes: Vec<String>,
}

impl RunResult {
    pub fn new(first_execution: bool) -> Self {
        Self {
            first_execution,
            verdicts: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// True when this run bootstrapped the target's store.
    pub fn first_execution(&self) -> bool {
        self.first_execution
    }

    /// Record the verdict for a domain.
    pub fn record(&mut self, domain: ConfigDomain, verdict: DriftVerdict) {
        self.verdicts.push((domain, verdict));
    }

    /// Append a non-fatal informational note (stale policy file, failed
    /// retrieval of a single domain).
    pub fn add_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    pub fn verdicts(&self) -> &[(ConfigDomain, DriftVerdict)] {
        &self.verdicts
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    /// Changed domains in fixed domain order.
    pub fn changed_domains(&self) -> Vec<ConfigDomain> {
        ConfigDomain::ALL
            .iter()
            .copied()
            .filter(|d| {
                self.verdicts
                    .iter()
                    .any(|(vd, v)| vd == d && *v == DriftVerdict::Changed)
            })
            .collect()
    }
}

/// Overall severity, Nagios convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl Severity {
    pub fn exit_code(&self) -> u8 {
        match self {
            Severity::Ok => 0,
            Severity::Warning => 1,
            Severity::Critical => 2,
            Severity::Unknown => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Severity::Ok => "OK",
            Severity::Warning => "WARNING",
            Severity::Critical => "CRITICAL",
            Severity::Unknown => "UNKNOWN",
        }
    }
}

/// Final result of a run: severity, summary text, and the drift counter
/// emitted as performance data (`None` on unknown).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertResult {
    pub severity: Severity,
    pub summary: String,
    pub changes: Option<u64>,
}

impl AlertResult {
    /// Result for a fatal error: unknown, no counter, error text as summary.
    pub fn unknown(summary: impl Into<String>) -> Self {
        Self {
            severity: Severity::Unknown,
            summary: summary.into(),
            changes: None,
        }
    }
}

/// Baseline counter reported on the first execution.
const BASELINE_CHANGES: u64 = 0;
/// Sentinel counter meaning "no drift" on subsequent runs.
const NO_DRIFT_CHANGES: u64 = 1;

/// Reduce a run's verdicts into the overall alert.
///
/// - first execution: ok, baseline counter;
/// - all unchanged: ok, counter 1;
/// - any changed: warning, counter 1 + changed count, summary names every
///   changed domain in fixed domain order;
/// - retrieval failures alone never raise the severity, they only append
///   notes.
pub fn aggregate(run: &RunResult) -> AlertResult {
    let (severity, mut summary, changes) = if run.first_execution() {
        (
            Severity::Ok,
            "first execution, baseline snapshots committed".to_string(),
            BASELINE_CHANGES,
        )
    } else {
        let changed = run.changed_domains();
        if changed.is_empty() {
            (
                Severity::Ok,
                "no configuration changes since last run".to_string(),
                NO_DRIFT_CHANGES,
            )
        } else {
            let names: Vec<&str> = changed.iter().map(|d| d.display_name()).collect();
            (
                Severity::Warning,
                format!("configuration changed: {}", names.join(", ")),
                NO_DRIFT_CHANGES + changed.len() as u64,
            )
        }
    };

    // Error text is carried in the summary field, not raised structurally.
    for note in run.notes() {
        summary.push_str(", ");
        summary.push_str(note);
    }

    AlertResult {
        severity,
        summary,
        changes: Some(changes),
    }
}
