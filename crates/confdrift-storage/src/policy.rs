//! Freshness polling for asynchronously produced policy files.
//!
//! The monitored system exports the four maintenance policies into a
//! shared drop directory on request, at its own pace. The poller waits
//! for a file whose modification time falls within the recency window;
//! if none appears before the deadline the fetch degrades to stale —
//! never a hard failure.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use tracing::{debug, trace};

/// Result of one poll-with-timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyFetch {
    /// A freshly modified file is available at this path.
    Fresh(PathBuf),
    /// No sufficiently fresh file appeared before the deadline.
    Stale,
}

/// Poll-with-timeout contract over the shared drop directory.
pub struct PolicyPoller {
    drop_dir: PathBuf,
    window: Duration,
    interval: Duration,
    deadline: Duration,
}

impl PolicyPoller {
    pub fn new(
        drop_dir: impl Into<PathBuf>,
        window: Duration,
        interval: Duration,
        deadline: Duration,
    ) -> Self {
        Self {
            drop_dir: drop_dir.into(),
            window,
            interval,
            deadline,
        }
    }

    /// Wait for `file_name` to appear in the drop directory with a
    /// modification time inside the recency window. Checks at least once,
    /// then keeps polling until the deadline elapses.
    pub fn wait_for_fresh(&self, file_name: &str) -> PolicyFetch {
        let started = Instant::now();
        loop {
            if let Some(path) = self.fresh_candidate(file_name) {
                debug!(file = file_name, "policy file is fresh");
                return PolicyFetch::Fresh(path);
            }
            let elapsed = started.elapsed();
            if elapsed >= self.deadline {
                debug!(file = file_name, "no fresh policy file before deadline");
                return PolicyFetch::Stale;
            }
            let nap = self.interval.min(self.deadline - elapsed);
            trace!(file = file_name, ?nap, "policy file not fresh yet, sleeping");
            std::thread::sleep(nap);
        }
    }

    fn fresh_candidate(&self, file_name: &str) -> Option<PathBuf> {
        let path = self.drop_dir.join(file_name);
        let modified = std::fs::metadata(&path).ok()?.modified().ok()?;
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        (age <= self.window).then_some(path)
    }

    /// The drop directory being watched.
    pub fn drop_dir(&self) -> &Path {
        &self.drop_dir
    }
}
