//! Execution lock — advisory mutual exclusion keyed by the invocation
//! signature.
//!
//! The lock record is a file whose content is the owning pid and program
//! name. Acquisition against an existing record consults a
//! [`LivenessProbe`]: a dead owner's record is stolen, a live owner means
//! `Busy` and the run exits unknown without touching any state. Release is
//! best-effort; failing to remove the record is logged, never escalated.
//!
//! The single read-then-write race between creation and removal is
//! accepted: the dominant failure mode is accidental double-invocation by
//! the scheduler, not adversarial concurrency.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use confdrift_core::errors::LockError;
use confdrift_core::target::sanitize;

/// Compute the lock signature from all invocation parameters: the
/// sanitized concatenation, safe to embed in a file name. Distinct
/// parameter sets yield distinct signatures, so checks of different
/// targets never contend.
pub fn signature(parts: &[&str]) -> String {
    sanitize(&parts.concat())
}

/// Decides whether a recorded lock owner is still alive.
pub trait LivenessProbe {
    /// True when a process with `pid` exists and runs `program`.
    fn is_alive(&self, pid: u32, program: &str) -> bool;
}

/// Process-table probe backed by `/proc`.
///
/// Matches both the pid and the recorded program name, which keeps the
/// pid-reuse race narrow: an unrelated process reusing the pid only
/// defeats the check if it also shares the program name.
pub struct ProcTableProbe;

impl LivenessProbe for ProcTableProbe {
    fn is_alive(&self, pid: u32, program: &str) -> bool {
        let proc_dir = PathBuf::from(format!("/proc/{pid}"));
        if !proc_dir.is_dir() {
            return false;
        }
        match std::fs::read_to_string(proc_dir.join("comm")) {
            // The kernel truncates comm to 15 bytes.
            Ok(comm) => {
                let recorded: String = program.chars().take(15).collect();
                comm.trim() == recorded
            }
            Err(_) => false,
        }
    }
}

/// Lock manager for one lock directory.
pub struct ExecutionLock<P: LivenessProbe = ProcTableProbe> {
    dir: PathBuf,
    probe: P,
    program: String,
}

impl ExecutionLock<ProcTableProbe> {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_probe(dir, ProcTableProbe, current_program())
    }
}

impl<P: LivenessProbe> ExecutionLock<P> {
    /// Lock manager with an explicit probe and program name (tests inject
    /// stub probes here).
    pub fn with_probe(dir: impl Into<PathBuf>, probe: P, program: String) -> Self {
        Self {
            dir: dir.into(),
            probe,
            program,
        }
    }

    /// Acquire the lock for `signature`, stealing a dead owner's record.
    pub fn acquire(&self, signature: &str) -> Result<LockGuard, LockError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| LockError::Io {
            path: self.dir.display().to_string(),
            message: e.to_string(),
        })?;
        let path = self.dir.join(format!("{signature}.lock"));

        // One steal attempt only; a second collision means a live rival.
        for attempt in 0..2 {
            match self.try_create(&path) {
                Ok(guard) => return Ok(guard),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    let owner_pid = self.inspect_existing(&path, signature, attempt)?;
                    if let Some(owner_pid) = owner_pid {
                        return Err(LockError::Busy {
                            signature: signature.to_string(),
                            owner_pid,
                        });
                    }
                    // Stale record removed; loop to re-create.
                }
                Err(e) => {
                    return Err(LockError::Io {
                        path: path.display().to_string(),
                        message: e.to_string(),
                    })
                }
            }
        }

        Err(LockError::Io {
            path: path.display().to_string(),
            message: "lock contention while stealing a stale record".to_string(),
        })
    }

    fn try_create(&self, path: &Path) -> std::io::Result<LockGuard> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        let pid = std::process::id();
        writeln!(file, "{pid} {}", self.program)?;
        file.sync_all()?;
        debug!(path = %path.display(), pid, "execution lock acquired");
        Ok(LockGuard {
            path: path.to_path_buf(),
            pid,
            released: false,
        })
    }

    /// Returns `Some(pid)` when a live owner holds the record, `None` after
    /// removing a stale or malformed record.
    fn inspect_existing(
        &self,
        path: &Path,
        signature: &str,
        attempt: usize,
    ) -> Result<Option<u32>, LockError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            // Record vanished between create and read: treat as stale.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(LockError::Io {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })
            }
        };

        match parse_record(&content) {
            Some((pid, program)) if self.probe.is_alive(pid, program) => Ok(Some(pid)),
            Some((pid, _)) => {
                info!(
                    signature,
                    owner_pid = pid,
                    "lock owner is no longer alive, stealing stale record"
                );
                self.remove_record(path)?;
                Ok(None)
            }
            None => {
                if attempt > 0 {
                    return Err(LockError::Malformed {
                        path: path.display().to_string(),
                        content,
                    });
                }
                warn!(signature, content = content.trim(), "removing malformed lock record");
                self.remove_record(path)?;
                Ok(None)
            }
        }
    }

    fn remove_record(&self, path: &Path) -> Result<(), LockError> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LockError::Io {
                path: path.display().to_string(),
                message: e.to_string(),
            }),
        }
    }
}

/// Parse a lock record: `<pid> <program>`.
fn parse_record(content: &str) -> Option<(u32, &str)> {
    let mut fields = content.trim().splitn(2, ' ');
    let pid = fields.next()?.parse::<u32>().ok()?;
    let program = fields.next()?.trim();
    if program.is_empty() {
        return None;
    }
    Some((pid, program))
}

fn current_program() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "check_confdrift".to_string())
}

/// Held lock; releases the record on drop if still owned.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
    pid: u32,
    released: bool,
}

impl LockGuard {
    /// Explicit release at run end.
    pub fn release(mut self) {
        self.do_release();
    }

    fn do_release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        // Only remove the record if we still own it.
        let owned = match std::fs::read_to_string(&self.path) {
            Ok(content) => parse_record(&content).map(|(pid, _)| pid) == Some(self.pid),
            Err(_) => false,
        };
        if !owned {
            warn!(path = %self.path.display(), "lock record no longer ours, leaving it");
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            // Non-fatal: the next run's liveness probe will steal it.
            warn!(path = %self.path.display(), error = %e, "failed to remove lock record");
        } else {
            debug!(path = %self.path.display(), "execution lock released");
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.do_release();
    }
}
