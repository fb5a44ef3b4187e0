//! Nagios text output formatting.
//!
//! Default format: `<LABEL> - <summary>|<perfdata>`. The `--mk` format
//! packs everything on one line:
//! `<code> <check-name>-<instance>-<database> <perfdata> <LABEL> - <summary>`.

use confdrift_core::target::sanitize;
use confdrift_core::{AlertResult, Target};

/// Check name used in the `--mk` service identifier.
pub const CHECK_NAME: &str = "cfg_drift";

/// Render the alert in the requested format.
pub fn render(alert: &AlertResult, target: &Target, mk: bool) -> String {
    let perf = alert.changes.map(|n| format!("changes={n}"));
    if mk {
        let service = format!(
            "{CHECK_NAME}-{}-{}",
            sanitize(&target.instance().to_string_lossy()),
            sanitize(target.database()),
        );
        format!(
            "{} {} {} {} - {}",
            alert.severity.exit_code(),
            service,
            perf.as_deref().unwrap_or("-"),
            alert.severity.label(),
            alert.summary,
        )
    } else {
        match perf {
            Some(perf) => format!("{} - {}|{}", alert.severity.label(), alert.summary, perf),
            None => format!("{} - {}", alert.severity.label(), alert.summary),
        }
    }
}
