//! Readiness evaluation policy.
//!
//! Turns one memory reading and one disk reading into a [`ReadinessVerdict`].
//! Pure and synchronous: no I/O, no state carried between calls. The caller
//! takes the snapshot (see [`Sampler::sample`](crate::metrics::Sampler::sample)) and
//! builds a fresh verdict per request.
//!
//! | Percent | Label |
//! |---|---|
//! | `p <= 80` | ok |
//! | `80 < p <= 90` | warning |
//! | `p > 90` | critical |
//! | read failed | error |
//!
//! Only the memory check gates readiness. A critical or failed disk check is
//! reported in the verdict but leaves the status at `200`; disk stats are
//! frequently unreadable or meaningless inside containers.

use std::fmt;

use http::StatusCode;

use crate::metrics::MetricReadError;

pub const WARNING_PERCENT: f64 = 80.0;
pub const CRITICAL_PERCENT: f64 = 90.0;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Label {
    Ok,
    Warning,
    Critical,
    Error,
}

impl Label {
    /// Threshold classification. Both bounds are exclusive on the low side:
    /// exactly 80.0 is ok, exactly 90.0 is warning.
    pub fn classify(percent: f64) -> Self {
        if percent > CRITICAL_PERCENT {
            Self::Critical
        } else if percent > WARNING_PERCENT {
            Self::Warning
        } else {
            Self::Ok
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok       => "ok",
            Self::Warning  => "warning",
            Self::Critical => "critical",
            Self::Error    => "error",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single named check.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckResult {
    pub name: &'static str,
    pub label: Label,
    /// `"ok: 50.0%"`, `"critical: 95.3%"`, `"error: <message>"`.
    pub detail: String,
}

impl CheckResult {
    pub fn from_reading(name: &'static str, reading: Result<f64, MetricReadError>) -> Self {
        match reading {
            Ok(percent) => {
                let label = Label::classify(percent);
                Self { name, label, detail: format!("{label}: {percent:.1}%") }
            }
            Err(e) => Self { name, label: Label::Error, detail: format!("error: {e}") },
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Overall {
    Ready,
    NotReady,
}

impl Overall {
    /// Wire form used in the probe body.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ready    => "ready",
            Self::NotReady => "not ready",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReadinessVerdict {
    pub overall: Overall,
    pub status_code: StatusCode,
    /// Memory first, then disk.
    pub checks: Vec<CheckResult>,
}

impl ReadinessVerdict {
    pub fn is_ready(&self) -> bool {
        self.overall == Overall::Ready
    }

    pub fn check(&self, name: &str) -> Option<&CheckResult> {
        self.checks.iter().find(|c| c.name == name)
    }
}

/// Builds the verdict for one readiness request. Always returns a complete
/// verdict; read failures become `error` checks.
pub fn evaluate(
    memory: Result<f64, MetricReadError>,
    disk: Result<f64, MetricReadError>,
) -> ReadinessVerdict {
    let memory = CheckResult::from_reading("memory", memory);
    let disk = CheckResult::from_reading("disk", disk);

    let status_code = match memory.label {
        Label::Critical | Label::Error => StatusCode::SERVICE_UNAVAILABLE,
        Label::Ok | Label::Warning     => StatusCode::OK,
    };
    let overall = if status_code == StatusCode::OK {
        Overall::Ready
    } else {
        Overall::NotReady
    };

    ReadinessVerdict { overall, status_code, checks: vec![memory, disk] }
}
