//! Trust records, decision sources and the foreground hint.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What the trust store currently knows about a certificate.
///
/// Exactly one record exists per certificate at any time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrustRecord {
    /// Explicitly accepted by the user; persisted.
    UserTrusted,
    /// Explicitly rejected by the user; session-scoped, never persisted.
    UserDistrusted,
    /// No decision has been recorded.
    Unknown,
}

impl TrustRecord {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrustRecord::UserTrusted => "trusted",
            TrustRecord::UserDistrusted => "distrusted",
            TrustRecord::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TrustRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the host application can put UI in front of the user right now.
///
/// Passed through to the decision provider. `None` in place of a hint means
/// non-interactive mode: no decision is ever requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForegroundHint {
    /// The app is in the foreground: a review dialog may be shown directly.
    Foreground,
    /// The app is in the background: only a notification may be posted.
    Background,
}

impl ForegroundHint {
    pub fn from_foreground(in_foreground: bool) -> Self {
        if in_foreground {
            ForegroundHint::Foreground
        } else {
            ForegroundHint::Background
        }
    }

    pub fn is_foreground(&self) -> bool {
        matches!(self, ForegroundHint::Foreground)
    }
}

/// Where a resolved decision came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionSource {
    /// The decision provider answered.
    Provider,
    /// An out-of-band decision was submitted while the request was pending.
    Submitted,
    /// The provider did not answer in time; treated as a rejection.
    Timeout,
}

impl fmt::Display for DecisionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DecisionSource::Provider => "provider",
            DecisionSource::Submitted => "submitted",
            DecisionSource::Timeout => "timeout",
        };
        f.write_str(s)
    }
}
