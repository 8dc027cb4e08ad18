//! Observation status as reported by the scheduling network.
//!
//! Statuses are opaque strings owned by the network. The only question the
//! engine asks of one is whether it is terminal, and that answer is always
//! recomputed through [`is_terminal`], never stored alongside the status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status assigned to a freshly submitted record.
pub const PENDING: &str = "PENDING";

/// Statuses after which the network will never act on a request again.
const TERMINAL_STATUSES: &[&str] = &[
    "COMPLETED",
    "CANCELED",
    "CANCELLED",
    "WINDOW_EXPIRED",
    "FAILURE_LIMIT_REACHED",
    "NOT_ATTEMPTED",
    "FAILED",
    "EXPIRED",
];

/// Canonical terminal check. Case-insensitive, surrounding whitespace ignored.
pub fn is_terminal(status: &str) -> bool {
    let status = status.trim();
    TERMINAL_STATUSES
        .iter()
        .any(|t| t.eq_ignore_ascii_case(status))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObservationStatus(String);

impl ObservationStatus {
    pub fn new(status: impl Into<String>) -> Self {
        Self(status.into())
    }

    pub fn pending() -> Self {
        Self::new(PENDING)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_terminal(&self) -> bool {
        is_terminal(&self.0)
    }
}

impl fmt::Display for ObservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObservationStatus {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
