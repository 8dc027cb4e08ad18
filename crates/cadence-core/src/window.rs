//! Observation window arithmetic.
//!
//! Window bounds are ISO-8601 strings inside a request payload. Advancing a
//! window shifts both bounds by a fixed number of hours, keeping whatever
//! offset (or lack of one) the original value carried, and writes the result
//! into a fresh copy of the payload.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, Timelike};

use crate::error::{CadenceError, Result};
use crate::record::Parameters;

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// A parsed window bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestamp {
    Naive(NaiveDateTime),
    Offset(DateTime<FixedOffset>),
}

impl Timestamp {
    pub fn parse(raw: &str) -> Option<Self> {
        let s = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(Self::Offset(dt));
        }
        for fmt in OFFSET_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
                return Some(Self::Offset(dt));
            }
        }
        for fmt in NAIVE_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(Self::Naive(dt));
            }
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(Self::Naive)
    }

    pub fn checked_add(self, delta: Duration) -> Option<Self> {
        match self {
            Self::Naive(dt) => dt.checked_add_signed(delta).map(Self::Naive),
            Self::Offset(dt) => dt.checked_add_signed(delta).map(Self::Offset),
        }
    }

    /// Comparable instant; naive values are read as UTC.
    pub fn instant(&self) -> NaiveDateTime {
        match self {
            Self::Naive(dt) => *dt,
            Self::Offset(dt) => dt.naive_utc(),
        }
    }

    /// ISO-8601 form; fractional seconds appear only when non-zero.
    pub fn to_iso(&self) -> String {
        match self {
            Self::Naive(dt) => dt.format(naive_format(dt.nanosecond())).to_string(),
            Self::Offset(dt) => {
                let base = naive_format(dt.nanosecond());
                dt.format(&format!("{base}%:z")).to_string()
            }
        }
    }
}

fn naive_format(subsec_nanos: u32) -> &'static str {
    if subsec_nanos == 0 {
        "%Y-%m-%dT%H:%M:%S"
    } else {
        "%Y-%m-%dT%H:%M:%S%.6f"
    }
}

/// Convert a (possibly fractional) number of hours into a duration,
/// rounded to the millisecond. `None` if the result is not representable.
pub fn hours_to_duration(hours: f64) -> Option<Duration> {
    let millis = (hours * 3_600_000.0).round();
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return None;
    }
    Duration::try_milliseconds(millis as i64)
}

/// Read `payload[key]` as a window bound.
pub fn window_bound(payload: &Parameters, key: &str) -> Result<Timestamp> {
    let value = payload.get(key).ok_or_else(|| CadenceError::WindowParse {
        key: key.to_string(),
        value: "<missing>".to_string(),
        reason: "field is absent from the payload".to_string(),
    })?;
    let raw = value.as_str().ok_or_else(|| CadenceError::WindowParse {
        key: key.to_string(),
        value: value.to_string(),
        reason: "expected an ISO-8601 string".to_string(),
    })?;
    Timestamp::parse(raw).ok_or_else(|| CadenceError::WindowParse {
        key: key.to_string(),
        value: raw.to_string(),
        reason: "not an ISO-8601 timestamp".to_string(),
    })
}

/// Return a copy of `payload` with both window bounds moved `hours` later.
pub fn advance_window(
    payload: &Parameters,
    start_key: &str,
    end_key: &str,
    hours: f64,
) -> Result<Parameters> {
    let delta = hours_to_duration(hours).ok_or_else(|| {
        CadenceError::Configuration(format!("cannot advance a window by {hours} hours"))
    })?;
    let start = shift(payload, start_key, delta, hours)?;
    let end = shift(payload, end_key, delta, hours)?;

    let mut advanced = payload.clone();
    advanced.insert(start_key.to_string(), start.to_iso().into());
    advanced.insert(end_key.to_string(), end.to_iso().into());
    Ok(advanced)
}

fn shift(payload: &Parameters, key: &str, delta: Duration, hours: f64) -> Result<Timestamp> {
    let bound = window_bound(payload, key)?;
    // Bound parsed fine; only the frequency can push it out of range.
    bound.checked_add(delta).ok_or_else(|| {
        CadenceError::Configuration(format!(
            "advancing '{key}' ({}) by {hours} hours leaves the supported date range",
            bound.to_iso()
        ))
    })
}
