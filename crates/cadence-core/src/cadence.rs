use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CadenceError, Result};
use crate::window::hours_to_duration;

/// Key of the mandatory repeat interval, in hours.
pub const CADENCE_FREQUENCY: &str = "cadence_frequency";

/// Binds an observation group to the parameters that drive its renewal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cadence {
    pub slug: String,
    pub group: String,
    #[serde(default)]
    pub parameters: serde_json::Map<String, serde_json::Value>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub last_run_at: Option<DateTime<Utc>>,
    /// Short summary of the last engine decision, e.g. `renewed 1` or `active 2`.
    #[serde(default)]
    pub last_outcome: Option<String>,
}

impl Cadence {
    pub fn new(slug: impl Into<String>, group: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            slug: slug.into(),
            group: group.into(),
            parameters: serde_json::Map::new(),
            active: true,
            created_at: now,
            updated_at: now,
            last_run_at: None,
            last_outcome: None,
        }
    }

    pub fn with_frequency(mut self, hours: f64) -> Self {
        self.parameters
            .insert(CADENCE_FREQUENCY.to_string(), serde_json::json!(hours));
        self
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
        self.updated_at = Utc::now();
    }

    pub fn record_outcome(&mut self, summary: impl Into<String>) {
        let now = Utc::now();
        self.last_run_at = Some(now);
        self.last_outcome = Some(summary.into());
        self.updated_at = now;
    }

    /// Resolve `cadence_frequency` to a positive number of hours.
    ///
    /// Accepts JSON numbers and numeric strings.
    pub fn frequency_hours(&self) -> Result<f64> {
        let raw = self.parameters.get(CADENCE_FREQUENCY).ok_or_else(|| {
            CadenceError::Configuration(format!(
                "cadence '{}' requires a {CADENCE_FREQUENCY} parameter",
                self.slug
            ))
        })?;

        let hours = match raw {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .ok_or_else(|| {
            CadenceError::Configuration(format!(
                "cadence '{}': {CADENCE_FREQUENCY} must be a number of hours, got {raw}",
                self.slug
            ))
        })?;

        if !hours.is_finite() || hours <= 0.0 {
            return Err(CadenceError::Configuration(format!(
                "cadence '{}': {CADENCE_FREQUENCY} must be positive, got {hours}",
                self.slug
            )));
        }
        match hours_to_duration(hours) {
            Some(step) if step > chrono::Duration::zero() => Ok(hours),
            Some(_) => Err(CadenceError::Configuration(format!(
                "cadence '{}': {CADENCE_FREQUENCY} of {hours} hours is under one millisecond",
                self.slug
            ))),
            None => Err(CadenceError::Configuration(format!(
                "cadence '{}': {CADENCE_FREQUENCY} of {hours} hours is too large",
                self.slug
            ))),
        }
    }
}
