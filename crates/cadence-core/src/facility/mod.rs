//! Facility gateways and the registry that resolves them by name.
//!
//! A facility is the remote scheduling network a request is submitted to.
//! The engine only needs four things from one: the names of the two payload
//! fields holding the observation window, validation, submission, and a
//! status query. Implementations are registered once at startup; nothing
//! looks them up reflectively.

pub mod lco;

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::{Config, FacilityConfig};
use crate::error::{CadenceError, Result};
use crate::record::Parameters;

pub use lco::LcoFacility;

/// Capability interface for one scheduling network.
///
/// Methods may block on network I/O; the engine calls `submit` from a
/// blocking worker under a timeout.
pub trait Facility: Send + Sync {
    /// Registered name, e.g. `LCO`. Stored on every record it creates.
    fn name(&self) -> &str;

    /// Payload keys holding the window `(start, end)`.
    fn window_keys(&self) -> (&str, &str);

    /// Check a payload for the given observation subtype.
    ///
    /// Rejections are reported as [`CadenceError::Validation`] with
    /// field-level detail.
    fn validate(&self, observation_type: Option<&str>, payload: &Parameters) -> Result<()>;

    /// Submit a payload. One logical request may be scheduled as several
    /// sub-requests, so zero or more identifiers come back.
    fn submit(&self, payload: &Parameters) -> Result<Vec<String>>;

    /// Current network status of a previously submitted observation.
    fn observation_status(&self, observation_id: &str) -> Result<String>;
}

/// Name → facility table built at process startup.
#[derive(Clone, Default)]
pub struct FacilityRegistry {
    facilities: BTreeMap<String, Arc<dyn Facility>>,
}

impl FacilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry from the `facilities` section of the config.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut registry = Self::new();
        for (name, facility) in &config.facilities {
            match facility {
                FacilityConfig::Lco(settings) => {
                    let lco = LcoFacility::from_settings(name, settings)?;
                    registry.register(Arc::new(lco));
                }
            }
        }
        Ok(registry)
    }

    /// Register a facility under its own name, replacing any previous entry.
    pub fn register(&mut self, facility: Arc<dyn Facility>) {
        self.facilities.insert(facility.name().to_string(), facility);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Facility>> {
        self.facilities
            .get(name)
            .cloned()
            .ok_or_else(|| CadenceError::UnknownFacility(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.facilities.keys().map(|k| k.as_str()).collect()
    }
}

impl std::fmt::Debug for FacilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FacilityRegistry")
            .field("facilities", &self.names())
            .finish()
    }
}
