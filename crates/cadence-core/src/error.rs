use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// Field-level validation detail: field name → messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(pub BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(|v| v.as_slice())
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, msgs)| format!("{field}: {}", msgs.join("; ")))
            .collect();
        f.write_str(&parts.join(", "))
    }
}

#[derive(Debug, Error)]
pub enum CadenceError {
    #[error("not initialized: run 'cadence init'")]
    NotInitialized,

    #[error("invalid slug '{0}': must be lowercase alphanumeric with hyphens")]
    InvalidSlug(String),

    #[error("group not found: {0}")]
    GroupNotFound(String),

    #[error("group already exists: {0}")]
    GroupExists(String),

    #[error("cadence not found: {0}")]
    CadenceNotFound(String),

    #[error("cadence already exists: {0}")]
    CadenceExists(String),

    #[error("observation record not found: {0}")]
    RecordNotFound(Uuid),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("no facility registered under '{0}'")]
    UnknownFacility(String),

    #[error("cannot parse window field '{key}' (value {value}): {reason}")]
    WindowParse {
        key: String,
        value: String,
        reason: String,
    },

    #[error("{facility} rejected the observation payload: {errors}")]
    Validation {
        facility: String,
        errors: FieldErrors,
    },

    /// The facility could not be asked to validate; nothing was judged.
    #[error("validation request failed: {0}")]
    ValidationUnavailable(String),

    #[error("submission failed: {0}")]
    Submission(String),

    #[error("submission timed out after {0}s")]
    SubmissionTimeout(u64),

    #[error("status query failed: {0}")]
    StatusQuery(String),

    #[error("background task failed: {0}")]
    Task(String),

    #[error("store error: {0}")]
    Db(String),

    #[error("home directory not found: set HOME environment variable")]
    HomeNotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CadenceError>;
