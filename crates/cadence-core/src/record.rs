use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::status::ObservationStatus;

/// Full request payload for one facility submission.
pub type Parameters = serde_json::Map<String, serde_json::Value>;

/// One submitted request at a facility.
///
/// Records are never deleted by the engine; groups only drop their reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    pub id: Uuid,
    pub target: String,
    pub facility: String,
    pub parameters: Parameters,
    /// Identifier assigned by the facility.
    pub observation_id: String,
    pub status: ObservationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ObservationRecord {
    /// A record for a request that was just submitted.
    pub fn new(
        target: impl Into<String>,
        facility: impl Into<String>,
        parameters: Parameters,
        observation_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            target: target.into(),
            facility: facility.into(),
            parameters,
            observation_id: observation_id.into(),
            status: ObservationStatus::pending(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_status(mut self, status: impl Into<ObservationStatus>) -> Self {
        self.status = status.into();
        self
    }

    pub fn terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// The facility-specific observation subtype, if the payload names one.
    pub fn observation_type(&self) -> Option<&str> {
        self.parameters
            .get("observation_type")
            .and_then(|v| v.as_str())
    }

    pub fn set_status(&mut self, status: ObservationStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}
