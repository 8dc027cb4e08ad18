use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::ObservationRecord;

/// An ordered membership list of observation records sharing a cadence.
///
/// The group references records by id; the store owns the records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationGroup {
    pub slug: String,
    #[serde(default)]
    pub records: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ObservationGroup {
    pub fn new(slug: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            slug: slug.into(),
            records: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.records.contains(&id)
    }

    /// Add a record id. Returns `false` if already present.
    pub fn add_record(&mut self, id: Uuid) -> bool {
        if self.contains(id) {
            return false;
        }
        self.records.push(id);
        self.updated_at = Utc::now();
        true
    }

    /// Remove a record id. Returns `false` if not present.
    pub fn remove_record(&mut self, id: Uuid) -> bool {
        let before = self.records.len();
        self.records.retain(|r| *r != id);
        if self.records.len() < before {
            self.updated_at = Utc::now();
            true
        } else {
            false
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Order member records by creation time. The sort is stable, so records
/// created in the same instant keep their membership order.
pub fn sort_by_creation(records: &mut [ObservationRecord]) {
    records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
}
