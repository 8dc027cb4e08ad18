//! Per-cadence leases.
//!
//! A lease row marks a cadence as being worked on. It carries an expiry so a
//! crashed holder cannot wedge the cadence forever.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lease {
    pub holder: Uuid,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Lease {
    pub fn new(holder: Uuid, now: DateTime<Utc>, ttl: chrono::Duration) -> Self {
        Self {
            holder,
            acquired_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Whether `holder` may take this lease at `now`.
    pub fn is_available_to(&self, holder: Uuid, now: DateTime<Utc>) -> bool {
        self.holder == holder || self.is_expired(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn lease_expires_after_ttl() {
        let now = Utc::now();
        let lease = Lease::new(Uuid::new_v4(), now, Duration::seconds(30));
        assert!(!lease.is_expired(now + Duration::seconds(29)));
        assert!(lease.is_expired(now + Duration::seconds(30)));
    }

    #[test]
    fn live_lease_only_available_to_holder() {
        let now = Utc::now();
        let holder = Uuid::new_v4();
        let lease = Lease::new(holder, now, Duration::seconds(30));
        assert!(lease.is_available_to(holder, now));
        assert!(!lease.is_available_to(Uuid::new_v4(), now));
        assert!(lease.is_available_to(Uuid::new_v4(), now + Duration::minutes(1)));
    }
}
