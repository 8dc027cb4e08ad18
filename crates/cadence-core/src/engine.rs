//! The renewal engine.
//!
//! One `run` decides, for one cadence, whether every observation in its group
//! has reached a terminal state and, if so, resubmits the most recent one with
//! its window pushed forward by the cadence frequency. Group membership is only
//! touched after the facility has accepted the new request, and then in a
//! single store transaction.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cadence::Cadence;
use crate::config::Config;
use crate::error::{CadenceError, Result};
use crate::facility::{Facility, FacilityRegistry};
use crate::record::{ObservationRecord, Parameters};
use crate::status::ObservationStatus;
use crate::store::CadenceDb;
use crate::window::advance_window;

const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_LEASE_TTL: Duration = Duration::from_secs(300);

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Another run holds the cadence lease.
    InFlight,
    /// The cadence is paused.
    Inactive,
    /// The group has no members, so there is no template to renew from.
    EmptyGroup,
    /// At least one member has not reached a terminal status.
    Active { pending: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RenewalOutcome {
    Skipped {
        reason: SkipReason,
    },
    /// New records, in the order the facility returned their identifiers.
    Renewed {
        template_id: Uuid,
        records: Vec<ObservationRecord>,
    },
    /// The facility accepted the request but returned no identifiers. The
    /// group was still pruned.
    EmptySubmission {
        template_id: Uuid,
    },
}

impl RenewalOutcome {
    fn skipped(reason: SkipReason) -> Self {
        Self::Skipped { reason }
    }

    pub fn is_renewal(&self) -> bool {
        matches!(self, Self::Renewed { .. })
    }

    /// Statuses of the newly created records.
    pub fn statuses(&self) -> Vec<ObservationStatus> {
        match self {
            Self::Renewed { records, .. } => records.iter().map(|r| r.status.clone()).collect(),
            _ => Vec::new(),
        }
    }

    /// One-line summary stored as the cadence's `last_outcome`.
    pub fn summary(&self) -> String {
        match self {
            Self::Skipped { reason } => match reason {
                SkipReason::InFlight => "skipped: in flight".to_string(),
                SkipReason::Inactive => "skipped: inactive".to_string(),
                SkipReason::EmptyGroup => "skipped: empty group".to_string(),
                SkipReason::Active { pending } => format!("skipped: {pending} pending"),
            },
            Self::Renewed { records, .. } => format!("renewed {}", records.len()),
            Self::EmptySubmission { .. } => "renewed 0 (no identifiers returned)".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Lease guard
// ---------------------------------------------------------------------------

struct LeaseGuard<'a> {
    db: &'a CadenceDb,
    slug: &'a str,
    holder: Uuid,
}

impl Drop for LeaseGuard<'_> {
    fn drop(&mut self) {
        match self.db.release_lease(self.slug, self.holder) {
            Ok(true) => {}
            Ok(false) => warn!(cadence = self.slug, "lease was taken over before release"),
            Err(e) => warn!(cadence = self.slug, error = %e, "failed to release lease"),
        }
    }
}

fn task_err(e: tokio::task::JoinError) -> CadenceError {
    CadenceError::Task(e.to_string())
}

// ---------------------------------------------------------------------------
// CadenceEngine
// ---------------------------------------------------------------------------

pub struct CadenceEngine {
    db: Arc<CadenceDb>,
    registry: FacilityRegistry,
    submit_timeout: Duration,
    lease_ttl: Duration,
}

impl CadenceEngine {
    pub fn new(db: Arc<CadenceDb>, registry: FacilityRegistry) -> Self {
        Self {
            db,
            registry,
            submit_timeout: DEFAULT_SUBMIT_TIMEOUT,
            lease_ttl: DEFAULT_LEASE_TTL,
        }
    }

    pub fn from_config(db: Arc<CadenceDb>, registry: FacilityRegistry, config: &Config) -> Self {
        Self::new(db, registry)
            .with_submit_timeout(config.submit_timeout())
            .with_lease_ttl(config.lease_ttl())
    }

    pub fn with_submit_timeout(mut self, timeout: Duration) -> Self {
        self.submit_timeout = timeout;
        self
    }

    pub fn with_lease_ttl(mut self, ttl: Duration) -> Self {
        self.lease_ttl = ttl;
        self
    }

    pub fn db(&self) -> &Arc<CadenceDb> {
        &self.db
    }

    pub fn registry(&self) -> &FacilityRegistry {
        &self.registry
    }

    /// Run one renewal decision for `slug`.
    ///
    /// The cadence lease is held for the whole run and released on every exit
    /// path. The result, success or failure, is stamped on the stored cadence
    /// without touching fields changed while the run was in progress.
    pub async fn run(&self, slug: &str) -> Result<RenewalOutcome> {
        let holder = Uuid::new_v4();
        if !self.db.try_acquire_lease(slug, holder, self.lease_ttl)? {
            debug!(cadence = slug, "renewal already in flight");
            return Ok(RenewalOutcome::skipped(SkipReason::InFlight));
        }
        let _lease = LeaseGuard {
            db: &self.db,
            slug,
            holder,
        };

        let cadence = self.db.get_cadence(slug)?;
        let result = self.renew(&cadence).await;

        let summary = match &result {
            Ok(outcome) => outcome.summary(),
            Err(e) => format!("error: {e}"),
        };
        if let Err(e) = self.db.record_outcome(slug, summary) {
            warn!(cadence = slug, error = %e, "failed to record run outcome");
        }
        result
    }

    async fn renew(&self, cadence: &Cadence) -> Result<RenewalOutcome> {
        if !cadence.active {
            debug!(cadence = %cadence.slug, "cadence is paused");
            return Ok(RenewalOutcome::skipped(SkipReason::Inactive));
        }
        let hours = cadence.frequency_hours()?;

        let snapshot = self.db.group_records(&cadence.group)?;
        // Sorted oldest first; equal timestamps keep membership order.
        let Some(template) = snapshot.last() else {
            debug!(cadence = %cadence.slug, group = %cadence.group, "group is empty");
            return Ok(RenewalOutcome::skipped(SkipReason::EmptyGroup));
        };
        let pending = snapshot.iter().filter(|r| !r.terminal()).count();
        if pending > 0 {
            debug!(cadence = %cadence.slug, pending, "observations still active");
            return Ok(RenewalOutcome::skipped(SkipReason::Active { pending }));
        }

        let facility = self.registry.get(&template.facility)?;
        let (start_key, end_key) = facility.window_keys();
        let payload = advance_window(&template.parameters, start_key, end_key, hours)?;

        self.validate(&facility, template.observation_type(), &payload)
            .await?;
        let identifiers = self.submit(&facility, &payload).await?;

        let prune: Vec<Uuid> = snapshot.iter().map(|r| r.id).collect();
        let created: Vec<ObservationRecord> = identifiers
            .iter()
            .map(|id| {
                ObservationRecord::new(
                    template.target.clone(),
                    template.facility.clone(),
                    payload.clone(),
                    id.clone(),
                )
            })
            .collect();
        self.db.commit_renewal(&cadence.group, &prune, &created)?;

        if created.is_empty() {
            warn!(
                cadence = %cadence.slug,
                facility = facility.name(),
                template = %template.id,
                "facility accepted the request but returned no identifiers"
            );
            return Ok(RenewalOutcome::EmptySubmission {
                template_id: template.id,
            });
        }

        info!(
            cadence = %cadence.slug,
            facility = facility.name(),
            pruned = prune.len(),
            created = created.len(),
            "renewed observations"
        );
        Ok(RenewalOutcome::Renewed {
            template_id: template.id,
            records: created,
        })
    }

    async fn validate(
        &self,
        facility: &Arc<dyn Facility>,
        observation_type: Option<&str>,
        payload: &Parameters,
    ) -> Result<()> {
        let facility = Arc::clone(facility);
        let observation_type = observation_type.map(str::to_string);
        let payload = payload.clone();
        tokio::task::spawn_blocking(move || facility.validate(observation_type.as_deref(), &payload))
            .await
            .map_err(task_err)?
    }

    async fn submit(&self, facility: &Arc<dyn Facility>, payload: &Parameters) -> Result<Vec<String>> {
        let facility = Arc::clone(facility);
        let payload = payload.clone();
        let task = tokio::task::spawn_blocking(move || facility.submit(&payload));
        match tokio::time::timeout(self.submit_timeout, task).await {
            Ok(joined) => joined.map_err(task_err)?,
            Err(_) => Err(CadenceError::SubmissionTimeout(self.submit_timeout.as_secs())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
