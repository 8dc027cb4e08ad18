//! Refresh the status of in-flight observations from their facilities.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::engine::CadenceEngine;
use crate::error::{CadenceError, Result};
use crate::record::ObservationRecord;
use crate::status::ObservationStatus;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub checked: usize,
    pub updated: usize,
    pub failed: usize,
}

/// Query every non-terminal record in an active cadence's group and persist
/// status changes. Per-record failures are logged and counted.
pub async fn sync(engine: &CadenceEngine) -> Result<SyncReport> {
    let db = engine.db();
    let mut seen = BTreeSet::new();
    let mut pending: Vec<ObservationRecord> = Vec::new();
    for cadence in db.active_cadences()? {
        for record in db.group_records(&cadence.group)? {
            if !record.terminal() && seen.insert(record.id) {
                pending.push(record);
            }
        }
    }

    let mut report = SyncReport::default();
    for record in pending {
        report.checked += 1;
        match query_status(engine, &record).await {
            Ok(status) if status.as_str() == record.status.as_str() => {
                debug!(record = %record.id, status = %status, "status unchanged");
            }
            Ok(status) => {
                info!(
                    record = %record.id,
                    observation = %record.observation_id,
                    from = %record.status,
                    to = %status,
                    "status changed"
                );
                db.set_record_status(record.id, status)?;
                report.updated += 1;
            }
            Err(e) => {
                warn!(
                    record = %record.id,
                    observation = %record.observation_id,
                    error = %e,
                    "status query failed"
                );
                report.failed += 1;
            }
        }
    }

    info!(
        checked = report.checked,
        updated = report.updated,
        failed = report.failed,
        "sync complete"
    );
    Ok(report)
}

async fn query_status(engine: &CadenceEngine, record: &ObservationRecord) -> Result<ObservationStatus> {
    let facility = engine.registry().get(&record.facility)?;
    let observation_id = record.observation_id.clone();
    let state = tokio::task::spawn_blocking(move || facility.observation_status(&observation_id))
        .await
        .map_err(|e| CadenceError::Task(e.to_string()))??;
    Ok(ObservationStatus::new(state))
}
