//! Periodic driver: run the engine for every active cadence.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::engine::{CadenceEngine, RenewalOutcome};
use crate::error::Result;

/// Result of one engine run inside a tick.
#[derive(Debug)]
pub struct CadenceRun {
    pub slug: String,
    pub result: Result<RenewalOutcome>,
}

#[derive(Debug, Default)]
pub struct TickReport {
    pub runs: Vec<CadenceRun>,
}

impl TickReport {
    pub fn renewed(&self) -> usize {
        self.runs
            .iter()
            .filter(|r| matches!(r.result, Ok(RenewalOutcome::Renewed { .. })))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.runs.iter().filter(|r| r.result.is_err()).count()
    }
}

/// Run every active cadence once, concurrently.
///
/// A failing cadence does not stop the others; its error is kept in the report.
pub async fn tick(engine: &CadenceEngine) -> Result<TickReport> {
    let cadences = engine.db().active_cadences()?;
    let runs = join_all(cadences.iter().map(|cadence| async move {
        CadenceRun {
            slug: cadence.slug.clone(),
            result: engine.run(&cadence.slug).await,
        }
    }))
    .await;

    for run in &runs {
        if let Err(e) = &run.result {
            warn!(cadence = %run.slug, error = %e, "renewal failed");
        }
    }
    let report = TickReport { runs };
    info!(
        cadences = report.runs.len(),
        renewed = report.renewed(),
        failed = report.failed(),
        "tick complete"
    );
    Ok(report)
}

/// Tick every `interval` until `shutdown` resolves.
///
/// Leases left behind by a crashed process are cleared before the first tick.
pub async fn daemon(
    engine: &CadenceEngine,
    interval: Duration,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    let cleared = engine.db().clear_expired_leases(Utc::now())?;
    if cleared > 0 {
        info!(cleared, "cleared expired leases");
    }

    info!(interval_secs = interval.as_secs(), "daemon started");
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("daemon stopping");
                return Ok(());
            }
            _ = ticker.tick() => {
                if let Err(e) = tick(engine).await {
                    warn!(error = %e, "tick failed");
                }
            }
        }
    }
}
