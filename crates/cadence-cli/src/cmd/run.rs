use crate::cmd::{build_engine, runtime};
use crate::output::{print_json, print_table};
use anyhow::Context;
use cadence_core::engine::RenewalOutcome;
use cadence_core::tick::{self, TickReport};
use std::path::Path;
use std::time::Duration;

/// `cadence run <slug>`
pub fn run_one(root: &Path, slug: &str, json: bool) -> anyhow::Result<()> {
    let (_config, engine) = build_engine(root)?;
    let outcome = runtime()?
        .block_on(engine.run(slug))
        .with_context(|| format!("renewal of cadence '{slug}' failed"))?;

    if json {
        return print_json(&outcome);
    }

    println!("{slug}: {}", outcome.summary());
    if let RenewalOutcome::Renewed { records, .. } = &outcome {
        for record in records {
            println!(
                "  {} observation {} ({})",
                record.id, record.observation_id, record.status
            );
        }
    }
    Ok(())
}

/// `cadence tick`
pub fn tick(root: &Path, json: bool) -> anyhow::Result<()> {
    let (_config, engine) = build_engine(root)?;
    let report = runtime()?.block_on(tick::tick(&engine))?;
    print_report(&report, json)?;

    let failed = report.failed();
    if failed > 0 {
        anyhow::bail!("{failed} cadence(s) failed to renew");
    }
    Ok(())
}

fn print_report(report: &TickReport, json: bool) -> anyhow::Result<()> {
    if json {
        let items: Vec<serde_json::Value> = report
            .runs
            .iter()
            .map(|run| match &run.result {
                Ok(outcome) => serde_json::json!({ "slug": run.slug, "result": outcome }),
                Err(e) => serde_json::json!({ "slug": run.slug, "error": e.to_string() }),
            })
            .collect();
        return print_json(&items);
    }

    if report.runs.is_empty() {
        println!("No active cadences.");
        return Ok(());
    }

    let rows = report
        .runs
        .iter()
        .map(|run| {
            let result = match &run.result {
                Ok(outcome) => outcome.summary(),
                Err(e) => format!("error: {e}"),
            };
            vec![run.slug.clone(), result]
        })
        .collect();
    print_table(&["CADENCE", "RESULT"], rows);
    Ok(())
}

/// `cadence daemon`
pub fn daemon(root: &Path, interval: Option<u64>) -> anyhow::Result<()> {
    let (config, engine) = build_engine(root)?;
    let interval = interval
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.tick_interval());
    if interval.is_zero() {
        anyhow::bail!("tick interval must be greater than zero");
    }

    runtime()?.block_on(async {
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        };
        tick::daemon(&engine, interval, shutdown).await
    })?;
    Ok(())
}
