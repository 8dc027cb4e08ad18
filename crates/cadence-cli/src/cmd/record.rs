use crate::cmd::open_db;
use crate::output::{print_json, print_table, short_time};
use anyhow::Context;
use cadence_core::record::{ObservationRecord, Parameters};
use cadence_core::status::ObservationStatus;
use clap::Subcommand;
use std::path::Path;
use uuid::Uuid;

#[derive(Subcommand)]
pub enum RecordSubcommand {
    /// Register an observation already submitted to a facility
    Add {
        /// Target name, e.g. sn2023ixf
        #[arg(long)]
        target: String,
        /// Registered facility name, e.g. LCO
        #[arg(long)]
        facility: String,
        /// Identifier the facility assigned to the request
        #[arg(long)]
        observation_id: String,
        /// Request payload as a JSON object, or @path to read it from a file
        #[arg(long, value_name = "JSON|@FILE")]
        params: String,
        /// Initial status (default PENDING)
        #[arg(long)]
        status: Option<String>,
        /// Also add the record to this group
        #[arg(long)]
        group: Option<String>,
    },
    /// List all records
    List,
    /// Show one record with its payload
    Show { id: Uuid },
    /// Overwrite a record's status
    SetStatus { id: Uuid, status: String },
}

pub fn run(root: &Path, subcmd: RecordSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        RecordSubcommand::Add {
            target,
            facility,
            observation_id,
            params,
            status,
            group,
        } => add(
            root,
            &target,
            &facility,
            &observation_id,
            &params,
            status.as_deref(),
            group.as_deref(),
            json,
        ),
        RecordSubcommand::List => list(root, json),
        RecordSubcommand::Show { id } => show(root, id, json),
        RecordSubcommand::SetStatus { id, status } => set_status(root, id, &status, json),
    }
}

/// Parse `--params`: inline JSON or `@path`.
fn parse_params(raw: &str) -> anyhow::Result<Parameters> {
    let text = match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read params file {path}"))?,
        None => raw.to_string(),
    };
    let value: serde_json::Value =
        serde_json::from_str(&text).context("params must be valid JSON")?;
    match value {
        serde_json::Value::Object(map) => Ok(map),
        other => anyhow::bail!("params must be a JSON object, got {other}"),
    }
}

#[allow(clippy::too_many_arguments)]
fn add(
    root: &Path,
    target: &str,
    facility: &str,
    observation_id: &str,
    params: &str,
    status: Option<&str>,
    group: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let parameters = parse_params(params)?;
    let db = open_db(root)?;

    let mut record = ObservationRecord::new(target, facility, parameters, observation_id);
    if let Some(status) = status {
        record = record.with_status(status);
    }
    db.insert_record(&record).context("failed to store record")?;
    if let Some(group) = group {
        db.add_to_group(group, record.id)
            .with_context(|| format!("failed to add record to group '{group}'"))?;
    }

    if json {
        print_json(&record)?;
    } else {
        println!("Created record {} ({}).", record.id, record.status);
        if let Some(group) = group {
            println!("  Group: {group}");
        }
    }
    Ok(())
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let db = open_db(root)?;
    let records = db.list_records().context("failed to list records")?;

    if json {
        return print_json(&records);
    }

    if records.is_empty() {
        println!("No records.");
        return Ok(());
    }

    let rows = records
        .iter()
        .map(|r| {
            vec![
                r.id.to_string(),
                r.target.clone(),
                r.facility.clone(),
                r.observation_id.clone(),
                r.status.to_string(),
                short_time(&r.created_at),
            ]
        })
        .collect();
    print_table(
        &["ID", "TARGET", "FACILITY", "OBSERVATION", "STATUS", "CREATED"],
        rows,
    );
    Ok(())
}

fn show(root: &Path, id: Uuid, json: bool) -> anyhow::Result<()> {
    let db = open_db(root)?;
    let record = db.get_record(id)?;

    if json {
        return print_json(&record);
    }

    println!("Record:      {}", record.id);
    println!("Target:      {}", record.target);
    println!("Facility:    {}", record.facility);
    println!("Observation: {}", record.observation_id);
    println!("Status:      {}", record.status);
    println!("Created:     {}", record.created_at.to_rfc3339());
    println!(
        "Parameters:\n{}",
        serde_json::to_string_pretty(&record.parameters)?
    );
    Ok(())
}

fn set_status(root: &Path, id: Uuid, status: &str, json: bool) -> anyhow::Result<()> {
    let db = open_db(root)?;
    let record = db.set_record_status(id, ObservationStatus::new(status.trim()))?;

    if json {
        print_json(&serde_json::json!({
            "id": record.id,
            "status": record.status,
            "terminal": record.terminal(),
        }))?;
    } else {
        println!("Record {} is now {}.", record.id, record.status);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_params_must_be_an_object() {
        assert!(parse_params(r#"{"start": "2020-01-01"}"#).is_ok());
        assert!(parse_params("[1, 2]").is_err());
        assert!(parse_params("not json").is_err());
    }

    #[test]
    fn params_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("payload.json");
        std::fs::write(&path, r#"{"observation_type": "IMAGING"}"#).unwrap();
        let params = parse_params(&format!("@{}", path.display())).unwrap();
        assert_eq!(params["observation_type"], "IMAGING");
    }
}
