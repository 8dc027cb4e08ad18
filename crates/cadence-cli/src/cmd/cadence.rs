use crate::cmd::open_db;
use crate::output::{print_json, print_table, short_time};
use anyhow::Context;
use cadence_core::cadence::{Cadence, CADENCE_FREQUENCY};
use clap::Subcommand;
use std::path::Path;

#[derive(Subcommand)]
pub enum CadenceSubcommand {
    /// Bind a group to renewal parameters
    Create {
        slug: String,
        /// Group whose records are renewed
        #[arg(long)]
        group: String,
        /// Hours between consecutive windows
        #[arg(long, value_name = "HOURS")]
        frequency: Option<f64>,
        /// Extra parameter (repeatable: --param key=value)
        #[arg(long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,
    },
    /// List all cadences
    List,
    /// Show one cadence
    Show { slug: String },
    /// Stop renewing a cadence
    Pause { slug: String },
    /// Resume a paused cadence
    Resume { slug: String },
}

pub fn run(root: &Path, subcmd: CadenceSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        CadenceSubcommand::Create {
            slug,
            group,
            frequency,
            params,
        } => create(root, &slug, &group, frequency, &params, json),
        CadenceSubcommand::List => list(root, json),
        CadenceSubcommand::Show { slug } => show(root, &slug, json),
        CadenceSubcommand::Pause { slug } => set_active(root, &slug, false, json),
        CadenceSubcommand::Resume { slug } => set_active(root, &slug, true, json),
    }
}

/// Split `key=value`. Values that parse as JSON keep their type; anything
/// else is stored as a string.
fn parse_param(raw: &str) -> anyhow::Result<(String, serde_json::Value)> {
    let (key, value) = raw
        .split_once('=')
        .with_context(|| format!("expected key=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("empty parameter name in '{raw}'");
    }
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn create(
    root: &Path,
    slug: &str,
    group: &str,
    frequency: Option<f64>,
    params: &[String],
    json: bool,
) -> anyhow::Result<()> {
    let mut cadence = Cadence::new(slug, group);
    for raw in params {
        let (key, value) = parse_param(raw)?;
        cadence.parameters.insert(key, value);
    }
    if let Some(hours) = frequency {
        cadence = cadence.with_frequency(hours);
    }

    let db = open_db(root)?;
    db.create_cadence(&cadence)
        .with_context(|| format!("failed to create cadence '{slug}'"))?;

    if json {
        print_json(&cadence)?;
    } else {
        println!("Created cadence '{slug}' for group '{group}'.");
        if !cadence.parameters.contains_key(CADENCE_FREQUENCY) {
            println!("  note: no {CADENCE_FREQUENCY} set; runs will fail until one is added");
        }
    }
    Ok(())
}

fn describe_frequency(cadence: &Cadence) -> String {
    match cadence.frequency_hours() {
        Ok(hours) => format!("{hours}h"),
        Err(_) => "-".to_string(),
    }
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let db = open_db(root)?;
    let cadences = db.list_cadences().context("failed to list cadences")?;

    if json {
        return print_json(&cadences);
    }

    if cadences.is_empty() {
        println!("No cadences.");
        return Ok(());
    }

    let rows = cadences
        .iter()
        .map(|c| {
            vec![
                c.slug.clone(),
                c.group.clone(),
                describe_frequency(c),
                if c.active { "active" } else { "paused" }.to_string(),
                c.last_run_at
                    .as_ref()
                    .map(short_time)
                    .unwrap_or_else(|| "-".to_string()),
                c.last_outcome.clone().unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();
    print_table(
        &["SLUG", "GROUP", "FREQUENCY", "STATE", "LAST RUN", "LAST OUTCOME"],
        rows,
    );
    Ok(())
}

fn show(root: &Path, slug: &str, json: bool) -> anyhow::Result<()> {
    let db = open_db(root)?;
    let cadence = db.get_cadence(slug)?;

    if json {
        return print_json(&cadence);
    }

    println!("Cadence:   {}", cadence.slug);
    println!("Group:     {}", cadence.group);
    println!("Frequency: {}", describe_frequency(&cadence));
    println!(
        "State:     {}",
        if cadence.active { "active" } else { "paused" }
    );
    if let Some(at) = &cadence.last_run_at {
        println!(
            "Last run:  {} ({})",
            at.to_rfc3339(),
            cadence.last_outcome.as_deref().unwrap_or("-")
        );
    }
    println!(
        "Parameters:\n{}",
        serde_json::to_string_pretty(&cadence.parameters)?
    );
    Ok(())
}

fn set_active(root: &Path, slug: &str, active: bool, json: bool) -> anyhow::Result<()> {
    let db = open_db(root)?;
    db.set_cadence_active(slug, active)
        .with_context(|| format!("failed to save cadence '{slug}'"))?;

    let state = if active { "active" } else { "paused" };
    if json {
        print_json(&serde_json::json!({ "slug": slug, "state": state }))?;
    } else {
        println!("Cadence '{slug}' is now {state}.");
    }
    Ok(())
}
