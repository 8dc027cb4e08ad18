use crate::cmd::open_db;
use crate::output::{print_json, print_table, short_time};
use anyhow::Context;
use clap::Subcommand;
use std::path::Path;
use uuid::Uuid;

#[derive(Subcommand)]
pub enum GroupSubcommand {
    /// Create an empty observation group
    Create { slug: String },
    /// List all groups
    List,
    /// Show a group's member records, oldest first
    Show { slug: String },
    /// Add a record to a group
    Add { slug: String, record: Uuid },
    /// Remove a record from a group (the record itself is kept)
    Remove { slug: String, record: Uuid },
}

pub fn run(root: &Path, subcmd: GroupSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        GroupSubcommand::Create { slug } => create(root, &slug, json),
        GroupSubcommand::List => list(root, json),
        GroupSubcommand::Show { slug } => show(root, &slug, json),
        GroupSubcommand::Add { slug, record } => add(root, &slug, record, json),
        GroupSubcommand::Remove { slug, record } => remove(root, &slug, record, json),
    }
}

fn create(root: &Path, slug: &str, json: bool) -> anyhow::Result<()> {
    let db = open_db(root)?;
    let group = db
        .create_group(slug)
        .with_context(|| format!("failed to create group '{slug}'"))?;

    if json {
        print_json(&group)?;
    } else {
        println!("Created group '{slug}'.");
    }
    Ok(())
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let db = open_db(root)?;
    let groups = db.list_groups().context("failed to list groups")?;

    if json {
        let items: Vec<serde_json::Value> = groups
            .iter()
            .map(|g| {
                serde_json::json!({
                    "slug": g.slug,
                    "record_count": g.records.len(),
                })
            })
            .collect();
        return print_json(&items);
    }

    if groups.is_empty() {
        println!("No groups.");
        return Ok(());
    }

    let rows = groups
        .iter()
        .map(|g| {
            vec![
                g.slug.clone(),
                g.records.len().to_string(),
                short_time(&g.created_at),
            ]
        })
        .collect();
    print_table(&["SLUG", "RECORDS", "CREATED"], rows);
    Ok(())
}

fn show(root: &Path, slug: &str, json: bool) -> anyhow::Result<()> {
    let db = open_db(root)?;
    let records = db.group_records(slug)?;

    if json {
        return print_json(&serde_json::json!({
            "slug": slug,
            "records": records,
        }));
    }

    println!("Group: {slug}");
    if records.is_empty() {
        println!("  (no records)");
        return Ok(());
    }
    let rows = records
        .iter()
        .map(|r| {
            vec![
                r.id.to_string(),
                r.observation_id.clone(),
                r.status.to_string(),
                if r.terminal() { "yes" } else { "no" }.to_string(),
                short_time(&r.created_at),
            ]
        })
        .collect();
    print_table(&["ID", "OBSERVATION", "STATUS", "TERMINAL", "CREATED"], rows);
    Ok(())
}

fn add(root: &Path, slug: &str, record: Uuid, json: bool) -> anyhow::Result<()> {
    let db = open_db(root)?;
    let added = db.add_to_group(slug, record)?;

    if json {
        print_json(&serde_json::json!({ "group": slug, "record": record, "added": added }))?;
    } else if added {
        println!("Added {record} to '{slug}'.");
    } else {
        println!("{record} is already in '{slug}'.");
    }
    Ok(())
}

fn remove(root: &Path, slug: &str, record: Uuid, json: bool) -> anyhow::Result<()> {
    let db = open_db(root)?;
    let removed = db.remove_from_group(slug, record)?;

    if json {
        print_json(&serde_json::json!({ "group": slug, "record": record, "removed": removed }))?;
    } else if removed {
        println!("Removed {record} from '{slug}'.");
    } else {
        println!("{record} is not in '{slug}'.");
    }
    Ok(())
}
