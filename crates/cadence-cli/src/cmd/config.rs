use crate::output::print_json;
use anyhow::Context;
use cadence_core::config::{Config, FacilityConfig, WarnLevel};
use clap::Subcommand;
use std::path::Path;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show the effective configuration
    Show,

    /// Validate the config for common mistakes
    Validate,
}

pub fn run(root: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(root, json),
        ConfigSubcommand::Validate => validate(root, json),
    }
}

fn show(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;

    if json {
        return print_json(&config);
    }

    println!("submit_timeout_secs: {}", config.submit_timeout_secs);
    println!("lease_ttl_secs:      {}", config.lease_ttl_secs);
    println!("tick_interval_secs:  {}", config.tick_interval_secs);
    if config.facilities.is_empty() {
        println!("facilities:          (none)");
    }
    for (name, facility) in &config.facilities {
        match facility {
            FacilityConfig::Lco(lco) => println!(
                "facility {name}: lco at {} (credentials {})",
                lco.portal_url,
                lco.credentials_file.display()
            ),
        }
    }
    Ok(())
}

fn validate(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let warnings = config.validate();

    if json {
        let value = serde_json::json!({
            "warnings": warnings,
        });
        print_json(&value)?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }

    Ok(())
}
