use crate::cmd::{build_engine, runtime};
use crate::output::print_json;
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let (_config, engine) = build_engine(root)?;
    let report = runtime()?.block_on(cadence_core::sync::sync(&engine))?;

    if json {
        print_json(&report)?;
    } else {
        println!(
            "Checked {} observation(s): {} updated, {} failed.",
            report.checked, report.updated, report.failed
        );
    }
    Ok(())
}
