pub mod cadence;
pub mod config;
pub mod group;
pub mod init;
pub mod record;
pub mod run;
pub mod sync;

use anyhow::Context;
use cadence_core::{
    config::Config, engine::CadenceEngine, facility::FacilityRegistry, paths,
    store::CadenceDb, CadenceError,
};
use std::path::Path;
use std::sync::Arc;

/// Open the store of an initialized project.
pub fn open_db(root: &Path) -> anyhow::Result<CadenceDb> {
    if !paths::cadence_dir(root).is_dir() {
        return Err(CadenceError::NotInitialized.into());
    }
    CadenceDb::open(&paths::db_path(root)).context("failed to open store")
}

/// Load the config, build the facility registry and wire up the engine.
pub fn build_engine(root: &Path) -> anyhow::Result<(Config, CadenceEngine)> {
    let config = Config::load(root).context("failed to load config")?;
    let db = Arc::new(open_db(root)?);
    let registry =
        FacilityRegistry::from_config(&config).context("failed to set up facilities")?;
    let engine = CadenceEngine::from_config(db, registry, &config);
    Ok((config, engine))
}

/// Runtime for the async engine commands.
pub fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("failed to start async runtime")
}
