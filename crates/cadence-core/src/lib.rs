pub mod cadence;
pub mod config;
pub mod engine;
pub mod error;
pub mod facility;
pub mod group;
pub mod io;
pub mod paths;
pub mod record;
pub mod status;
pub mod store;
pub mod sync;
pub mod tick;
pub mod window;

pub use error::{CadenceError, Result};
