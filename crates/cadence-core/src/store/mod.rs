//! Persistent state: observation records, groups, cadences and leases.
//!
//! Everything lives in one redb file (`.cadence/cadence.db`). Records are
//! the long-lived audit trail; groups and cadences reference them by id.

pub mod db;
pub mod lease;

pub use db::CadenceDb;
pub use lease::Lease;
