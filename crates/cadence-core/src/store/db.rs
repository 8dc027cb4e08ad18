//! redb-backed store for records, groups, cadences and leases.
//!
//! # Table design
//!
//! ```text
//! records   [uuid: 16 bytes] → JSON ObservationRecord
//! groups    slug             → JSON ObservationGroup
//! cadences  slug             → JSON Cadence
//! leases    cadence slug     → JSON Lease
//! ```
//!
//! Every mutation that touches more than one row runs in a single write
//! transaction, so a group never references a record that was not written.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableTable, TableDefinition};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::cadence::Cadence;
use crate::error::{CadenceError, Result};
use crate::group::{sort_by_creation, ObservationGroup};
use crate::paths;
use crate::record::{ObservationRecord, Parameters};
use crate::status::ObservationStatus;

use super::lease::Lease;

// ---------------------------------------------------------------------------
// Table definitions
// ---------------------------------------------------------------------------

type SlugTable = TableDefinition<'static, &'static str, &'static [u8]>;

const RECORDS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("records");
const GROUPS: SlugTable = TableDefinition::new("groups");
const CADENCES: SlugTable = TableDefinition::new("cadences");
const LEASES: SlugTable = TableDefinition::new("leases");

fn db_err(e: impl std::fmt::Display) -> CadenceError {
    CadenceError::Db(e.to_string())
}

// ---------------------------------------------------------------------------
// CadenceDb
// ---------------------------------------------------------------------------

/// Persistent store for cadence state.
pub struct CadenceDb {
    db: Database,
}

impl CadenceDb {
    /// Open or create the redb database at `path`, creating all tables.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            crate::io::ensure_dir(parent)?;
        }
        let db = Database::create(path).map_err(db_err)?;
        let wt = db.begin_write().map_err(db_err)?;
        wt.open_table(RECORDS).map_err(db_err)?;
        for def in [GROUPS, CADENCES, LEASES] {
            wt.open_table(def).map_err(db_err)?;
        }
        wt.commit().map_err(db_err)?;
        Ok(Self { db })
    }

    // -----------------------------------------------------------------------
    // Slug-keyed helpers
    // -----------------------------------------------------------------------

    fn get_slug<T: DeserializeOwned>(&self, def: SlugTable, slug: &str) -> Result<Option<T>> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let table = rt.open_table(def).map_err(db_err)?;
        let entry = table.get(slug).map_err(db_err)?;
        match entry {
            Some(v) => Ok(Some(serde_json::from_slice(v.value())?)),
            None => Ok(None),
        }
    }

    fn list_slug<T: DeserializeOwned>(&self, def: SlugTable) -> Result<Vec<T>> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let table = rt.open_table(def).map_err(db_err)?;
        let mut result = Vec::new();
        for entry in table.iter().map_err(db_err)? {
            let (_, v) = entry.map_err(db_err)?;
            result.push(serde_json::from_slice(v.value())?);
        }
        Ok(result)
    }

    /// Insert `value` under `slug`. With `must_be_new`, an existing row makes
    /// this return `Ok(false)` without writing; otherwise it must exist.
    fn put_slug<T: Serialize>(
        &self,
        def: SlugTable,
        slug: &str,
        value: &T,
        must_be_new: bool,
    ) -> Result<bool> {
        let bytes = serde_json::to_vec(value)?;
        let wt = self.db.begin_write().map_err(db_err)?;
        let written = {
            let mut table = wt.open_table(def).map_err(db_err)?;
            let exists = table.get(slug).map_err(db_err)?.is_some();
            if exists == must_be_new {
                false
            } else {
                table.insert(slug, bytes.as_slice()).map_err(db_err)?;
                true
            }
        };
        if written {
            wt.commit().map_err(db_err)?;
        } else {
            wt.abort().map_err(db_err)?;
        }
        Ok(written)
    }

    /// Load, mutate and store the row under `slug` inside one write
    /// transaction, so concurrent writers never lose each other's fields.
    fn update_slug<T, R>(
        &self,
        def: SlugTable,
        slug: &str,
        missing: impl FnOnce() -> CadenceError,
        f: impl FnOnce(&mut T) -> R,
    ) -> Result<(T, R)>
    where
        T: Serialize + DeserializeOwned,
    {
        let wt = self.db.begin_write().map_err(db_err)?;
        let updated = {
            let mut table = wt.open_table(def).map_err(db_err)?;
            let bytes = table
                .get(slug)
                .map_err(db_err)?
                .map(|v| v.value().to_vec())
                .ok_or_else(missing)?;
            let mut value: T = serde_json::from_slice(&bytes)?;
            let result = f(&mut value);
            let bytes = serde_json::to_vec(&value)?;
            table.insert(slug, bytes.as_slice()).map_err(db_err)?;
            (value, result)
        };
        wt.commit().map_err(db_err)?;
        Ok(updated)
    }

    // -----------------------------------------------------------------------
    // Records
    // -----------------------------------------------------------------------

    pub fn insert_record(&self, record: &ObservationRecord) -> Result<()> {
        let value = serde_json::to_vec(record)?;
        let wt = self.db.begin_write().map_err(db_err)?;
        {
            let mut table = wt.open_table(RECORDS).map_err(db_err)?;
            table
                .insert(record.id.as_bytes().as_slice(), value.as_slice())
                .map_err(db_err)?;
        }
        wt.commit().map_err(db_err)?;
        Ok(())
    }

    /// Create and persist a `PENDING` record for a submitted observation.
    pub fn create_record(
        &self,
        target: &str,
        facility: &str,
        parameters: Parameters,
        observation_id: &str,
    ) -> Result<ObservationRecord> {
        let record = ObservationRecord::new(target, facility, parameters, observation_id);
        self.insert_record(&record)?;
        Ok(record)
    }

    pub fn get_record(&self, id: Uuid) -> Result<ObservationRecord> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let table = rt.open_table(RECORDS).map_err(db_err)?;
        let entry = table
            .get(id.as_bytes().as_slice())
            .map_err(db_err)?
            .ok_or(CadenceError::RecordNotFound(id))?;
        Ok(serde_json::from_slice(entry.value())?)
    }

    /// All records, oldest first.
    pub fn list_records(&self) -> Result<Vec<ObservationRecord>> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let table = rt.open_table(RECORDS).map_err(db_err)?;
        let mut result = Vec::new();
        for entry in table.iter().map_err(db_err)? {
            let (_, v) = entry.map_err(db_err)?;
            result.push(serde_json::from_slice(v.value())?);
        }
        sort_by_creation(&mut result);
        Ok(result)
    }

    /// Read, update and write a record's status in one write transaction.
    pub fn set_record_status(
        &self,
        id: Uuid,
        status: ObservationStatus,
    ) -> Result<ObservationRecord> {
        let key = id.as_bytes().as_slice();
        let wt = self.db.begin_write().map_err(db_err)?;
        let record = {
            let mut table = wt.open_table(RECORDS).map_err(db_err)?;
            let bytes = table
                .get(key)
                .map_err(db_err)?
                .map(|v| v.value().to_vec())
                .ok_or(CadenceError::RecordNotFound(id))?;
            let mut record: ObservationRecord = serde_json::from_slice(&bytes)?;
            record.set_status(status);
            let value = serde_json::to_vec(&record)?;
            table.insert(key, value.as_slice()).map_err(db_err)?;
            record
        };
        wt.commit().map_err(db_err)?;
        Ok(record)
    }

    // -----------------------------------------------------------------------
    // Groups
    // -----------------------------------------------------------------------

    pub fn create_group(&self, slug: &str) -> Result<ObservationGroup> {
        paths::validate_slug(slug)?;
        let group = ObservationGroup::new(slug);
        if !self.put_slug(GROUPS, slug, &group, true)? {
            return Err(CadenceError::GroupExists(slug.to_string()));
        }
        Ok(group)
    }

    pub fn get_group(&self, slug: &str) -> Result<ObservationGroup> {
        self.get_slug(GROUPS, slug)?
            .ok_or_else(|| CadenceError::GroupNotFound(slug.to_string()))
    }

    pub fn list_groups(&self) -> Result<Vec<ObservationGroup>> {
        let mut groups: Vec<ObservationGroup> = self.list_slug(GROUPS)?;
        groups.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(groups)
    }

    fn update_group<R>(
        &self,
        slug: &str,
        f: impl FnOnce(&mut ObservationGroup) -> R,
    ) -> Result<R> {
        let (_, result) =
            self.update_slug(GROUPS, slug, || CadenceError::GroupNotFound(slug.to_string()), f)?;
        Ok(result)
    }

    /// Add an existing record to a group. Returns `false` if already a member.
    pub fn add_to_group(&self, slug: &str, id: Uuid) -> Result<bool> {
        self.get_record(id)?;
        self.update_group(slug, |g| g.add_record(id))
    }

    /// Drop a record from a group's membership; the record itself stays.
    pub fn remove_from_group(&self, slug: &str, id: Uuid) -> Result<bool> {
        self.update_group(slug, |g| g.remove_record(id))
    }

    /// Member records, oldest first.
    pub fn group_records(&self, slug: &str) -> Result<Vec<ObservationRecord>> {
        let group = self.get_group(slug)?;
        let mut records = group
            .records
            .iter()
            .map(|id| self.get_record(*id))
            .collect::<Result<Vec<_>>>()?;
        sort_by_creation(&mut records);
        Ok(records)
    }

    /// Persist the records created by a renewal and swap group membership in
    /// one transaction: `prune` ids leave the group, `created` ids join it.
    pub fn commit_renewal(
        &self,
        slug: &str,
        prune: &[Uuid],
        created: &[ObservationRecord],
    ) -> Result<ObservationGroup> {
        let wt = self.db.begin_write().map_err(db_err)?;
        let group = {
            let mut records = wt.open_table(RECORDS).map_err(db_err)?;
            for record in created {
                let value = serde_json::to_vec(record)?;
                records
                    .insert(record.id.as_bytes().as_slice(), value.as_slice())
                    .map_err(db_err)?;
            }

            let mut groups = wt.open_table(GROUPS).map_err(db_err)?;
            let bytes = groups
                .get(slug)
                .map_err(db_err)?
                .map(|g| g.value().to_vec())
                .ok_or_else(|| CadenceError::GroupNotFound(slug.to_string()))?;
            let mut group: ObservationGroup = serde_json::from_slice(&bytes)?;
            for id in prune {
                group.remove_record(*id);
            }
            for record in created {
                group.add_record(record.id);
            }
            let bytes = serde_json::to_vec(&group)?;
            groups.insert(slug, bytes.as_slice()).map_err(db_err)?;
            group
        };
        wt.commit().map_err(db_err)?;
        Ok(group)
    }

    // -----------------------------------------------------------------------
    // Cadences
    // -----------------------------------------------------------------------

    /// Persist a new cadence. Its group must already exist.
    pub fn create_cadence(&self, cadence: &Cadence) -> Result<()> {
        paths::validate_slug(&cadence.slug)?;
        self.get_group(&cadence.group)?;
        if !self.put_slug(CADENCES, &cadence.slug, cadence, true)? {
            return Err(CadenceError::CadenceExists(cadence.slug.clone()));
        }
        Ok(())
    }

    pub fn get_cadence(&self, slug: &str) -> Result<Cadence> {
        self.get_slug(CADENCES, slug)?
            .ok_or_else(|| CadenceError::CadenceNotFound(slug.to_string()))
    }

    /// Overwrite an existing cadence.
    pub fn save_cadence(&self, cadence: &Cadence) -> Result<()> {
        if !self.put_slug(CADENCES, &cadence.slug, cadence, false)? {
            return Err(CadenceError::CadenceNotFound(cadence.slug.clone()));
        }
        Ok(())
    }

    /// Mutate a stored cadence in place. Fields the closure leaves alone keep
    /// whatever was committed last, even if that happened after the caller
    /// last read the cadence.
    pub fn update_cadence(&self, slug: &str, f: impl FnOnce(&mut Cadence)) -> Result<Cadence> {
        let (cadence, ()) = self.update_slug(
            CADENCES,
            slug,
            || CadenceError::CadenceNotFound(slug.to_string()),
            f,
        )?;
        Ok(cadence)
    }

    /// Stamp a run's bookkeeping onto the stored cadence.
    pub fn record_outcome(&self, slug: &str, summary: impl Into<String>) -> Result<Cadence> {
        let summary = summary.into();
        self.update_cadence(slug, |c| c.record_outcome(summary))
    }

    pub fn set_cadence_active(&self, slug: &str, active: bool) -> Result<Cadence> {
        self.update_cadence(slug, |c| c.set_active(active))
    }

    pub fn list_cadences(&self) -> Result<Vec<Cadence>> {
        let mut cadences: Vec<Cadence> = self.list_slug(CADENCES)?;
        cadences.sort_by(|a, b| a.slug.cmp(&b.slug));
        Ok(cadences)
    }

    pub fn active_cadences(&self) -> Result<Vec<Cadence>> {
        Ok(self
            .list_cadences()?
            .into_iter()
            .filter(|c| c.active)
            .collect())
    }

    // -----------------------------------------------------------------------
    // Leases
    // -----------------------------------------------------------------------

    /// Take the lease on `slug` for `holder` unless someone else holds a live one.
    pub fn try_acquire_lease(&self, slug: &str, holder: Uuid, ttl: Duration) -> Result<bool> {
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| CadenceError::Configuration(format!("lease ttl out of range: {e}")))?;

        let wt = self.db.begin_write().map_err(db_err)?;
        let acquired = {
            let mut table = wt.open_table(LEASES).map_err(db_err)?;
            let existing = table
                .get(slug)
                .map_err(db_err)?
                .map(|v| v.value().to_vec());
            let available = match existing {
                Some(bytes) => {
                    let lease: Lease = serde_json::from_slice(&bytes)?;
                    lease.is_available_to(holder, now)
                }
                None => true,
            };
            if available {
                let value = serde_json::to_vec(&Lease::new(holder, now, ttl))?;
                table.insert(slug, value.as_slice()).map_err(db_err)?;
            }
            available
        };
        if acquired {
            wt.commit().map_err(db_err)?;
        } else {
            wt.abort().map_err(db_err)?;
        }
        Ok(acquired)
    }

    /// Release the lease on `slug` if `holder` owns it.
    pub fn release_lease(&self, slug: &str, holder: Uuid) -> Result<bool> {
        let wt = self.db.begin_write().map_err(db_err)?;
        let released = {
            let mut table = wt.open_table(LEASES).map_err(db_err)?;
            let existing = table
                .get(slug)
                .map_err(db_err)?
                .map(|v| v.value().to_vec());
            match existing {
                Some(bytes) => {
                    let lease: Lease = serde_json::from_slice(&bytes)?;
                    if lease.holder == holder {
                        table.remove(slug).map_err(db_err)?;
                        true
                    } else {
                        false
                    }
                }
                None => false,
            }
        };
        wt.commit().map_err(db_err)?;
        Ok(released)
    }

    pub fn get_lease(&self, slug: &str) -> Result<Option<Lease>> {
        self.get_slug(LEASES, slug)
    }

    /// Drop every lease that expired before `now`. Returns the number removed.
    pub fn clear_expired_leases(&self, now: DateTime<Utc>) -> Result<u32> {
        let wt = self.db.begin_write().map_err(db_err)?;
        let count = {
            let mut table = wt.open_table(LEASES).map_err(db_err)?;
            let mut expired = Vec::new();
            for entry in table.iter().map_err(db_err)? {
                let (k, v) = entry.map_err(db_err)?;
                let lease: Lease = serde_json::from_slice(v.value())?;
                if lease.is_expired(now) {
                    expired.push(k.value().to_string());
                }
            }
            for slug in &expired {
                table.remove(slug.as_str()).map_err(db_err)?;
            }
            expired.len() as u32
        };
        wt.commit().map_err(db_err)?;
        Ok(count)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn open_tmp() -> (TempDir, CadenceDb) {
        let dir = TempDir::new().unwrap();
        let db = CadenceDb::open(&dir.path().join("test.db")).unwrap();
        (dir, db)
    }

    fn params() -> Parameters {
        json!({"start": "2020-01-01T00:00:00", "end": "2020-01-02T00:00:00"})
            .as_object()
            .cloned()
            .unwrap()
    }

    #[test]
    fn create_and_get_record() {
        let (_dir, db) = open_tmp();
        let r = db.create_record("m31", "LCO", params(), "198132").unwrap();
        let loaded = db.get_record(r.id).unwrap();
        assert_eq!(loaded, r);
        assert_eq!(loaded.status.as_str(), "PENDING");
    }

    #[test]
    fn missing_record_is_not_found() {
        let (_dir, db) = open_tmp();
        let id = Uuid::new_v4();
        assert!(matches!(
            db.get_record(id),
            Err(CadenceError::RecordNotFound(x)) if x == id
        ));
    }

    #[test]
    fn set_record_status_persists() {
        let (_dir, db) = open_tmp();
        let r = db.create_record("m31", "LCO", params(), "1").unwrap();
        let updated = db.set_record_status(r.id, "WINDOW_EXPIRED".into()).unwrap();
        assert!(updated.terminal());

        let stored = db.get_record(r.id).unwrap();
        assert!(stored.terminal());
        assert_eq!(stored.observation_id, "1");
        assert_eq!(stored.created_at, r.created_at);
    }

    #[test]
    fn set_status_of_unknown_record_fails() {
        let (_dir, db) = open_tmp();
        let id = Uuid::new_v4();
        assert!(matches!(
            db.set_record_status(id, "COMPLETED".into()),
            Err(CadenceError::RecordNotFound(missing)) if missing == id
        ));
        assert!(db.list_records().unwrap().is_empty());
    }

    #[test]
    fn duplicate_group_is_rejected() {
        let (_dir, db) = open_tmp();
        db.create_group("m31").unwrap();
        assert!(matches!(
            db.create_group("m31"),
            Err(CadenceError::GroupExists(_))
        ));
    }

    #[test]
    fn invalid_group_slug_is_rejected() {
        let (_dir, db) = open_tmp();
        assert!(matches!(
            db.create_group("Bad Slug"),
            Err(CadenceError::InvalidSlug(_))
        ));
    }

    #[test]
    fn group_membership_add_remove() {
        let (_dir, db) = open_tmp();
        db.create_group("m31").unwrap();
        let r = db.create_record("m31", "LCO", params(), "1").unwrap();

        assert!(db.add_to_group("m31", r.id).unwrap());
        assert!(!db.add_to_group("m31", r.id).unwrap());
        assert_eq!(db.group_records("m31").unwrap().len(), 1);

        assert!(db.remove_from_group("m31", r.id).unwrap());
        assert!(db.group_records("m31").unwrap().is_empty());
        // The record itself survives removal from the group.
        assert!(db.get_record(r.id).is_ok());
    }

    #[test]
    fn add_unknown_record_fails() {
        let (_dir, db) = open_tmp();
        db.create_group("m31").unwrap();
        assert!(matches!(
            db.add_to_group("m31", Uuid::new_v4()),
            Err(CadenceError::RecordNotFound(_))
        ));
    }

    #[test]
    fn group_records_are_in_creation_order() {
        let (_dir, db) = open_tmp();
        db.create_group("m31").unwrap();
        let now = Utc::now();
        let mut older = ObservationRecord::new("m31", "LCO", params(), "old");
        older.created_at = now - chrono::Duration::hours(2);
        let mut newer = ObservationRecord::new("m31", "LCO", params(), "new");
        newer.created_at = now;
        db.insert_record(&newer).unwrap();
        db.insert_record(&older).unwrap();
        db.add_to_group("m31", newer.id).unwrap();
        db.add_to_group("m31", older.id).unwrap();

        let ids: Vec<_> = db
            .group_records("m31")
            .unwrap()
            .into_iter()
            .map(|r| r.observation_id)
            .collect();
        assert_eq!(ids, vec!["old", "new"]);
    }

    #[test]
    fn commit_renewal_swaps_membership_atomically() {
        let (_dir, db) = open_tmp();
        db.create_group("m31").unwrap();
        let old = db.create_record("m31", "LCO", params(), "1").unwrap();
        db.add_to_group("m31", old.id).unwrap();

        let fresh = ObservationRecord::new("m31", "LCO", params(), "2");
        let group = db
            .commit_renewal("m31", &[old.id], std::slice::from_ref(&fresh))
            .unwrap();

        assert_eq!(group.records, vec![fresh.id]);
        assert_eq!(db.get_group("m31").unwrap().records, vec![fresh.id]);
        assert_eq!(db.get_record(fresh.id).unwrap().observation_id, "2");
        assert!(db.get_record(old.id).is_ok());
    }

    #[test]
    fn commit_renewal_on_missing_group_writes_nothing() {
        let (_dir, db) = open_tmp();
        let fresh = ObservationRecord::new("m31", "LCO", params(), "2");
        assert!(db
            .commit_renewal("ghost", &[], std::slice::from_ref(&fresh))
            .is_err());
        assert!(db.get_record(fresh.id).is_err());
    }

    #[test]
    fn cadence_requires_existing_group() {
        let (_dir, db) = open_tmp();
        let c = Cadence::new("m31-72h", "m31").with_frequency(72.0);
        assert!(matches!(
            db.create_cadence(&c),
            Err(CadenceError::GroupNotFound(_))
        ));
        db.create_group("m31").unwrap();
        db.create_cadence(&c).unwrap();
        assert!(matches!(
            db.create_cadence(&c),
            Err(CadenceError::CadenceExists(_))
        ));
    }

    #[test]
    fn active_cadences_skip_paused() {
        let (_dir, db) = open_tmp();
        db.create_group("g").unwrap();
        let a = Cadence::new("a", "g").with_frequency(24.0);
        let mut b = Cadence::new("b", "g").with_frequency(24.0);
        db.create_cadence(&a).unwrap();
        db.create_cadence(&b).unwrap();
        b.set_active(false);
        db.save_cadence(&b).unwrap();

        let active: Vec<_> = db
            .active_cadences()
            .unwrap()
            .into_iter()
            .map(|c| c.slug)
            .collect();
        assert_eq!(active, vec!["a"]);
    }

    #[test]
    fn record_outcome_keeps_a_pause_made_after_the_read() {
        let (_dir, db) = open_tmp();
        db.create_group("m31").unwrap();
        db.create_cadence(&Cadence::new("m31-72h", "m31").with_frequency(72.0))
            .unwrap();

        let snapshot = db.get_cadence("m31-72h").unwrap();
        assert!(snapshot.active);
        db.set_cadence_active("m31-72h", false).unwrap();

        let stored = db.record_outcome("m31-72h", "renewed 1").unwrap();
        assert!(!stored.active);
        assert_eq!(stored.last_outcome.as_deref(), Some("renewed 1"));
        assert!(stored.last_run_at.is_some());
        assert!(!db.get_cadence("m31-72h").unwrap().active);
    }

    #[test]
    fn record_outcome_on_unknown_cadence_fails() {
        let (_dir, db) = open_tmp();
        assert!(matches!(
            db.record_outcome("ghost", "renewed 1"),
            Err(CadenceError::CadenceNotFound(_))
        ));
        assert!(matches!(
            db.set_cadence_active("ghost", false),
            Err(CadenceError::CadenceNotFound(_))
        ));
    }

    #[test]
    fn save_unknown_cadence_fails() {
        let (_dir, db) = open_tmp();
        let c = Cadence::new("ghost", "g");
        assert!(matches!(
            db.save_cadence(&c),
            Err(CadenceError::CadenceNotFound(_))
        ));
    }

    #[test]
    fn lease_excludes_second_holder_until_released() {
        let (_dir, db) = open_tmp();
        let ttl = Duration::from_secs(60);
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        assert!(db.try_acquire_lease("m31", first, ttl).unwrap());
        assert!(!db.try_acquire_lease("m31", second, ttl).unwrap());
        assert!(!db.release_lease("m31", second).unwrap());
        assert!(db.release_lease("m31", first).unwrap());
        assert!(db.try_acquire_lease("m31", second, ttl).unwrap());
    }

    #[test]
    fn leases_on_different_cadences_are_independent() {
        let (_dir, db) = open_tmp();
        let ttl = Duration::from_secs(60);
        assert!(db.try_acquire_lease("a", Uuid::new_v4(), ttl).unwrap());
        assert!(db.try_acquire_lease("b", Uuid::new_v4(), ttl).unwrap());
    }

    #[test]
    fn expired_lease_can_be_taken_over_and_cleared() {
        let (_dir, db) = open_tmp();
        let stale = Uuid::new_v4();
        assert!(db
            .try_acquire_lease("m31", stale, Duration::from_secs(0))
            .unwrap());
        assert!(db
            .try_acquire_lease("other", stale, Duration::from_secs(0))
            .unwrap());

        let cleared = db
            .clear_expired_leases(Utc::now() + chrono::Duration::seconds(1))
            .unwrap();
        assert_eq!(cleared, 2);
        assert!(db.get_lease("m31").unwrap().is_none());

        assert!(db
            .try_acquire_lease("m31", stale, Duration::from_secs(0))
            .unwrap());
        assert!(db
            .try_acquire_lease("m31", Uuid::new_v4(), Duration::from_secs(60))
            .unwrap());
    }
}
