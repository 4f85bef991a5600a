//! Typed record layer over the key-value contract.
//!
//! Every domain record lives under a well-known key (or key prefix for
//! per-day values) as a JSON string. All writes funnel through the
//! evictor-aware path in [`crate::evict`], so a capacity failure
//! automatically triggers the image-stripping ladder before it surfaces.

use chrono::{NaiveDate, Utc};
use mealtrace_shared::{ActivityRecord, Goal, Identity, MealRecord, PendingPush};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, StoreError};
use crate::evict;
use crate::kv::{probe, KvBackend};
use crate::sqlite::SqliteKv;

/// Well-known keys and key prefixes of the local store.
pub mod keys {
    use chrono::NaiveDate;

    pub const GOAL: &str = "goal";
    pub const IDENTITY: &str = "identity";
    pub const LANGUAGE: &str = "language";
    pub const PENDING_QUEUE: &str = "pending_sync";
    pub const LOG_PREFIX: &str = "log:";
    pub const ACTIVITY_PREFIX: &str = "activity:";

    pub fn log(day: NaiveDate) -> String {
        format!("{LOG_PREFIX}{}", day.format("%Y-%m-%d"))
    }

    pub fn activity(day: NaiveDate) -> String {
        format!("{ACTIVITY_PREFIX}{}", day.format("%Y-%m-%d"))
    }

    /// Parse the day out of a `log:`-prefixed key.
    pub fn parse_log_day(key: &str) -> Option<NaiveDate> {
        key.strip_prefix(LOG_PREFIX)
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
    }
}

/// Typed CRUD over a [`KvBackend`].
pub struct RecordStore {
    kv: Box<dyn KvBackend>,
}

impl RecordStore {
    /// Wrap a backend, probing it once for availability.
    ///
    /// A failed probe means storage is blocked outright and surfaces as
    /// [`StoreError::Unavailable`]; callers are expected to fall back to
    /// an ephemeral in-memory session.
    pub fn new(mut kv: Box<dyn KvBackend>) -> Result<Self> {
        probe(kv.as_mut())?;
        Ok(Self { kv })
    }

    /// Open the default on-disk store.
    pub fn open_default(capacity_bytes: Option<usize>) -> Result<Self> {
        let kv = SqliteKv::new(capacity_bytes)?;
        Self::new(Box::new(kv))
    }

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.kv.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        evict::set_with_recovery(self.kv.as_mut(), key, &raw, Utc::now().date_naive())
    }

    // -- goal ---------------------------------------------------------------

    pub fn goal(&self) -> Result<Option<Goal>> {
        self.get_json(keys::GOAL)
    }

    pub fn set_goal(&mut self, goal: &Goal) -> Result<()> {
        self.set_json(keys::GOAL, goal)
    }

    // -- meal logs ----------------------------------------------------------

    /// The day's meal log; a missing key is an empty log, never an error.
    pub fn day_log(&self, day: NaiveDate) -> Result<Vec<MealRecord>> {
        Ok(self.get_json(&keys::log(day))?.unwrap_or_default())
    }

    pub fn put_day_log(&mut self, day: NaiveDate, meals: &[MealRecord]) -> Result<()> {
        self.set_json(&keys::log(day), &meals)
    }

    /// Every day that has a stored meal log, oldest first.
    pub fn logged_days(&self) -> Result<Vec<NaiveDate>> {
        let mut days: Vec<NaiveDate> = self
            .kv
            .keys()?
            .iter()
            .filter_map(|k| keys::parse_log_day(k))
            .collect();
        days.sort_unstable();
        Ok(days)
    }

    // -- activity -----------------------------------------------------------

    pub fn activity(&self, day: NaiveDate) -> Result<Option<ActivityRecord>> {
        self.get_json(&keys::activity(day))
    }

    pub fn set_activity(&mut self, record: &ActivityRecord) -> Result<()> {
        self.set_json(&keys::activity(record.day_key), record)
    }

    // -- identity -----------------------------------------------------------

    pub fn identity(&self) -> Result<Option<Identity>> {
        self.get_json(keys::IDENTITY)
    }

    pub fn set_identity(&mut self, identity: &Identity) -> Result<()> {
        self.set_json(keys::IDENTITY, identity)
    }

    // -- language -----------------------------------------------------------

    pub fn language(&self) -> Result<Option<String>> {
        self.get_json(keys::LANGUAGE)
    }

    pub fn set_language(&mut self, lang: &str) -> Result<()> {
        self.set_json(keys::LANGUAGE, &lang)
    }

    // -- pending sync queue --------------------------------------------------

    pub fn pending_queue(&self) -> Result<Vec<PendingPush>> {
        Ok(self.get_json(keys::PENDING_QUEUE)?.unwrap_or_default())
    }

    pub fn set_pending_queue(&mut self, queue: &[PendingPush]) -> Result<()> {
        self.set_json(keys::PENDING_QUEUE, &queue)
    }
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use mealtrace_shared::{
        ActivitySource, FoodItem, MealType, Nutrients, SyncState,
    };
    use uuid::Uuid;

    use crate::memory::MemoryKv;

    fn meal(eaten_at: chrono::DateTime<Utc>) -> MealRecord {
        let items = vec![FoodItem::new(
            "rice",
            Nutrients::new(116.0, 2.6, 25.9, 0.3),
            150.0,
            0.9,
            false,
        )];
        let mut m = MealRecord {
            local_id: Uuid::new_v4(),
            server_id: None,
            meal_type: MealType::Lunch,
            eaten_at,
            created_at: eaten_at,
            items,
            totals: Nutrients::ZERO,
            image_ref: None,
            sync_state: SyncState::LocalOnly,
        };
        m.recompute_totals();
        m
    }

    fn memory_store() -> RecordStore {
        RecordStore::new(Box::new(MemoryKv::new(None))).unwrap()
    }

    #[test]
    fn unavailable_backend_surfaces_on_open() {
        let err = RecordStore::new(Box::new(MemoryKv::unavailable())).unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[test]
    fn day_log_round_trip() {
        let mut store = memory_store();
        let now = Utc::now();
        let day = now.date_naive();

        assert!(store.day_log(day).unwrap().is_empty());

        let meals = vec![meal(now), meal(now - Duration::minutes(5))];
        store.put_day_log(day, &meals).unwrap();

        let loaded = store.day_log(day).unwrap();
        assert_eq!(loaded, meals);
        assert_eq!(store.logged_days().unwrap(), vec![day]);
    }

    #[test]
    fn sqlite_save_then_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.db");
        let now = Utc::now();
        let day = now.date_naive();
        let meals = vec![meal(now)];

        {
            let kv = SqliteKv::open_at(&path, None).unwrap();
            let mut store = RecordStore::new(Box::new(kv)).unwrap();
            store.put_day_log(day, &meals).unwrap();
            store.set_language("en").unwrap();
        }

        let kv = SqliteKv::open_at(&path, None).unwrap();
        let store = RecordStore::new(Box::new(kv)).unwrap();
        let loaded = store.day_log(day).unwrap();
        assert_eq!(loaded[0].items, meals[0].items);
        assert_eq!(loaded[0].totals, meals[0].totals);
        assert_eq!(loaded[0].meal_type, meals[0].meal_type);
        assert_eq!(store.language().unwrap().as_deref(), Some("en"));
    }

    #[test]
    fn activity_and_identity_round_trip() {
        let mut store = memory_store();
        let day = Utc::now().date_naive();

        let record = ActivityRecord {
            day_key: day,
            exercise_kcal: 320.0,
            steps: 8200,
            active_minutes: 45,
            source: ActivitySource::Manual,
            sync_state: SyncState::LocalOnly,
        };
        store.set_activity(&record).unwrap();
        assert_eq!(store.activity(day).unwrap().unwrap(), record);

        let identity = Identity::anonymous("user_1700000000000_abc123");
        store.set_identity(&identity).unwrap();
        assert_eq!(store.identity().unwrap().unwrap(), identity);
    }
}
