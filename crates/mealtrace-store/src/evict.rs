//! Quota-pressure eviction ladder.
//!
//! Runs only when a write fails with [`KvError::Full`]. Embedded meal
//! images are the heaviest optional payload, so they are stripped in age
//! bands (older than 7, then 3, then 1, then 0 days) from both the
//! persisted day logs and the in-flight value, retrying the write between
//! bands. As a last resort the non-essential cache keys (pending sync
//! queue, activity rows) are deleted outright. If the write still fails
//! it surfaces as [`StoreError::Full`] and the caller must not update any
//! in-memory state.

use chrono::{Duration, NaiveDate};
use mealtrace_shared::constants::EVICTION_AGE_STEPS_DAYS;
use mealtrace_shared::MealRecord;

use crate::error::{Result, StoreError};
use crate::kv::{KvBackend, KvError};
use crate::records::keys;

/// Write `value` under `key`, evicting images if the backend is full.
pub(crate) fn set_with_recovery(
    kv: &mut dyn KvBackend,
    key: &str,
    value: &str,
    today: NaiveDate,
) -> Result<()> {
    match kv.set(key, value) {
        Ok(()) => return Ok(()),
        Err(KvError::Full) => {}
        Err(e) => return Err(e.into()),
    }

    tracing::warn!(key, "local storage full, evicting meal images");

    let mut in_flight = value.to_string();
    for age_days in EVICTION_AGE_STEPS_DAYS {
        let cutoff = today - Duration::days(age_days);
        strip_persisted_images(kv, key, cutoff)?;
        in_flight = strip_in_flight_images(key, &in_flight, cutoff)?;

        match kv.set(key, &in_flight) {
            Ok(()) => {
                tracing::info!(key, age_days, "write succeeded after image eviction");
                return Ok(());
            }
            Err(KvError::Full) => continue,
            Err(e) => return Err(e.into()),
        }
    }

    tracing::warn!(key, "image eviction insufficient, purging cache keys");
    purge_cache_keys(kv)?;

    match kv.set(key, &in_flight) {
        Ok(()) => Ok(()),
        Err(KvError::Full) => Err(StoreError::Full),
        Err(e) => Err(e.into()),
    }
}

/// Drop `image_ref` from every persisted day log dated at or before
/// `cutoff`, oldest day first. The in-flight `skip_key` is handled
/// separately so a half-written value is never read back.
fn strip_persisted_images(
    kv: &mut dyn KvBackend,
    skip_key: &str,
    cutoff: NaiveDate,
) -> Result<()> {
    let mut days: Vec<(NaiveDate, String)> = kv
        .keys()?
        .into_iter()
        .filter(|k| k != skip_key)
        .filter_map(|k| keys::parse_log_day(&k).map(|d| (d, k)))
        .filter(|(d, _)| *d <= cutoff)
        .collect();
    days.sort_unstable();

    for (day, log_key) in days {
        let Some(raw) = kv.get(&log_key)? else { continue };
        let mut meals: Vec<MealRecord> = serde_json::from_str(&raw)?;
        if !meals.iter().any(|m| m.image_ref.is_some()) {
            continue;
        }
        for m in &mut meals {
            m.image_ref = None;
        }
        tracing::debug!(%day, "stripped images from day log");
        kv.set(&log_key, &serde_json::to_string(&meals)?)?;
    }
    Ok(())
}

/// Strip images from the value being written, when it is itself a day log
/// old enough to fall in the current band.
fn strip_in_flight_images(key: &str, value: &str, cutoff: NaiveDate) -> Result<String> {
    let Some(day) = keys::parse_log_day(key) else {
        return Ok(value.to_string());
    };
    if day > cutoff {
        return Ok(value.to_string());
    }
    let mut meals: Vec<MealRecord> = serde_json::from_str(value)?;
    for m in &mut meals {
        m.image_ref = None;
    }
    Ok(serde_json::to_string(&meals)?)
}

/// Delete the non-essential cache keys: the pending sync queue and every
/// per-day activity row. Meal logs and the goal are never deleted here.
fn purge_cache_keys(kv: &mut dyn KvBackend) -> Result<()> {
    kv.remove(keys::PENDING_QUEUE)?;
    let activity_keys: Vec<String> = kv
        .keys()?
        .into_iter()
        .filter(|k| k.starts_with(keys::ACTIVITY_PREFIX))
        .collect();
    for k in activity_keys {
        kv.remove(&k)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mealtrace_shared::{FoodItem, MealType, Nutrients, SyncState};
    use uuid::Uuid;

    use crate::memory::MemoryKv;
    use crate::records::RecordStore;

    fn meal_with_image(eaten_at: chrono::DateTime<Utc>, image_bytes: usize) -> MealRecord {
        let mut m = MealRecord {
            local_id: Uuid::new_v4(),
            server_id: None,
            meal_type: MealType::Dinner,
            eaten_at,
            created_at: eaten_at,
            items: vec![FoodItem::new(
                "tofu",
                Nutrients::new(76.0, 8.1, 1.9, 4.8),
                200.0,
                0.8,
                false,
            )],
            totals: Nutrients::ZERO,
            image_ref: Some("x".repeat(image_bytes)),
            sync_state: SyncState::LocalOnly,
        };
        m.recompute_totals();
        m
    }

    /// Fill a store with a 10-day spread of image-bearing logs, then force
    /// a save past capacity and check the ladder converges and strips
    /// oldest-first.
    #[test]
    fn eviction_converges_and_strips_oldest_first() {
        let now = Utc::now();
        let today = now.date_naive();

        // Build logs first in an unbounded store to learn their size, then
        // replay into a bounded one that is nearly full.
        let mut store = RecordStore::new(Box::new(MemoryKv::new(Some(60_000)))).unwrap();
        for days_ago in 1..=10 {
            let at = now - Duration::days(days_ago);
            store
                .put_day_log(at.date_naive(), &[meal_with_image(at, 5_000)])
                .unwrap();
        }

        // This write exceeds capacity and must trigger the ladder.
        store
            .put_day_log(today, &[meal_with_image(now, 5_000)])
            .unwrap();

        // The save landed.
        assert_eq!(store.day_log(today).unwrap().len(), 1);

        // Images must form a contiguous newest-days suffix: no day with an
        // image may be older than a day without one.
        let mut saw_image = false;
        for days_ago in (1..=10).rev() {
            let day = (now - Duration::days(days_ago)).date_naive();
            let has_image = store.day_log(day).unwrap()[0].image_ref.is_some();
            if has_image {
                saw_image = true;
            } else {
                assert!(
                    !saw_image,
                    "day {days_ago} days ago lost its image after a newer day kept one"
                );
            }
        }
    }

    #[test]
    fn ladder_failure_reports_full_and_leaves_store_intact() {
        // Capacity too small for the value even after every eviction step.
        let mut store = RecordStore::new(Box::new(MemoryKv::new(Some(64)))).unwrap();
        let now = Utc::now();

        let err = store
            .put_day_log(now.date_naive(), &[meal_with_image(now, 4_000)])
            .unwrap_err();
        assert!(matches!(err, StoreError::Full));
        assert!(store.day_log(now.date_naive()).unwrap().is_empty());
    }

    #[test]
    fn last_resort_purges_pending_queue_and_activity() {
        let now = Utc::now();
        let today = now.date_naive();

        // Size the capacity so the bulky pending queue fits on its own but
        // image stripping alone cannot make room for the new day log; only
        // dropping the queue can.
        let queued = vec![mealtrace_shared::PendingPush {
            record: meal_with_image(now, 8_000),
            attempts: 0,
        }];
        let queue_bytes =
            serde_json::to_string(&queued).unwrap().len() + keys::PENDING_QUEUE.len();
        let capacity = queue_bytes + 300;

        let mut store = RecordStore::new(Box::new(MemoryKv::new(Some(capacity)))).unwrap();
        store.set_pending_queue(&queued).unwrap();

        store
            .put_day_log(today, &[meal_with_image(now, 1_000)])
            .unwrap();

        assert!(store.pending_queue().unwrap().is_empty());
        assert_eq!(store.day_log(today).unwrap().len(), 1);
    }
}
