//! Sync coordinator: local-first saves, best-effort pushes, pull merges.
//!
//! The ordering contract is strict: a record is durably committed to the
//! local store before the in-memory day cache sees it, and before any
//! push is attempted. Pushes never fail a save; they degrade to the
//! pending queue. Pulls treat the server as authoritative and merge
//! remote records into the local logs by server id first, then by a
//! narrow meal-type + time-window heuristic.

use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveDate, Utc};
use mealtrace_shared::constants::{MAX_PUSH_ATTEMPTS, MERGE_WINDOW_SECS};
use mealtrace_shared::{
    ActivityRecord, Goal, Identity, MealRecord, Nutrients, PendingPush, Profile, SyncState,
};
use mealtrace_net::{
    AuthContext, MealQuery, RemoteActivity, RemoteMeal, RemoteMealDraft, RemoteStore,
};
use mealtrace_store::{MemoryKv, RecordStore, StoreError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::composer::MealDraft;
use crate::error::{ClientError, Result};
use crate::identity::IdentityResolver;
use crate::outcome::{
    FlushStats, LinkStatus, PullOutcome, PullStats, PushOutcome, SaveOutcome, SaveReport,
};

/// Cap on full-history pulls.
const PULL_HISTORY_LIMIT: usize = 500;

/// Owns the local store, the remote boundary and the current identity.
pub struct SyncCoordinator<R: RemoteStore> {
    store: RecordStore,
    remote: R,
    resolver: IdentityResolver,
    /// Write-through cache of day logs. Only ever updated immediately
    /// after a persistence operation succeeds, so memory and durable
    /// storage never diverge after a failed write.
    days: HashMap<NaiveDate, Vec<MealRecord>>,
}

impl<R: RemoteStore> SyncCoordinator<R> {
    pub fn new(mut store: RecordStore, remote: R) -> Result<Self> {
        let resolver = IdentityResolver::load(&mut store)?;
        Ok(Self {
            store,
            remote,
            resolver,
            days: HashMap::new(),
        })
    }

    /// Open the default on-disk store, degrading to an ephemeral
    /// in-memory session (local-only forever) when storage is blocked.
    pub fn open_default(remote: R, capacity_bytes: Option<usize>) -> Result<Self> {
        match RecordStore::open_default(capacity_bytes) {
            Ok(store) => Self::new(store, remote),
            Err(StoreError::Unavailable(msg)) => {
                warn!(%msg, "local storage unavailable, running ephemeral session");
                Ok(Self::ephemeral(remote))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// A session with no durable storage at all. Never pushes or pulls.
    pub fn ephemeral(remote: R) -> Self {
        // The probe cannot fail against a fresh unbounded MemoryKv.
        let store = RecordStore::new(Box::new(MemoryKv::new(None)))
            .unwrap_or_else(|_| unreachable!("in-memory store probe cannot fail"));
        Self {
            store,
            remote,
            resolver: IdentityResolver::ephemeral(),
            days: HashMap::new(),
        }
    }

    pub fn identity(&self) -> &Identity {
        self.resolver.identity()
    }

    /// Read access to the underlying store, for summary builders. The
    /// cache is write-through, so the store is never stale.
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// True when this session must never attempt sync.
    pub fn is_local_only(&self) -> bool {
        self.resolver.is_ephemeral()
    }

    fn auth(&self) -> AuthContext {
        AuthContext::from_identity(self.resolver.identity())
    }

    fn can_sync(&self) -> bool {
        !self.resolver.is_ephemeral()
    }

    // -- day logs -----------------------------------------------------------

    fn load_day(&mut self, day: NaiveDate) -> Result<Vec<MealRecord>> {
        if let Some(log) = self.days.get(&day) {
            return Ok(log.clone());
        }
        let log = self.store.day_log(day)?;
        self.days.insert(day, log.clone());
        Ok(log)
    }

    /// The day's meals in storage order (eaten-at ascending after a pull).
    pub fn day_log(&mut self, day: NaiveDate) -> Result<Vec<MealRecord>> {
        self.load_day(day)
    }

    /// The day's meals for display: most recent first. Display order is
    /// independent of storage order.
    pub fn day_meals_for_display(&mut self, day: NaiveDate) -> Result<Vec<MealRecord>> {
        let mut log = self.load_day(day)?;
        log.sort_by(|a, b| b.eaten_at.cmp(&a.eaten_at));
        Ok(log)
    }

    fn commit_day(&mut self, day: NaiveDate, log: Vec<MealRecord>) -> Result<()> {
        // Durable write first; the cache only sees the new log once the
        // write has succeeded.
        self.store.put_day_log(day, &log)?;
        self.days.insert(day, log);
        Ok(())
    }

    fn update_record<F>(&mut self, day: NaiveDate, local_id: Uuid, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut MealRecord),
    {
        let mut log = self.load_day(day)?;
        match log.iter_mut().find(|m| m.local_id == local_id) {
            Some(record) => mutate(record),
            // Tolerated: the record was deleted while a push was in
            // flight; its completion is a no-op.
            None => return Ok(()),
        }
        self.commit_day(day, log)
    }

    // -- save ---------------------------------------------------------------

    /// Commit a composed draft. Dispatches on whether the draft edits an
    /// existing saved record; rejects empty drafts before touching any
    /// state.
    pub async fn save(&mut self, draft: MealDraft) -> Result<SaveReport> {
        if draft.items.is_empty() {
            return Err(ClientError::EmptyMeal);
        }
        match draft.edit_of {
            None => self.save_new(draft).await,
            Some(target) => self.save_edit(target, draft).await,
        }
    }

    /// Save a draft as a brand-new record.
    ///
    /// The local id is freshly generated at save time, never taken from
    /// the draft, so saving the same draft twice cannot collide. The
    /// push afterwards is best-effort: a failure queues the record and
    /// the save still reports success.
    async fn save_new(&mut self, draft: MealDraft) -> Result<SaveReport> {
        let mut record = MealRecord {
            local_id: Uuid::new_v4(),
            server_id: None,
            meal_type: draft.meal_type,
            eaten_at: draft.eaten_at,
            created_at: Utc::now(),
            items: draft.items,
            totals: Nutrients::ZERO,
            image_ref: draft.image_ref,
            sync_state: SyncState::LocalOnly,
        };
        record.recompute_totals();

        let day = record.day_key();
        let local_id = record.local_id;
        let mut log = self.load_day(day)?;
        log.push(record);
        self.commit_day(day, log)?;

        debug!(%local_id, %day, "meal committed locally");

        let push = self.push_record(day, local_id).await?;
        Ok(SaveReport {
            local_id,
            outcome: SaveOutcome::Saved,
            push,
        })
    }

    /// Replace an existing record in place, preserving its identity.
    ///
    /// If the target is gone (deleted out-of-band), the edit falls back
    /// to a new save and the report says so.
    async fn save_edit(&mut self, target: Uuid, draft: MealDraft) -> Result<SaveReport> {
        let day = draft.eaten_at.date_naive();
        let mut log = self.load_day(day)?;

        let Some(idx) = log.iter().position(|m| m.local_id == target) else {
            warn!(%target, "edit target missing, saving as new record");
            let mut report = self.save_new(draft).await?;
            report.outcome = SaveOutcome::SavedAsNew;
            return Ok(report);
        };

        let original = &log[idx];
        let mut updated = MealRecord {
            local_id: original.local_id,
            server_id: original.server_id.clone(),
            meal_type: draft.meal_type,
            eaten_at: draft.eaten_at,
            created_at: original.created_at,
            items: draft.items,
            totals: Nutrients::ZERO,
            image_ref: draft.image_ref.or_else(|| original.image_ref.clone()),
            sync_state: original.sync_state,
        };
        updated.recompute_totals();
        log[idx] = updated;
        self.commit_day(day, log)?;

        Ok(SaveReport {
            local_id: target,
            outcome: SaveOutcome::Saved,
            // The remote surface has no update operation; edits stay
            // local and reconcile via the next pull.
            push: PushOutcome::Skipped,
        })
    }

    /// Delete a meal locally, then best-effort on the server.
    pub async fn delete_meal(&mut self, day: NaiveDate, local_id: Uuid) -> Result<bool> {
        let mut log = self.load_day(day)?;
        let Some(idx) = log.iter().position(|m| m.local_id == local_id) else {
            return Ok(false);
        };
        let removed = log.remove(idx);
        self.commit_day(day, log)?;

        if let Some(server_id) = removed.server_id {
            if self.can_sync() {
                if let Err(e) = self.remote.delete_meal(&self.auth(), &server_id).await {
                    warn!(error = %e, server_id, "remote delete failed, row will linger server-side");
                }
            }
        }
        Ok(true)
    }

    // -- push ---------------------------------------------------------------

    async fn push_record(&mut self, day: NaiveDate, local_id: Uuid) -> Result<PushOutcome> {
        if !self.can_sync() {
            return Ok(PushOutcome::Skipped);
        }
        let log = self.load_day(day)?;
        let Some(record) = log.into_iter().find(|m| m.local_id == local_id) else {
            return Ok(PushOutcome::Skipped);
        };

        let auth = self.auth();
        let draft = RemoteMealDraft::from_record(&record);
        match self.remote.create_meal(&auth, &draft).await {
            Ok(remote_meal) => {
                let server_id = remote_meal.id;
                self.update_record(day, local_id, |m| {
                    m.server_id = Some(server_id.clone());
                    m.sync_state = SyncState::Synced;
                })?;
                Ok(PushOutcome::Synced)
            }
            Err(e) => {
                warn!(error = %e, %local_id, "meal push failed, queueing for retry");
                self.update_record(day, local_id, |m| m.sync_state = SyncState::Pending)?;
                self.enqueue_pending(day, local_id)?;
                Ok(PushOutcome::Queued)
            }
        }
    }

    fn enqueue_pending(&mut self, day: NaiveDate, local_id: Uuid) -> Result<()> {
        let log = self.load_day(day)?;
        let Some(record) = log.into_iter().find(|m| m.local_id == local_id) else {
            return Ok(());
        };
        let mut queue = self.store.pending_queue()?;
        queue.push(PendingPush {
            record,
            attempts: 0,
        });
        // Best-effort: the record itself is already safely persisted; a
        // lost queue entry only costs a retry opportunity.
        if let Err(e) = self.store.set_pending_queue(&queue) {
            warn!(error = %e, "could not persist pending queue entry");
        }
        Ok(())
    }

    /// Retry sweep over the pending queue, run on startup and on a timer.
    ///
    /// Entries are processed strictly in insertion order; each entry's
    /// failure is independent and entries are dropped once they exhaust
    /// their attempts.
    pub async fn flush_pending(&mut self) -> Result<FlushStats> {
        let mut stats = FlushStats::default();
        if !self.can_sync() {
            return Ok(stats);
        }
        let queue = self.store.pending_queue()?;
        if queue.is_empty() {
            return Ok(stats);
        }

        let auth = self.auth();
        let mut remaining = Vec::new();
        for mut entry in queue {
            let draft = RemoteMealDraft::from_record(&entry.record);
            match self.remote.create_meal(&auth, &draft).await {
                Ok(remote_meal) => {
                    stats.delivered += 1;
                    let day = entry.record.day_key();
                    let server_id = remote_meal.id;
                    self.update_record(day, entry.record.local_id, |m| {
                        m.server_id = Some(server_id.clone());
                        m.sync_state = SyncState::Synced;
                    })?;
                }
                Err(e) => {
                    entry.attempts += 1;
                    if entry.attempts >= MAX_PUSH_ATTEMPTS {
                        warn!(
                            local_id = %entry.record.local_id,
                            attempts = entry.attempts,
                            "dropping queued push after repeated failures"
                        );
                        stats.dropped += 1;
                    } else {
                        debug!(
                            error = %e,
                            local_id = %entry.record.local_id,
                            attempts = entry.attempts,
                            "queued push failed again"
                        );
                        stats.requeued += 1;
                        remaining.push(entry);
                    }
                }
            }
        }
        self.store.set_pending_queue(&remaining)?;
        Ok(stats)
    }

    // -- pull ---------------------------------------------------------------

    /// Fetch the remote meal history and merge it into the local logs.
    ///
    /// A fetch failure is soft: the user stays offline-capable and local
    /// state remains authoritative for the session.
    pub async fn pull_meals(&mut self) -> Result<PullOutcome> {
        if !self.can_sync() {
            return Ok(PullOutcome::Skipped);
        }
        let auth = self.auth();
        let remotes = match self
            .remote
            .list_meals(&auth, &MealQuery::history(PULL_HISTORY_LIMIT))
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "meal pull failed, keeping local state");
                return Ok(PullOutcome::Failed);
            }
        };

        let mut by_day: BTreeMap<NaiveDate, Vec<RemoteMeal>> = BTreeMap::new();
        for r in remotes {
            by_day.entry(r.eaten_at.date_naive()).or_default().push(r);
        }

        let mut stats = PullStats::default();
        for (day, group) in by_day {
            let mut log = self.load_day(day)?;
            for remote_meal in group {
                if merge_remote_meal(&mut log, remote_meal) {
                    stats.merged += 1;
                } else {
                    stats.inserted += 1;
                }
            }
            // Storage order is eaten-at ascending; display order is the
            // caller's concern.
            log.sort_by_key(|m| m.eaten_at);
            self.commit_day(day, log)?;
        }

        info!(merged = stats.merged, inserted = stats.inserted, "meal pull applied");
        Ok(PullOutcome::Applied(stats))
    }

    /// Refresh a single day's activity row; remote wins when present.
    pub async fn refresh_activity(&mut self, day: NaiveDate) -> Result<PullOutcome> {
        if !self.can_sync() {
            return Ok(PullOutcome::Skipped);
        }
        let auth = self.auth();
        match self.remote.get_activity(&auth, day).await {
            Ok(Some(row)) => {
                self.store.set_activity(&row.into_record())?;
                Ok(PullOutcome::Applied(PullStats {
                    merged: 1,
                    inserted: 0,
                }))
            }
            Ok(None) => Ok(PullOutcome::Applied(PullStats::default())),
            Err(e) => {
                warn!(error = %e, %day, "activity refresh failed, keeping local state");
                Ok(PullOutcome::Failed)
            }
        }
    }

    /// Pull activity rows; remote wins outright per day.
    pub async fn pull_activity(&mut self) -> Result<PullOutcome> {
        if !self.can_sync() {
            return Ok(PullOutcome::Skipped);
        }
        let auth = self.auth();
        match self.remote.list_activity(&auth, PULL_HISTORY_LIMIT).await {
            Ok(rows) => {
                let mut stats = PullStats::default();
                for row in rows {
                    self.store.set_activity(&row.into_record())?;
                    stats.merged += 1;
                }
                Ok(PullOutcome::Applied(stats))
            }
            Err(e) => {
                warn!(error = %e, "activity pull failed, keeping local state");
                Ok(PullOutcome::Failed)
            }
        }
    }

    /// Pull the goal row; remote wins when present.
    pub async fn pull_goal(&mut self) -> Result<PullOutcome> {
        if !self.can_sync() {
            return Ok(PullOutcome::Skipped);
        }
        let auth = self.auth();
        match self.remote.get_goal(&auth).await {
            Ok(Some(goal)) => {
                self.store.set_goal(&goal)?;
                Ok(PullOutcome::Applied(PullStats {
                    merged: 1,
                    inserted: 0,
                }))
            }
            Ok(None) => Ok(PullOutcome::Applied(PullStats::default())),
            Err(e) => {
                warn!(error = %e, "goal pull failed, keeping local state");
                Ok(PullOutcome::Failed)
            }
        }
    }

    /// Startup/login sweep: retry queued pushes, then pull everything.
    pub async fn sync_all(&mut self) -> Result<()> {
        self.flush_pending().await?;
        self.pull_goal().await?;
        self.pull_meals().await?;
        self.pull_activity().await?;
        Ok(())
    }

    // -- identity -----------------------------------------------------------

    /// Record a login and link the anonymous history once if needed.
    ///
    /// The link call fires at most once per login transition and is never
    /// retried automatically; a failure is a soft warning only.
    pub async fn login(&mut self, account_id: &str, token: &str) -> Result<LinkStatus> {
        let device_id = self.resolver.identity().device_id.clone();
        self.resolver
            .set_logged_in(&mut self.store, account_id, token)?;

        if self.resolver.is_ephemeral() {
            return Ok(LinkStatus::Skipped);
        }
        if device_id == account_id {
            return Ok(LinkStatus::NotNeeded);
        }

        match self.remote.link_legacy(&self.auth(), &device_id).await {
            Ok(()) => {
                info!(device_id, account_id, "legacy history linked to account");
                Ok(LinkStatus::Linked)
            }
            Err(e) => {
                warn!(
                    error = %e,
                    device_id,
                    "legacy link failed; anonymous history stays under the device id"
                );
                Ok(LinkStatus::Failed)
            }
        }
    }

    pub fn logout(&mut self) -> Result<()> {
        self.resolver.set_logged_out(&mut self.store)
    }

    // -- goal & activity ------------------------------------------------------

    pub fn goal(&self) -> Result<Option<Goal>> {
        Ok(self.store.goal()?)
    }

    /// Derive targets from profile inputs, persist the goal and push it
    /// best-effort.
    pub async fn set_profile(&mut self, profile: Profile) -> Result<Goal> {
        let goal = Goal::from_profile(profile, Utc::now());
        self.store.set_goal(&goal)?;

        if self.can_sync() {
            if let Err(e) = self.remote.set_goal(&self.auth(), &goal).await {
                warn!(error = %e, "goal push failed, will reconcile on next pull");
            }
        }
        Ok(goal)
    }

    /// UI language for analysis prompts and food names; defaults to
    /// English until the user picks one.
    pub fn language(&self) -> Result<String> {
        Ok(self.store.language()?.unwrap_or_else(|| "en".to_string()))
    }

    pub fn set_language(&mut self, lang: &str) -> Result<()> {
        Ok(self.store.set_language(lang)?)
    }

    pub fn activity(&self, day: NaiveDate) -> Result<Option<ActivityRecord>> {
        Ok(self.store.activity(day)?)
    }

    /// Record activity locally, then best-effort on the server.
    pub async fn log_activity(&mut self, mut record: ActivityRecord) -> Result<()> {
        record.sync_state = SyncState::LocalOnly;
        self.store.set_activity(&record)?;

        if self.can_sync() {
            let auth = self.auth();
            match self
                .remote
                .set_activity(&auth, &RemoteActivity::from_record(&record))
                .await
            {
                Ok(()) => {
                    record.sync_state = SyncState::Synced;
                    self.store.set_activity(&record)?;
                }
                Err(e) => {
                    warn!(error = %e, day = %record.day_key, "activity push failed");
                }
            }
        }
        Ok(())
    }

    // -- test access ----------------------------------------------------------

    #[cfg(test)]
    pub(crate) fn store_mut(&mut self) -> &mut RecordStore {
        &mut self.store
    }
}

impl<R: RemoteStore> std::fmt::Debug for SyncCoordinator<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncCoordinator")
            .field("device_id", &self.resolver.identity().device_id)
            .field("local_only", &self.resolver.is_ephemeral())
            .finish_non_exhaustive()
    }
}

/// Merge one remote meal into a day's log. Returns `true` when it merged
/// into an existing record, `false` when it was inserted as new.
///
/// Identity resolution, in order: exact server-id match, then the
/// heuristic (same meal type, no server id yet, local creation within
/// [`MERGE_WINDOW_SECS`] of the remote eaten-at). The heuristic covers a
/// record pushed earlier in the session whose server id never made it
/// back. On a match the remote fields overwrite the local ones; the
/// local id, creation time and image survive because the remote schema
/// does not carry them.
fn merge_remote_meal(log: &mut Vec<MealRecord>, remote: RemoteMeal) -> bool {
    if let Some(idx) = log
        .iter()
        .position(|m| m.server_id.as_deref() == Some(remote.id.as_str()))
    {
        overwrite_from_remote(&mut log[idx], remote);
        return true;
    }

    if let Some(idx) = log.iter().position(|m| {
        m.server_id.is_none()
            && m.meal_type == remote.meal_type
            && (m.created_at - remote.eaten_at).num_seconds().abs() <= MERGE_WINDOW_SECS
    }) {
        overwrite_from_remote(&mut log[idx], remote);
        return true;
    }

    log.push(record_from_remote(remote));
    false
}

fn overwrite_from_remote(local: &mut MealRecord, remote: RemoteMeal) {
    local.server_id = Some(remote.id);
    local.meal_type = remote.meal_type;
    local.eaten_at = remote.eaten_at;
    local.items = remote.items;
    local.sync_state = SyncState::Synced;
    local.recompute_totals();
}

fn record_from_remote(remote: RemoteMeal) -> MealRecord {
    let mut record = MealRecord {
        local_id: Uuid::new_v4(),
        server_id: Some(remote.id),
        meal_type: remote.meal_type,
        eaten_at: remote.eaten_at,
        created_at: remote.eaten_at,
        items: remote.items,
        totals: Nutrients::ZERO,
        image_ref: None,
        sync_state: SyncState::Synced,
    };
    record.recompute_totals();
    record
}
