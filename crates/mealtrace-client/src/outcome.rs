//! Explicit operation outcomes.
//!
//! Degraded paths (fallback analysis, queued pushes, edits saved as new
//! records) are normal operation, not errors, so callers branch on these
//! statuses rather than inspecting error values.

use uuid::Uuid;

/// How a save landed locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// New record created, or an edit replaced its target in place.
    Saved,
    /// The edit's target record was gone; the edit was saved as a fresh
    /// record instead. Surfaced so the UI can say "saved as new record"
    /// rather than silently losing the edit intent.
    SavedAsNew,
}

/// What happened to the post-save push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The server accepted the record and assigned it an id.
    Synced,
    /// The push failed; the record was appended to the pending queue for
    /// a later retry sweep.
    Queued,
    /// No push was attempted: the session is local-only (ephemeral
    /// identity) or has no credentials.
    Skipped,
}

/// Result of a completed save: where the record landed locally and how
/// the push went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveReport {
    pub local_id: Uuid,
    pub outcome: SaveOutcome,
    pub push: PushOutcome,
}

/// Result of a pull from the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    /// Remote records were fetched and merged.
    Applied(PullStats),
    /// Local-only session; nothing to pull.
    Skipped,
    /// The fetch failed. Local state remains authoritative for this
    /// session; the failure is logged, not surfaced.
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PullStats {
    /// Remote records merged into an existing local record.
    pub merged: usize,
    /// Remote records inserted as new local records.
    pub inserted: usize,
}

/// Result of a pending-queue retry sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    pub delivered: usize,
    pub requeued: usize,
    /// Entries discarded after exhausting their push attempts.
    pub dropped: usize,
}

/// Whether legacy-history linking ran during a login transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// The server reassigned the anonymous history to the account.
    Linked,
    /// Device id and account id already match; nothing to link.
    NotNeeded,
    /// The link call failed. Fire-once: it is not retried, the failure is
    /// surfaced as a soft warning only.
    Failed,
    /// Local-only session; linking is impossible.
    Skipped,
}
