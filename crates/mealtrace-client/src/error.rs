use thiserror::Error;

use mealtrace_store::StoreError;

/// Errors surfaced to the application layer.
///
/// Push and pull failures are deliberately absent: they degrade to
/// [`crate::outcome`] statuses instead of erroring, because the local
/// save path has already succeeded by the time the network is involved.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Save requested with zero items. Rejected synchronously before any
    /// state mutation; distinct from a meal whose totals happen to be
    /// zero.
    #[error("Cannot save a meal with no items")]
    EmptyMeal,

    /// The composer was asked to do something its current state does not
    /// allow.
    #[error("Invalid composer state: expected {expected}")]
    InvalidComposerState { expected: &'static str },

    /// Local persistence failed. `StoreError::Unavailable` and
    /// `StoreError::Full` are the two user-actionable cases ("disable
    /// private mode" / "free up storage").
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, ClientError>;
