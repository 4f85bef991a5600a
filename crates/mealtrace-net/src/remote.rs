//! The remote durable-store boundary.
//!
//! Wire DTOs deliberately carry only what the server schema knows about:
//! no local id, no embedded image, no sync state. Purely-local fields
//! therefore survive a pull untouched by construction.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use mealtrace_shared::{
    ActivityRecord, ActivitySource, FoodItem, Goal, Identity, MealType, Nutrients, SyncState,
};
use serde::{Deserialize, Serialize};

use crate::error::NetError;

/// Credentials for a remote call: a bearer token once authenticated,
/// otherwise the anonymous device id header. The token is preferred when
/// both are present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    pub bearer_token: Option<String>,
    pub device_id: Option<String>,
}

impl AuthContext {
    pub fn from_identity(identity: &Identity) -> Self {
        Self {
            bearer_token: identity.auth_token.clone(),
            device_id: Some(identity.device_id.clone()),
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.bearer_token.is_some() || self.device_id.is_some()
    }
}

/// A meal as the server stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteMeal {
    /// Server-assigned id.
    pub id: String,
    pub meal_type: MealType,
    pub eaten_at: DateTime<Utc>,
    pub items: Vec<FoodItem>,
    pub totals: Nutrients,
}

/// Outbound meal payload; the server assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteMealDraft {
    pub meal_type: MealType,
    pub eaten_at: DateTime<Utc>,
    pub items: Vec<FoodItem>,
    pub totals: Nutrients,
}

impl RemoteMealDraft {
    /// Project a local record onto the remote schema.
    pub fn from_record(record: &mealtrace_shared::MealRecord) -> Self {
        Self {
            meal_type: record.meal_type,
            eaten_at: record.eaten_at,
            items: record.items.clone(),
            totals: record.totals,
        }
    }
}

/// An activity row as the server stores it, one per day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteActivity {
    pub day_key: NaiveDate,
    pub exercise_kcal: f64,
    pub steps: u32,
    pub active_minutes: u32,
    pub source: ActivitySource,
}

impl RemoteActivity {
    pub fn from_record(record: &ActivityRecord) -> Self {
        Self {
            day_key: record.day_key,
            exercise_kcal: record.exercise_kcal,
            steps: record.steps,
            active_minutes: record.active_minutes,
            source: record.source,
        }
    }

    /// Materialise a local record from the remote row. Pulled rows are by
    /// definition already on the server.
    pub fn into_record(self) -> ActivityRecord {
        ActivityRecord {
            day_key: self.day_key,
            exercise_kcal: self.exercise_kcal,
            steps: self.steps,
            active_minutes: self.active_minutes,
            source: self.source,
            sync_state: SyncState::Synced,
        }
    }
}

/// Scope of a meal listing: one day, or full history with a cap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MealQuery {
    pub day: Option<NaiveDate>,
    pub limit: Option<usize>,
}

impl MealQuery {
    pub fn for_day(day: NaiveDate) -> Self {
        Self {
            day: Some(day),
            limit: None,
        }
    }

    pub fn history(limit: usize) -> Self {
        Self {
            day: None,
            limit: Some(limit),
        }
    }
}

/// REST surface of the server of record, as consumed by the sync
/// coordinator.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn create_meal(
        &self,
        auth: &AuthContext,
        draft: &RemoteMealDraft,
    ) -> Result<RemoteMeal, NetError>;

    async fn list_meals(
        &self,
        auth: &AuthContext,
        query: &MealQuery,
    ) -> Result<Vec<RemoteMeal>, NetError>;

    async fn delete_meal(&self, auth: &AuthContext, server_id: &str) -> Result<(), NetError>;

    async fn set_goal(&self, auth: &AuthContext, goal: &Goal) -> Result<(), NetError>;

    async fn get_goal(&self, auth: &AuthContext) -> Result<Option<Goal>, NetError>;

    async fn set_activity(
        &self,
        auth: &AuthContext,
        activity: &RemoteActivity,
    ) -> Result<(), NetError>;

    async fn get_activity(
        &self,
        auth: &AuthContext,
        day: NaiveDate,
    ) -> Result<Option<RemoteActivity>, NetError>;

    async fn list_activity(
        &self,
        auth: &AuthContext,
        limit: usize,
    ) -> Result<Vec<RemoteActivity>, NetError>;

    /// Reassign all server-side rows owned by `legacy_device_id` to the
    /// currently authenticated account. Fire-once; callers must not retry
    /// automatically.
    async fn link_legacy(&self, auth: &AuthContext, legacy_device_id: &str)
        -> Result<(), NetError>;
}
