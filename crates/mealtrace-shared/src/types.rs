//! Domain model structs shared between the store, the sync coordinator
//! and the network layer.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be written
//! to the local key-value store and sent over the wire as JSON.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::nutrition;

// ---------------------------------------------------------------------------
// Profile & targets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    Cut,
    Bulk,
    Maintain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
}

/// One of five discrete activity levels used in the TDEE multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
    VeryActive,
}

impl ActivityLevel {
    pub fn factor(self) -> f64 {
        match self {
            Self::Sedentary => 1.2,
            Self::Light => 1.375,
            Self::Moderate => 1.55,
            Self::Active => 1.725,
            Self::VeryActive => 1.9,
        }
    }
}

/// User-authored profile inputs. Targets are always derived from these,
/// never edited independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub goal_type: GoalType,
    pub sex: Sex,
    pub age: u32,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub activity: ActivityLevel,
}

/// Daily calorie and macro targets, integer-rounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Targets {
    pub kcal: u32,
    pub protein_g: u32,
    pub carbs_g: u32,
    pub fat_g: u32,
}

/// The single goal row owned by the current identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub profile: Profile,
    pub targets: Targets,
    pub updated_at: DateTime<Utc>,
}

impl Goal {
    /// Build a goal from profile inputs, deriving the targets.
    pub fn from_profile(profile: Profile, now: DateTime<Utc>) -> Self {
        let targets = nutrition::compute_targets(&profile);
        Self {
            profile,
            targets,
            updated_at: now,
        }
    }
}

// ---------------------------------------------------------------------------
// Nutrients
// ---------------------------------------------------------------------------

/// A calorie/macro quadruple, used both for per-100g reference values
/// and for derived item/meal/day totals.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Nutrients {
    pub kcal: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

impl Nutrients {
    pub const ZERO: Nutrients = Nutrients {
        kcal: 0.0,
        protein_g: 0.0,
        carbs_g: 0.0,
        fat_g: 0.0,
    };

    pub fn new(kcal: f64, protein_g: f64, carbs_g: f64, fat_g: f64) -> Self {
        Self {
            kcal,
            protein_g,
            carbs_g,
            fat_g,
        }
    }

    /// Component-wise sum.
    pub fn add(&self, other: &Nutrients) -> Nutrients {
        Nutrients {
            kcal: self.kcal + other.kcal,
            protein_g: self.protein_g + other.protein_g,
            carbs_g: self.carbs_g + other.carbs_g,
            fat_g: self.fat_g + other.fat_g,
        }
    }
}

// ---------------------------------------------------------------------------
// Food items & meals
// ---------------------------------------------------------------------------

/// A recognised or manually added food inside a meal.
///
/// `per_100g` is immutable once assigned (it comes from the vision
/// service or the reference table); `nutrition` is always derived from it
/// and `weight_grams` via [`FoodItem::set_weight`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodItem {
    pub id: Uuid,
    pub name: String,
    pub weight_grams: f64,
    /// Recognition confidence in `[0, 1]`; zero for manual/fallback items.
    pub confidence: f64,
    pub per_100g: Nutrients,
    /// Derived: `per_100g * weight_grams / 100`.
    pub nutrition: Nutrients,
    pub manual_override: bool,
}

impl FoodItem {
    pub fn new(
        name: impl Into<String>,
        per_100g: Nutrients,
        weight_grams: f64,
        confidence: f64,
        manual_override: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            weight_grams,
            confidence,
            per_100g,
            nutrition: nutrition::item_nutrition(&per_100g, weight_grams),
            manual_override,
        }
    }

    /// Change the portion weight and recompute the derived nutrition.
    pub fn set_weight(&mut self, grams: f64) {
        self.weight_grams = grams;
        self.nutrition = nutrition::item_nutrition(&self.per_100g, grams);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

/// Whether a record exists only locally, is queued for the server, or has
/// been confirmed stored server-side. `server_id = None` never means
/// deleted or invalid; it only means the push has not round-tripped yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    LocalOnly,
    Pending,
    Synced,
}

/// A saved meal. Carries both id spaces: the client-generated `local_id`
/// (stable for local lookups) and the server-assigned `server_id` (set
/// once a push succeeds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealRecord {
    pub local_id: Uuid,
    pub server_id: Option<String>,
    pub meal_type: MealType,
    pub eaten_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<FoodItem>,
    /// Derived: component-wise sum of item nutrition. Never stored
    /// independently of a recompute.
    pub totals: Nutrients,
    /// Embedded image data URI; evictable under quota pressure.
    pub image_ref: Option<String>,
    pub sync_state: SyncState,
}

impl MealRecord {
    /// Recompute `totals` from the items. Must run after every item
    /// mutation.
    pub fn recompute_totals(&mut self) {
        self.totals = nutrition::aggregate_meal(&self.items);
    }

    /// Calendar-day key this record files under.
    pub fn day_key(&self) -> NaiveDate {
        self.eaten_at.date_naive()
    }
}

// ---------------------------------------------------------------------------
// Activity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivitySource {
    Manual,
    ScreenshotRecognized,
}

/// One activity row per calendar day. No sub-items, so merges are
/// last-writer-wins at day granularity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub day_key: NaiveDate,
    pub exercise_kcal: f64,
    pub steps: u32,
    pub active_minutes: u32,
    pub source: ActivitySource,
    pub sync_state: SyncState,
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Who the local data belongs to.
///
/// `device_id` is generated once on first launch and kept forever, even
/// across logout, so an anonymous session continues from the same local
/// history and can be re-linked later. `account_id`/`auth_token` are only
/// present while logged in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub device_id: String,
    pub account_id: Option<String>,
    pub auth_token: Option<String>,
}

impl Identity {
    pub fn anonymous(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            account_id: None,
            auth_token: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.account_id.is_some() && self.auth_token.is_some()
    }
}

// ---------------------------------------------------------------------------
// Pending sync queue
// ---------------------------------------------------------------------------

/// A meal awaiting delivery to the server, with its failure count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingPush {
    pub record: MealRecord,
    pub attempts: u32,
}
