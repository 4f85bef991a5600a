//! Meal composition engine.
//!
//! Drives an in-progress meal through `Capturing → Analyzing → Reviewing
//! → {Saved, Discarded}`. While reviewing, every portion edit recomputes
//! the affected item and the meal totals immediately, so the totals
//! invariant holds at all times.

use chrono::{DateTime, Utc};
use mealtrace_shared::{foods, nutrition, FoodItem, MealType, Nutrients};
use tracing::debug;
use uuid::Uuid;

use crate::error::{ClientError, Result};

/// Composer lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposerState {
    Capturing,
    Analyzing,
    Reviewing,
    Saved,
    Discarded,
}

/// A finished draft handed to the sync coordinator for saving.
///
/// `edit_of` distinguishes a brand-new meal from an edit of an existing
/// saved record; the save semantics differ between the two.
#[derive(Debug, Clone, PartialEq)]
pub struct MealDraft {
    pub meal_type: MealType,
    pub eaten_at: DateTime<Utc>,
    pub items: Vec<FoodItem>,
    pub totals: Nutrients,
    pub image_ref: Option<String>,
    pub edit_of: Option<Uuid>,
}

/// One in-progress meal.
pub struct MealComposer {
    state: ComposerState,
    meal_type: MealType,
    eaten_at: DateTime<Utc>,
    items: Vec<FoodItem>,
    totals: Nutrients,
    image_ref: Option<String>,
    edit_of: Option<Uuid>,
}

impl MealComposer {
    /// Start composing a new meal from a captured photo.
    pub fn new(meal_type: MealType) -> Self {
        Self {
            state: ComposerState::Capturing,
            meal_type,
            eaten_at: Utc::now(),
            items: Vec::new(),
            totals: Nutrients::ZERO,
            image_ref: None,
            edit_of: None,
        }
    }

    /// Start composing as an edit of an already saved record. Opens
    /// directly in Reviewing with the record's current contents.
    pub fn edit_existing(record: &mealtrace_shared::MealRecord) -> Self {
        Self {
            state: ComposerState::Reviewing,
            meal_type: record.meal_type,
            eaten_at: record.eaten_at,
            items: record.items.clone(),
            totals: record.totals,
            image_ref: record.image_ref.clone(),
            edit_of: Some(record.local_id),
        }
    }

    pub fn state(&self) -> ComposerState {
        self.state
    }

    pub fn items(&self) -> &[FoodItem] {
        &self.items
    }

    pub fn totals(&self) -> Nutrients {
        self.totals
    }

    /// Whether this draft edits an existing saved record.
    pub fn is_edit(&self) -> bool {
        self.edit_of.is_some()
    }

    /// Mark the image analysis as dispatched.
    pub fn begin_analysis(&mut self, image_ref: Option<String>) -> Result<()> {
        self.expect(ComposerState::Capturing, "Capturing")?;
        self.image_ref = image_ref;
        self.state = ComposerState::Analyzing;
        Ok(())
    }

    /// Accept analysis output (AI-derived or the canned fallback) and
    /// enter Reviewing.
    pub fn finish_analysis(&mut self, items: Vec<FoodItem>) -> Result<()> {
        self.expect(ComposerState::Analyzing, "Analyzing")?;
        self.items = items;
        self.recompute();
        self.state = ComposerState::Reviewing;
        Ok(())
    }

    /// Adjust one item's portion weight; item nutrition and meal totals
    /// are recomputed immediately.
    pub fn set_item_weight(&mut self, item_id: Uuid, grams: f64) -> Result<()> {
        self.expect(ComposerState::Reviewing, "Reviewing")?;
        if let Some(item) = self.items.iter_mut().find(|i| i.id == item_id) {
            item.set_weight(grams);
        }
        self.recompute();
        Ok(())
    }

    pub fn remove_item(&mut self, item_id: Uuid) -> Result<()> {
        self.expect(ComposerState::Reviewing, "Reviewing")?;
        self.items.retain(|i| i.id != item_id);
        self.recompute();
        Ok(())
    }

    /// Add a manually named item. The name is resolved against the food
    /// reference table; unmatched names get the generic estimate and the
    /// item is flagged as a manual override.
    pub fn add_manual_item(&mut self, name: &str, grams: f64) -> Result<&FoodItem> {
        self.expect(ComposerState::Reviewing, "Reviewing")?;
        let (per_100g, matched) = foods::lookup_or_generic(name);
        debug!(name, matched, "adding manual item");
        self.items
            .push(FoodItem::new(name.trim(), per_100g, grams, 0.0, true));
        self.recompute();
        Ok(self.items.last().unwrap())
    }

    pub fn set_meal_type(&mut self, meal_type: MealType) -> Result<()> {
        self.expect(ComposerState::Reviewing, "Reviewing")?;
        self.meal_type = meal_type;
        Ok(())
    }

    /// Produce the draft for saving. Rejects an empty meal before any
    /// state change; the composer stays in Reviewing so the user can add
    /// items and retry.
    pub fn draft(&self) -> Result<MealDraft> {
        self.expect(ComposerState::Reviewing, "Reviewing")?;
        if self.items.is_empty() {
            return Err(ClientError::EmptyMeal);
        }
        Ok(MealDraft {
            meal_type: self.meal_type,
            eaten_at: self.eaten_at,
            items: self.items.clone(),
            totals: self.totals,
            image_ref: self.image_ref.clone(),
            edit_of: self.edit_of,
        })
    }

    /// Transition to Saved after the coordinator committed the draft.
    pub fn mark_saved(&mut self) -> Result<()> {
        self.expect(ComposerState::Reviewing, "Reviewing")?;
        self.state = ComposerState::Saved;
        Ok(())
    }

    pub fn discard(&mut self) {
        self.state = ComposerState::Discarded;
    }

    fn recompute(&mut self) {
        self.totals = nutrition::aggregate_meal(&self.items);
    }

    fn expect(&self, state: ComposerState, expected: &'static str) -> Result<()> {
        if self.state == state {
            Ok(())
        } else {
            Err(ClientError::InvalidComposerState { expected })
        }
    }
}
