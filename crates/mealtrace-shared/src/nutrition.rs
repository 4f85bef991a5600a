//! Pure nutrition math: Mifflin-St Jeor targets, per-item derivation and
//! meal/day aggregation.
//!
//! All functions are deterministic and side-effect free.

use crate::constants::{KCAL_PER_G_CARBS, KCAL_PER_G_FAT, KCAL_PER_G_PROTEIN};
use crate::types::{FoodItem, GoalType, MealRecord, Nutrients, Profile, Sex, Targets};

/// Round to one decimal place.
fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Basal metabolic rate via Mifflin-St Jeor.
pub fn bmr(profile: &Profile) -> f64 {
    let sex_term = match profile.sex {
        Sex::Male => 5.0,
        Sex::Female => -161.0,
    };
    10.0 * profile.weight_kg + 6.25 * profile.height_cm - 5.0 * f64::from(profile.age) + sex_term
}

/// Derive daily calorie and macro targets from profile inputs.
///
/// The kcal target scales TDEE by the goal (cut 0.85, bulk 1.10,
/// maintain 1.00); the macro split is a percent-of-kcal triple per goal,
/// converted to grams with the Atwater factors. Outputs are rounded to
/// the nearest integer.
pub fn compute_targets(profile: &Profile) -> Targets {
    let tdee = bmr(profile) * profile.activity.factor();

    let (multiplier, protein_pct, carbs_pct, fat_pct) = match profile.goal_type {
        GoalType::Cut => (0.85, 0.30, 0.40, 0.30),
        GoalType::Bulk => (1.10, 0.25, 0.50, 0.25),
        GoalType::Maintain => (1.00, 0.25, 0.45, 0.30),
    };

    let kcal = tdee * multiplier;
    Targets {
        kcal: kcal.round() as u32,
        protein_g: (kcal * protein_pct / KCAL_PER_G_PROTEIN).round() as u32,
        carbs_g: (kcal * carbs_pct / KCAL_PER_G_CARBS).round() as u32,
        fat_g: (kcal * fat_pct / KCAL_PER_G_FAT).round() as u32,
    }
}

/// Nutrition for one item: `per_100g * weight / 100`, one-decimal rounded.
pub fn item_nutrition(per_100g: &Nutrients, weight_grams: f64) -> Nutrients {
    let factor = weight_grams / 100.0;
    Nutrients {
        kcal: round1(per_100g.kcal * factor),
        protein_g: round1(per_100g.protein_g * factor),
        carbs_g: round1(per_100g.carbs_g * factor),
        fat_g: round1(per_100g.fat_g * factor),
    }
}

/// Component-wise sum over a meal's items. Empty input yields zero totals.
pub fn aggregate_meal(items: &[FoodItem]) -> Nutrients {
    items
        .iter()
        .fold(Nutrients::ZERO, |acc, it| acc.add(&it.nutrition))
}

/// Component-wise sum over a day's meals. Empty input yields zero totals.
pub fn aggregate_day(meals: &[MealRecord]) -> Nutrients {
    meals
        .iter()
        .fold(Nutrients::ZERO, |acc, m| acc.add(&m.totals))
}
