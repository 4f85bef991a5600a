//! The vision analysis boundary and its canned local fallback.

use async_trait::async_trait;
use mealtrace_shared::{foods, FoodItem, Nutrients};
use serde::Deserialize;

use crate::error::NetError;

/// Result of a successful image analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedMeal {
    pub items: Vec<FoodItem>,
    pub warnings: Vec<String>,
}

/// Opaque `AnalyzeImage(bytes, lang) -> FoodItem[]` boundary.
#[async_trait]
pub trait VisionService: Send + Sync {
    async fn analyze_image(&self, image: &[u8], language: &str) -> Result<AnalyzedMeal, NetError>;
}

/// One recognised food on the wire.
#[derive(Debug, Deserialize)]
pub(crate) struct AnalyzedFoodDto {
    pub name: String,
    #[serde(default)]
    pub confidence: f64,
    pub estimated_weight_g: f64,
    pub per_100g: Nutrients,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnalyzeResponseDto {
    pub foods: Vec<AnalyzedFoodDto>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl AnalyzeResponseDto {
    pub(crate) fn into_meal(self) -> AnalyzedMeal {
        let items = self
            .foods
            .into_iter()
            .filter(|f| !f.name.trim().is_empty())
            .map(|f| {
                FoodItem::new(
                    f.name.trim().to_string(),
                    f.per_100g,
                    f.estimated_weight_g,
                    f.confidence.clamp(0.0, 1.0),
                    false,
                )
            })
            .collect();
        AnalyzedMeal {
            items,
            warnings: self.warnings,
        }
    }
}

/// Canned food combinations used when the vision call fails.
const FALLBACK_COMBOS: &[&[(&str, f64)]] = &[
    &[("rice", 180.0), ("chicken breast", 120.0), ("broccoli", 100.0)],
    &[("egg", 110.0), ("milk", 250.0), ("banana", 120.0)],
    &[("tofu", 200.0), ("rice", 150.0), ("leafy greens", 120.0)],
];

/// Build a plausible meal from the fixed fallback list.
///
/// Items are flagged as non-AI-derived: confidence is zero and
/// `manual_override` is set, so a consumer can tell the user this is an
/// estimate, not a recognition result.
pub fn fallback_items(seed: usize) -> Vec<FoodItem> {
    let combo = FALLBACK_COMBOS[seed % FALLBACK_COMBOS.len()];
    combo
        .iter()
        .map(|(name, grams)| {
            let (per_100g, _) = foods::lookup_or_generic(name);
            FoodItem::new(*name, per_100g, *grams, 0.0, true)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_items_are_flagged_non_ai() {
        let items = fallback_items(0);
        assert!(!items.is_empty());
        for it in &items {
            assert_eq!(it.confidence, 0.0);
            assert!(it.manual_override);
            assert!(it.nutrition.kcal > 0.0);
        }
    }

    #[test]
    fn fallback_seed_cycles_combos() {
        let a = fallback_items(0);
        let b = fallback_items(1);
        assert_ne!(
            a.iter().map(|i| i.name.clone()).collect::<Vec<_>>(),
            b.iter().map(|i| i.name.clone()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn analyze_response_drops_nameless_foods() {
        let dto = AnalyzeResponseDto {
            foods: vec![
                AnalyzedFoodDto {
                    name: "  ".into(),
                    confidence: 0.9,
                    estimated_weight_g: 100.0,
                    per_100g: Nutrients::new(100.0, 5.0, 10.0, 3.0),
                },
                AnalyzedFoodDto {
                    name: "rice".into(),
                    confidence: 1.4,
                    estimated_weight_g: 150.0,
                    per_100g: Nutrients::new(116.0, 2.6, 25.9, 0.3),
                },
            ],
            warnings: vec!["low light".into()],
        };
        let meal = dto.into_meal();
        assert_eq!(meal.items.len(), 1);
        assert_eq!(meal.items[0].confidence, 1.0);
        assert_eq!(meal.warnings, vec!["low light".to_string()]);
    }
}
