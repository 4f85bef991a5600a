//! Small built-in food reference table for manual item entry.
//!
//! Mirrors the server's seed nutrition table so a manually typed food
//! name resolves to the same per-100g values offline. Unmatched names
//! fall back to [`GENERIC_PER_100G`].

use crate::types::Nutrients;

/// Generic estimate applied when a manual food name has no table match.
pub const GENERIC_PER_100G: Nutrients = Nutrients {
    kcal: 150.0,
    protein_g: 8.0,
    carbs_g: 15.0,
    fat_g: 5.0,
};

pub struct ReferenceFood {
    pub canonical_name: &'static str,
    pub aliases: &'static [&'static str],
    pub per_100g: Nutrients,
}

macro_rules! food {
    ($name:literal, [$($alias:literal),*], $kcal:literal, $p:literal, $c:literal, $f:literal) => {
        ReferenceFood {
            canonical_name: $name,
            aliases: &[$($alias),*],
            per_100g: Nutrients {
                kcal: $kcal,
                protein_g: $p,
                carbs_g: $c,
                fat_g: $f,
            },
        }
    };
}

/// Per-100g reference values.
pub const REFERENCE_FOODS: &[ReferenceFood] = &[
    food!("rice", ["white rice", "cooked rice", "steamed rice"], 116.0, 2.6, 25.9, 0.3),
    food!("chicken breast", ["chicken", "grilled chicken"], 165.0, 31.0, 0.0, 3.6),
    food!("egg", ["boiled egg", "whole egg"], 155.0, 13.0, 1.1, 11.0),
    food!("broccoli", ["steamed broccoli"], 35.0, 2.4, 7.2, 0.4),
    food!("leafy greens", ["bok choy", "spinach", "greens"], 20.0, 1.5, 3.0, 0.2),
    food!("milk", ["whole milk"], 61.0, 3.2, 4.8, 3.3),
    food!("yogurt", ["plain yogurt", "unsweetened yogurt"], 63.0, 3.5, 4.7, 3.3),
    food!("tofu", ["firm tofu", "soft tofu"], 76.0, 8.1, 1.9, 4.8),
    food!("banana", [], 89.0, 1.1, 22.8, 0.3),
    food!("apple", [], 52.0, 0.3, 13.8, 0.2),
];

/// Look a food name up: canonical match first, then alias match, both
/// case-insensitive on the trimmed input.
pub fn lookup(name: &str) -> Option<&'static ReferenceFood> {
    let needle = name.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    REFERENCE_FOODS
        .iter()
        .find(|f| f.canonical_name == needle)
        .or_else(|| {
            REFERENCE_FOODS
                .iter()
                .find(|f| f.aliases.iter().any(|a| *a == needle))
        })
}

/// Per-100g values for a manual item: table hit or the generic estimate.
/// The boolean is `true` when the name matched the table.
pub fn lookup_or_generic(name: &str) -> (Nutrients, bool) {
    match lookup(name) {
        Some(f) => (f.per_100g, true),
        None => (GENERIC_PER_100G, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_and_alias_lookup() {
        assert_eq!(lookup("rice").unwrap().canonical_name, "rice");
        assert_eq!(lookup("  Steamed Rice ").unwrap().canonical_name, "rice");
        assert!(lookup("dragonfruit smoothie").is_none());
    }

    #[test]
    fn unmatched_name_gets_generic_estimate() {
        let (per_100g, matched) = lookup_or_generic("mystery casserole");
        assert!(!matched);
        assert_eq!(per_100g, GENERIC_PER_100G);
    }
}
