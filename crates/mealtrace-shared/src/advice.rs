//! Daily advice ladder.
//!
//! An ordered list of predicate/message rules evaluated against the gap
//! between today's net intake and the targets. Only the first matching
//! rule fires; the order of `RULES` is the priority order.

use crate::types::{Nutrients, Targets};

/// Deltas between target and net intake for the day.
#[derive(Debug, Clone, Copy)]
struct Gap {
    /// Remaining calorie budget: target minus (intake - exercise).
    /// Negative means the user is over budget.
    kcal: f64,
    /// Remaining protein grams; positive means a deficit.
    protein_g: f64,
    /// Remaining carb grams; positive means a deficit.
    carbs_g: f64,
    /// Remaining fat grams; negative means an excess.
    fat_g: f64,
}

struct Rule {
    applies: fn(&Gap) -> bool,
    render: fn(&Gap) -> String,
}

const RULES: &[Rule] = &[
    // 1. Net-calorie overage
    Rule {
        applies: |g| g.kcal < -150.0,
        render: |g| {
            format!(
                "You are about {} kcal over budget today. Keep the next meal light: \
                 smaller portions, steamed or boiled, plenty of vegetables.",
                (-g.kcal).round()
            )
        },
    },
    // 2. Protein deficit, suggestion capped at 35 g
    Rule {
        applies: |g| g.protein_g > 20.0,
        render: |g| {
            let need = g.protein_g.min(35.0).round();
            format!(
                "Protein is running low. Add roughly {need} g at the next meal: \
                 chicken breast, tofu, eggs or unsweetened yogurt all work."
            )
        },
    },
    // 3. Fat excess
    Rule {
        applies: |g| g.fat_g < -15.0,
        render: |_| {
            "Fat intake is above target. Prefer low-fat cooking for the rest of \
             the day: less oil, no frying, dressings on the side."
                .to_string()
        },
    },
    // 4. Carb deficit with calorie budget left, top-up capped at 80 g
    Rule {
        applies: |g| g.carbs_g > 40.0 && g.kcal > 150.0,
        render: |g| {
            let need = g.carbs_g.min(80.0).round();
            format!(
                "There is budget left and carbs are short by about {need} g. \
                 A portion of rice, noodles or fruit would round the day out."
            )
        },
    },
];

/// Build the advice line for a day.
///
/// `day_totals` is the aggregated intake for the day, `exercise_kcal` the
/// day's activity burn. Evaluates the ladder in priority order and
/// short-circuits on the first match; falls through to an on-track
/// message.
pub fn build_advice(targets: &Targets, day_totals: &Nutrients, exercise_kcal: f64) -> String {
    let net_kcal = day_totals.kcal - exercise_kcal;
    let gap = Gap {
        kcal: f64::from(targets.kcal) - net_kcal,
        protein_g: f64::from(targets.protein_g) - day_totals.protein_g,
        carbs_g: f64::from(targets.carbs_g) - day_totals.carbs_g,
        fat_g: f64::from(targets.fat_g) - day_totals.fat_g,
    };

    for rule in RULES {
        if (rule.applies)(&gap) {
            return (rule.render)(&gap);
        }
    }

    "You are on track today. Keep meals balanced and stay hydrated.".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGETS: Targets = Targets {
        kcal: 2000,
        protein_g: 125,
        carbs_g: 225,
        fat_g: 67,
    };

    #[test]
    fn overage_beats_protein_deficit() {
        // 200 kcal over with a simultaneous 25 g protein deficit: the
        // overage rule has priority.
        let day = Nutrients::new(2200.0, 100.0, 200.0, 60.0);
        let msg = build_advice(&TARGETS, &day, 0.0);
        assert!(msg.contains("over budget"), "got: {msg}");
    }

    #[test]
    fn exercise_offsets_intake() {
        // 2200 in, 300 burned: net 1900, within budget, protein short.
        let day = Nutrients::new(2200.0, 80.0, 200.0, 50.0);
        let msg = build_advice(&TARGETS, &day, 300.0);
        assert!(msg.contains("Protein"), "got: {msg}");
    }

    #[test]
    fn protein_suggestion_is_capped() {
        let day = Nutrients::new(1200.0, 20.0, 150.0, 40.0);
        let msg = build_advice(&TARGETS, &day, 0.0);
        assert!(msg.contains("35 g"), "got: {msg}");
    }

    #[test]
    fn fat_excess_fires_when_calories_and_protein_fine() {
        let day = Nutrients::new(1900.0, 120.0, 200.0, 90.0);
        let msg = build_advice(&TARGETS, &day, 0.0);
        assert!(msg.contains("Fat intake"), "got: {msg}");
    }

    #[test]
    fn carb_top_up_requires_remaining_budget() {
        // Carbs 60 g short, 400 kcal budget left.
        let day = Nutrients::new(1600.0, 115.0, 165.0, 60.0);
        let msg = build_advice(&TARGETS, &day, 0.0);
        assert!(msg.contains("carbs are short"), "got: {msg}");
    }

    #[test]
    fn on_track_when_nothing_fires() {
        let day = Nutrients::new(1950.0, 120.0, 220.0, 65.0);
        let msg = build_advice(&TARGETS, &day, 0.0);
        assert!(msg.contains("on track"), "got: {msg}");
    }
}
