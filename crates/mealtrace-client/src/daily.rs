//! Day and week summaries over the local logs.
//!
//! Summaries are pure reads: they aggregate whatever is in the store at
//! the moment of the call and never trigger sync. Weeks are anchored on
//! Monday.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use mealtrace_shared::{advice, nutrition, Goal, MealRecord, Nutrients, Targets};
use mealtrace_store::RecordStore;

use crate::error::Result;

/// Everything the day screen needs: intake, burn, targets and the one
/// advice line.
#[derive(Debug, Clone, PartialEq)]
pub struct DaySummary {
    pub day: NaiveDate,
    pub meals: Vec<MealRecord>,
    pub totals: Nutrients,
    pub exercise_kcal: f64,
    /// Intake minus exercise.
    pub net_kcal: f64,
    /// Present only when a goal has been set.
    pub targets: Option<Targets>,
    pub advice: String,
}

/// Aggregates for one Monday-anchored week.
#[derive(Debug, Clone, PartialEq)]
pub struct WeekSummary {
    /// The Monday this week starts on.
    pub week_start: NaiveDate,
    /// One entry per day, Monday through Sunday, zeroed for days with no
    /// log.
    pub days: [Nutrients; 7],
    pub total: Nutrients,
    /// Mean over days that have at least one meal; zero when the week is
    /// empty.
    pub average_kcal: f64,
    pub days_logged: usize,
}

/// Shown instead of rule-derived advice when no goal exists yet.
const NO_GOAL_ADVICE: &str = "Set a goal to get daily guidance on your intake.";

/// The Monday of the week containing `day`.
pub fn week_start(day: NaiveDate) -> NaiveDate {
    day - Duration::days(day.weekday().num_days_from_monday() as i64)
}

/// Build the summary for one calendar day.
pub fn day_summary(store: &RecordStore, day: NaiveDate) -> Result<DaySummary> {
    let meals = store.day_log(day)?;
    let totals = nutrition::aggregate_day(&meals);
    let exercise_kcal = store.activity(day)?.map(|a| a.exercise_kcal).unwrap_or(0.0);
    let goal = store.goal()?;

    let advice = match &goal {
        Some(goal) => advice::build_advice(&goal.targets, &totals, exercise_kcal),
        None => NO_GOAL_ADVICE.to_string(),
    };

    Ok(DaySummary {
        day,
        net_kcal: totals.kcal - exercise_kcal,
        targets: goal.map(|g: Goal| g.targets),
        meals,
        totals,
        exercise_kcal,
        advice,
    })
}

/// Build the summary for the week containing `day`.
pub fn week_summary(store: &RecordStore, day: NaiveDate) -> Result<WeekSummary> {
    let start = week_start(day);
    debug_assert_eq!(start.weekday(), Weekday::Mon);

    let mut days = [Nutrients::ZERO; 7];
    let mut total = Nutrients::ZERO;
    let mut days_logged = 0;
    for (offset, slot) in days.iter_mut().enumerate() {
        let meals = store.day_log(start + Duration::days(offset as i64))?;
        if meals.is_empty() {
            continue;
        }
        *slot = nutrition::aggregate_day(&meals);
        total = total.add(slot);
        days_logged += 1;
    }

    let average_kcal = if days_logged > 0 {
        total.kcal / days_logged as f64
    } else {
        0.0
    };

    Ok(WeekSummary {
        week_start: start,
        days,
        total,
        average_kcal,
        days_logged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use mealtrace_shared::{
        ActivityLevel, ActivityRecord, ActivitySource, FoodItem, GoalType, MealType, Profile, Sex,
        SyncState,
    };
    use mealtrace_store::MemoryKv;
    use uuid::Uuid;

    fn memory_store() -> RecordStore {
        RecordStore::new(Box::new(MemoryKv::new(None))).unwrap()
    }

    fn meal_on(day: NaiveDate, kcal: f64) -> MealRecord {
        // Scale a 100 kcal/100g food so the item count stays simple.
        let per_100g = Nutrients::new(100.0, 10.0, 5.0, 2.0);
        let mut record = MealRecord {
            local_id: Uuid::new_v4(),
            server_id: None,
            meal_type: MealType::Lunch,
            eaten_at: Utc.from_utc_datetime(&day.and_hms_opt(12, 0, 0).unwrap()),
            created_at: Utc::now(),
            items: vec![FoodItem::new("test food", per_100g, kcal, 0.9, false)],
            totals: Nutrients::ZERO,
            image_ref: None,
            sync_state: SyncState::LocalOnly,
        };
        record.recompute_totals();
        record
    }

    fn set_goal(store: &mut RecordStore) -> Targets {
        let goal = Goal::from_profile(
            Profile {
                goal_type: GoalType::Maintain,
                sex: Sex::Male,
                age: 30,
                height_cm: 175.0,
                weight_kg: 70.0,
                activity: ActivityLevel::Light,
            },
            Utc::now(),
        );
        store.set_goal(&goal).unwrap();
        goal.targets
    }

    #[test]
    fn week_start_is_monday() {
        // 2026-08-26 is a Wednesday.
        let wed = NaiveDate::from_ymd_opt(2026, 8, 26).unwrap();
        let mon = NaiveDate::from_ymd_opt(2026, 8, 24).unwrap();
        assert_eq!(week_start(wed), mon);
        assert_eq!(week_start(mon), mon);
        // Sunday still belongs to the week started the previous Monday.
        let sun = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        assert_eq!(week_start(sun), mon);
    }

    #[test]
    fn day_summary_nets_exercise_against_intake() {
        let mut store = memory_store();
        let targets = set_goal(&mut store);
        let day = NaiveDate::from_ymd_opt(2026, 8, 26).unwrap();

        store.put_day_log(day, &[meal_on(day, 600.0)]).unwrap();
        store
            .set_activity(&ActivityRecord {
                day_key: day,
                exercise_kcal: 250.0,
                steps: 6000,
                active_minutes: 40,
                source: ActivitySource::Manual,
                sync_state: SyncState::LocalOnly,
            })
            .unwrap();

        let summary = day_summary(&store, day).unwrap();
        assert_eq!(summary.totals.kcal, 600.0);
        assert_eq!(summary.exercise_kcal, 250.0);
        assert_eq!(summary.net_kcal, 350.0);
        assert_eq!(summary.targets, Some(targets));
        assert!(!summary.advice.is_empty());
    }

    #[test]
    fn day_summary_without_goal_prompts_for_one() {
        let store = memory_store();
        let day = NaiveDate::from_ymd_opt(2026, 8, 26).unwrap();
        let summary = day_summary(&store, day).unwrap();
        assert!(summary.targets.is_none());
        assert_eq!(summary.advice, NO_GOAL_ADVICE);
        assert_eq!(summary.totals, Nutrients::ZERO);
    }

    #[test]
    fn week_summary_averages_only_logged_days() {
        let mut store = memory_store();
        let mon = NaiveDate::from_ymd_opt(2026, 8, 24).unwrap();
        let wed = NaiveDate::from_ymd_opt(2026, 8, 26).unwrap();

        store.put_day_log(mon, &[meal_on(mon, 400.0)]).unwrap();
        store
            .put_day_log(wed, &[meal_on(wed, 600.0), meal_on(wed, 200.0)])
            .unwrap();

        let summary = week_summary(&store, wed).unwrap();
        assert_eq!(summary.week_start, mon);
        assert_eq!(summary.days_logged, 2);
        assert_eq!(summary.days[0].kcal, 400.0);
        assert_eq!(summary.days[2].kcal, 800.0);
        assert_eq!(summary.days[1], Nutrients::ZERO);
        assert_eq!(summary.total.kcal, 1200.0);
        assert_eq!(summary.average_kcal, 600.0);
    }

    #[test]
    fn empty_week_has_zero_average() {
        let store = memory_store();
        let day = NaiveDate::from_ymd_opt(2026, 8, 26).unwrap();
        let summary = week_summary(&store, day).unwrap();
        assert_eq!(summary.days_logged, 0);
        assert_eq!(summary.average_kcal, 0.0);
    }
}
