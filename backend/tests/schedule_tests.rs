//! Schedule generation property-based and unit tests
//!
//! Comprehensive tests for:
//! - Stage calendar shape and ordering
//! - Fertilizer quantity linearity in the cultivated area
//! - Anchor date selection
//! - Duration validation and legacy fertilizer shapes

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    effective_anchor, FertilizerApplication, FertilizerQuantities, FertilizerStage, PlanError,
    PlantingMethod, ScheduleGenerator, ScheduleInputs, StageKind, MAX_DURATION_DAYS,
    MIN_DURATION_DAYS, STAGE_COUNT,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

// ============================================================================
// Property Test Strategies
// ============================================================================

/// Anchor dates across several decades
fn anchor_strategy() -> impl Strategy<Value = NaiveDate> {
    (0..15_000i64).prop_map(|offset| date(2000, 1, 1) + Duration::days(offset))
}

/// Supported variety durations
fn duration_strategy() -> impl Strategy<Value = u32> {
    MIN_DURATION_DAYS..=MAX_DURATION_DAYS
}

/// Cultivated area in acres with two decimals (0.00 to 500.00)
fn area_strategy() -> impl Strategy<Value = Decimal> {
    (0..=50_000i64).prop_map(|n| Decimal::new(n, 2))
}

fn quantities(entry: &FertilizerApplication) -> [Decimal; 4] {
    let f = &entry.fertilizers;
    [f.urea, f.tsp, f.mop, f.zinc_sulphate]
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Every valid input yields nine ordered stages and three baseline entries
    #[test]
    fn test_schedule_shape(
        anchor in anchor_strategy(),
        duration in duration_strategy(),
        area in area_strategy()
    ) {
        let schedule = ScheduleGenerator::default()
            .generate(&ScheduleInputs { anchor_date: anchor, duration_days: duration, area })
            .unwrap();

        prop_assert_eq!(schedule.growing_stages.len(), STAGE_COUNT);
        prop_assert_eq!(schedule.fertilizer_schedule.len(), 3);

        for stage in &schedule.growing_stages {
            prop_assert!(stage.planned_start <= stage.planned_end, "{} ends before it starts", stage.stage);
            prop_assert!(!stage.completed);
        }
        for pair in schedule.growing_stages.windows(2) {
            prop_assert!(pair[0].planned_start <= pair[1].planned_start);
        }
        prop_assert_eq!(schedule.growing_stages[0].stage, StageKind::LandPreparation);
        prop_assert_eq!(schedule.growing_stages[STAGE_COUNT - 1].stage, StageKind::PostHarvest);
        prop_assert_eq!(
            schedule.growing_stages[7].planned_start,
            anchor + Duration::days(i64::from(duration))
        );

        for entry in &schedule.fertilizer_schedule {
            prop_assert!(!entry.applied);
            prop_assert!(!entry.is_lcc_based);
            prop_assert!(quantities(entry).iter().all(|q| !q.is_sign_negative() || q.is_zero()));
        }
    }

    /// Doubling the area doubles every quantity, up to rounding
    #[test]
    fn test_quantities_are_linear_in_area(
        anchor in anchor_strategy(),
        duration in duration_strategy(),
        area in area_strategy()
    ) {
        let generator = ScheduleGenerator::default();
        let single = generator
            .generate(&ScheduleInputs { anchor_date: anchor, duration_days: duration, area })
            .unwrap();
        let double = generator
            .generate(&ScheduleInputs { anchor_date: anchor, duration_days: duration, area: area * Decimal::TWO })
            .unwrap();

        for (a, b) in single.fertilizer_schedule.iter().zip(double.fertilizer_schedule.iter()) {
            for (qa, qb) in quantities(a).iter().zip(quantities(b).iter()) {
                // Each side rounds once, so the gap is at most 1.5 kg
                prop_assert!((*qa * Decimal::TWO - *qb).abs() <= dec("1.5"));
            }
        }
    }

    /// Generation is deterministic
    #[test]
    fn test_generation_is_deterministic(
        anchor in anchor_strategy(),
        duration in duration_strategy(),
        area in area_strategy()
    ) {
        let inputs = ScheduleInputs { anchor_date: anchor, duration_days: duration, area };
        let generator = ScheduleGenerator::default();
        prop_assert_eq!(generator.generate(&inputs).unwrap(), generator.generate(&inputs).unwrap());
    }

    /// Transplanting date anchors only when the method is transplanting and the date is set
    #[test]
    fn test_anchor_selection(
        cultivation in anchor_strategy(),
        gap in 0..60i64,
        method in prop_oneof![
            Just(None),
            Just(Some(PlantingMethod::Transplanting)),
            Just(Some(PlantingMethod::Direct)),
        ],
        has_transplanting_date in any::<bool>()
    ) {
        let transplanting = has_transplanting_date.then(|| cultivation + Duration::days(gap));
        let anchor = effective_anchor(cultivation, method, transplanting);

        match (method, transplanting) {
            (Some(PlantingMethod::Transplanting), Some(t)) => prop_assert_eq!(anchor, t),
            _ => prop_assert_eq!(anchor, cultivation),
        }
    }

    /// Durations too short for the stage table are rejected, never clamped
    #[test]
    fn test_short_durations_rejected(duration in 0..MIN_DURATION_DAYS) {
        let result = ScheduleGenerator::default().generate(&ScheduleInputs {
            anchor_date: date(2025, 1, 1),
            duration_days: duration,
            area: Decimal::ONE,
        });
        prop_assert!(
            matches!(result, Err(PlanError::Validation { ref field, .. }) if field == "durationDays"),
            "duration {} should be rejected",
            duration
        );
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[test]
fn test_land_preparation_and_harvest_dates() {
    let schedule = ScheduleGenerator::default()
        .generate(&ScheduleInputs {
            anchor_date: date(2025, 1, 1),
            duration_days: 105,
            area: Decimal::ONE,
        })
        .unwrap();

    assert_eq!(schedule.growing_stages[0].planned_start, date(2024, 12, 18));
    assert_eq!(schedule.growing_stages[7].stage, StageKind::Harvesting);
    assert_eq!(schedule.growing_stages[7].planned_start, date(2025, 4, 16));
}

#[test]
fn test_basal_urea_for_two_acres() {
    let schedule = ScheduleGenerator::default()
        .generate(&ScheduleInputs {
            anchor_date: date(2025, 1, 1),
            duration_days: 105,
            area: Decimal::TWO,
        })
        .unwrap();
    let basal = &schedule.fertilizer_schedule[0];
    assert_eq!(basal.stage, FertilizerStage::Basal);
    assert_eq!(basal.fertilizers.urea, Decimal::from(30));
}

#[test]
fn test_zero_area_is_not_an_error() {
    let schedule = ScheduleGenerator::default()
        .generate(&ScheduleInputs {
            anchor_date: date(2025, 1, 1),
            duration_days: 105,
            area: Decimal::ZERO,
        })
        .unwrap();
    assert!(schedule
        .fertilizer_schedule
        .iter()
        .all(|f| f.fertilizers == FertilizerQuantities::ZERO));
}

#[test]
fn test_legacy_fertilizer_shape_is_normalized() {
    let legacy: FertilizerQuantities = serde_json::from_str(
        r#"{"urea": {"perAcre": 15, "total": 30}, "tsp": {"perAcre": 25, "total": 50}, "mop": 30}"#,
    )
    .unwrap();
    assert_eq!(legacy.urea, Decimal::from(30));
    assert_eq!(legacy.tsp, Decimal::from(50));
    assert_eq!(legacy.mop, Decimal::from(30));
    assert!(legacy.zinc_sulphate.is_zero());

    let negative = serde_json::from_str::<FertilizerQuantities>(r#"{"urea": -5}"#);
    assert!(negative.is_err());
}
