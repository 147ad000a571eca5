//! Baseline season schedule generation
//!
//! Converts an anchor date, a variety duration and a cultivated area into the
//! nine-stage growing calendar and the three baseline fertilizer applications.
//! Generation is a pure function of its inputs: the same inputs always give
//! the same schedule, so it is safe to call for previews.

use chrono::{Duration, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{PlanError, PlanResult};
use crate::models::{
    FertilizerApplication, FertilizerQuantities, FertilizerStage, GrowingStage, StageKind,
    STAGE_COUNT,
};
use crate::validation::{validate_duration_days, validate_schedule_area};

/// Day offset of a stage boundary
#[derive(Debug, Clone, Copy)]
enum Offset {
    /// Days from the anchor
    Fixed(i64),
    /// Days from the end of the variety duration
    FromMaturity(i64),
}

impl Offset {
    fn days(self, duration_days: u32) -> i64 {
        match self {
            Offset::Fixed(days) => days,
            Offset::FromMaturity(days) => i64::from(duration_days) + days,
        }
    }
}

struct StageTemplate {
    stage: StageKind,
    description: &'static str,
    start: Offset,
    end: Offset,
}

const STAGE_TABLE: [StageTemplate; STAGE_COUNT] = [
    StageTemplate {
        stage: StageKind::LandPreparation,
        description: "Plowing, puddling and levelling of the field",
        start: Offset::Fixed(-14),
        end: Offset::Fixed(-1),
    },
    StageTemplate {
        stage: StageKind::Establishment,
        description: "Sowing or transplanting and seedling establishment",
        start: Offset::Fixed(0),
        end: Offset::Fixed(10),
    },
    StageTemplate {
        stage: StageKind::Tillering,
        description: "Active tillering, keep shallow water and control weeds",
        start: Offset::Fixed(11),
        end: Offset::Fixed(30),
    },
    StageTemplate {
        stage: StageKind::PanicleInitiation,
        description: "Panicle primordia form, critical period for nitrogen",
        start: Offset::Fixed(31),
        end: Offset::Fixed(45),
    },
    StageTemplate {
        stage: StageKind::Flowering,
        description: "Heading and anthesis, avoid water stress",
        start: Offset::Fixed(46),
        end: Offset::Fixed(55),
    },
    StageTemplate {
        stage: StageKind::GrainFilling,
        description: "Milk and dough grain development",
        start: Offset::Fixed(56),
        end: Offset::FromMaturity(-15),
    },
    StageTemplate {
        stage: StageKind::Maturity,
        description: "Grain ripening, drain the field before harvest",
        start: Offset::FromMaturity(-15),
        end: Offset::FromMaturity(0),
    },
    StageTemplate {
        stage: StageKind::Harvesting,
        description: "Harvesting and threshing",
        start: Offset::FromMaturity(0),
        end: Offset::FromMaturity(7),
    },
    StageTemplate {
        stage: StageKind::PostHarvest,
        description: "Drying, cleaning and storage of paddy",
        start: Offset::FromMaturity(7),
        end: Offset::FromMaturity(21),
    },
];

/// Share of each nutrient's seasonal total given at one application, in percent
struct SplitTemplate {
    stage: FertilizerStage,
    description: &'static str,
    day: i64,
    urea_percent: u32,
    tsp_percent: u32,
    mop_percent: u32,
    zinc_sulphate_percent: u32,
}

const SPLIT_TABLE: [SplitTemplate; 3] = [
    SplitTemplate {
        stage: FertilizerStage::Basal,
        description: "Basal dressing applied at establishment",
        day: 0,
        urea_percent: 30,
        tsp_percent: 100,
        mop_percent: 50,
        zinc_sulphate_percent: 100,
    },
    SplitTemplate {
        stage: FertilizerStage::FirstTopDressing,
        description: "First top dressing at early tillering",
        day: 14,
        urea_percent: 35,
        tsp_percent: 0,
        mop_percent: 50,
        zinc_sulphate_percent: 0,
    },
    SplitTemplate {
        stage: FertilizerStage::SecondTopDressing,
        description: "Second top dressing at panicle initiation",
        day: 35,
        urea_percent: 35,
        tsp_percent: 0,
        mop_percent: 0,
        zinc_sulphate_percent: 0,
    },
];

/// Seasonal fertilizer totals per acre, in kg
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FertilizerRates {
    pub urea_per_acre: Decimal,
    pub tsp_per_acre: Decimal,
    pub mop_per_acre: Decimal,
    pub zinc_sulphate_per_acre: Decimal,
}

impl Default for FertilizerRates {
    fn default() -> Self {
        Self {
            urea_per_acre: Decimal::from(50),
            tsp_per_acre: Decimal::from(25),
            mop_per_acre: Decimal::from(30),
            zinc_sulphate_per_acre: Decimal::ZERO,
        }
    }
}

impl FertilizerRates {
    pub fn validate(&self) -> Result<(), &'static str> {
        let rates = [
            self.urea_per_acre,
            self.tsp_per_acre,
            self.mop_per_acre,
            self.zinc_sulphate_per_acre,
        ];
        if rates.iter().any(|r| r.is_sign_negative() && !r.is_zero()) {
            return Err("Fertilizer base rates cannot be negative");
        }
        Ok(())
    }
}

/// Inputs of one schedule generation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleInputs {
    pub anchor_date: NaiveDate,
    pub duration_days: u32,
    /// Acres; zero produces an all-zero fertilizer plan
    pub area: Decimal,
}

/// The generated baseline calendars
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BaselineSchedule {
    pub growing_stages: [GrowingStage; STAGE_COUNT],
    pub fertilizer_schedule: Vec<FertilizerApplication>,
}

/// Generates baseline schedules from a fixed base rate table
#[derive(Debug, Clone, Default)]
pub struct ScheduleGenerator {
    rates: FertilizerRates,
}

impl ScheduleGenerator {
    pub fn new(rates: FertilizerRates) -> Self {
        Self { rates }
    }

    pub fn rates(&self) -> &FertilizerRates {
        &self.rates
    }

    /// Build both baseline calendars.
    ///
    /// Fails when the duration is outside the supported range or the area is
    /// negative; durations are never clamped.
    pub fn generate(&self, inputs: &ScheduleInputs) -> PlanResult<BaselineSchedule> {
        validate_duration_days(inputs.duration_days)
            .map_err(|m| PlanError::validation("durationDays", m))?;
        validate_schedule_area(inputs.area).map_err(|m| PlanError::validation("area", m))?;

        let mut dates = [(inputs.anchor_date, inputs.anchor_date); STAGE_COUNT];
        for (slot, template) in dates.iter_mut().zip(STAGE_TABLE.iter()) {
            let start = offset_date(inputs.anchor_date, template.start.days(inputs.duration_days))?;
            let end = offset_date(inputs.anchor_date, template.end.days(inputs.duration_days))?;
            if start > end {
                return Err(PlanError::validation(
                    "durationDays",
                    format!("{} would end before it starts", template.stage),
                ));
            }
            *slot = (start, end);
        }

        let growing_stages = std::array::from_fn(|i| {
            let template = &STAGE_TABLE[i];
            let (planned_start, planned_end) = dates[i];
            GrowingStage {
                stage: template.stage,
                description: template.description.to_string(),
                planned_start,
                planned_end,
                completed: false,
                actual_start: None,
                actual_end: None,
                notes: None,
            }
        });

        let fertilizer_schedule = SPLIT_TABLE
            .iter()
            .map(|split| {
                Ok(FertilizerApplication {
                    stage: split.stage,
                    description: split.description.to_string(),
                    planned_date: offset_date(inputs.anchor_date, split.day)?,
                    fertilizers: self.split_quantities(split, inputs.area),
                    applied: false,
                    implemented_date: None,
                    notes: None,
                    is_lcc_based: false,
                    lcc_data: None,
                })
            })
            .collect::<PlanResult<Vec<_>>>()?;

        Ok(BaselineSchedule {
            growing_stages,
            fertilizer_schedule,
        })
    }

    fn split_quantities(&self, split: &SplitTemplate, area: Decimal) -> FertilizerQuantities {
        FertilizerQuantities {
            urea: split_amount(self.rates.urea_per_acre, split.urea_percent, area),
            tsp: split_amount(self.rates.tsp_per_acre, split.tsp_percent, area),
            mop: split_amount(self.rates.mop_per_acre, split.mop_percent, area),
            zinc_sulphate: split_amount(
                self.rates.zinc_sulphate_per_acre,
                split.zinc_sulphate_percent,
                area,
            ),
        }
    }
}

/// `round(rate x percent / 100 x area)` to whole kilograms
fn split_amount(rate_per_acre: Decimal, percent: u32, area: Decimal) -> Decimal {
    (rate_per_acre * Decimal::from(percent) / Decimal::ONE_HUNDRED * area)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .normalize()
}

fn offset_date(anchor: NaiveDate, days: i64) -> PlanResult<NaiveDate> {
    anchor
        .checked_add_signed(Duration::days(days))
        .ok_or_else(|| PlanError::validation("anchorDate", "Anchor date is out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{MAX_DURATION_DAYS, MIN_DURATION_DAYS};
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn inputs(duration_days: u32, area: i64) -> ScheduleInputs {
        ScheduleInputs {
            anchor_date: date(2025, 1, 1),
            duration_days,
            area: Decimal::from(area),
        }
    }

    #[test]
    fn test_stage_dates_for_105_day_variety() {
        let schedule = ScheduleGenerator::default().generate(&inputs(105, 2)).unwrap();
        let stages = &schedule.growing_stages;

        assert_eq!(stages[0].stage, StageKind::LandPreparation);
        assert_eq!(stages[0].planned_start, date(2024, 12, 18));
        assert_eq!(stages[0].planned_end, date(2024, 12, 31));

        assert_eq!(stages[5].stage, StageKind::GrainFilling);
        assert_eq!(stages[5].planned_end, date(2025, 1, 1) + Duration::days(90));

        assert_eq!(stages[7].stage, StageKind::Harvesting);
        assert_eq!(stages[7].planned_start, date(2025, 1, 1) + Duration::days(105));
        assert_eq!(stages[7].planned_end, date(2025, 1, 1) + Duration::days(112));

        assert_eq!(stages[8].stage, StageKind::PostHarvest);
    }

    #[test]
    fn test_basal_urea_for_two_acres() {
        let schedule = ScheduleGenerator::default().generate(&inputs(105, 2)).unwrap();
        let basal = &schedule.fertilizer_schedule[0];

        assert_eq!(basal.stage, FertilizerStage::Basal);
        // round(50 x 0.30 x 2)
        assert_eq!(basal.fertilizers.urea, Decimal::from(30));
        // round(25 x 1.00 x 2)
        assert_eq!(basal.fertilizers.tsp, Decimal::from(50));
        // round(30 x 0.50 x 2)
        assert_eq!(basal.fertilizers.mop, Decimal::from(30));
        assert_eq!(basal.planned_date, date(2025, 1, 1));
    }

    #[test]
    fn test_top_dressings() {
        let schedule = ScheduleGenerator::default().generate(&inputs(105, 2)).unwrap();
        let first = &schedule.fertilizer_schedule[1];
        let second = &schedule.fertilizer_schedule[2];

        assert_eq!(first.stage, FertilizerStage::FirstTopDressing);
        assert_eq!(first.fertilizers.urea, Decimal::from(35));
        assert_eq!(first.fertilizers.mop, Decimal::from(30));
        assert!(first.fertilizers.tsp.is_zero());
        assert_eq!(first.planned_date, date(2025, 1, 15));

        assert_eq!(second.stage, FertilizerStage::SecondTopDressing);
        assert_eq!(second.fertilizers.urea, Decimal::from(35));
        assert!(second.fertilizers.mop.is_zero());
        assert_eq!(second.planned_date, date(2025, 2, 5));
    }

    #[test]
    fn test_zero_area_gives_zero_quantities() {
        let schedule = ScheduleGenerator::default().generate(&inputs(105, 0)).unwrap();
        assert_eq!(schedule.fertilizer_schedule.len(), 3);
        assert!(schedule.fertilizer_schedule.iter().all(|f| f.fertilizers.is_zero()));
    }

    #[test]
    fn test_rounding_is_half_away_from_zero() {
        // 50 x 0.30 x 0.1 = 1.5 kg
        let schedule = ScheduleGenerator::default()
            .generate(&ScheduleInputs {
                area: Decimal::new(1, 1),
                ..inputs(105, 0)
            })
            .unwrap();
        assert_eq!(schedule.fertilizer_schedule[0].fertilizers.urea, Decimal::from(2));
    }

    #[test]
    fn test_short_duration_rejected() {
        let result = ScheduleGenerator::default().generate(&inputs(60, 1));
        assert!(matches!(result, Err(PlanError::Validation { ref field, .. }) if field == "durationDays"));
    }

    #[test]
    fn test_negative_area_rejected() {
        let result = ScheduleGenerator::default().generate(&inputs(105, -1));
        assert!(matches!(result, Err(PlanError::Validation { ref field, .. }) if field == "area"));
    }

    #[test]
    fn test_custom_rates() {
        let generator = ScheduleGenerator::new(FertilizerRates {
            zinc_sulphate_per_acre: Decimal::from(2),
            ..FertilizerRates::default()
        });
        let schedule = generator.generate(&inputs(105, 3)).unwrap();
        assert_eq!(schedule.fertilizer_schedule[0].fertilizers.zinc_sulphate, Decimal::from(6));
        assert!(schedule.fertilizer_schedule[1].fertilizers.zinc_sulphate.is_zero());
    }

    #[test]
    fn test_urea_splits_cover_the_whole_season() {
        let total: u32 = SPLIT_TABLE.iter().map(|s| s.urea_percent).sum();
        assert_eq!(total, 100);
        let mop: u32 = SPLIT_TABLE.iter().map(|s| s.mop_percent).sum();
        assert_eq!(mop, 100);
    }

    proptest! {
        #[test]
        fn prop_shape_and_ordering(
            days_from_epoch in 0i64..20_000,
            duration in MIN_DURATION_DAYS..=MAX_DURATION_DAYS,
            area_tenths in 0i64..5_000,
        ) {
            let anchor = date(1990, 1, 1) + Duration::days(days_from_epoch);
            let schedule = ScheduleGenerator::default()
                .generate(&ScheduleInputs { anchor_date: anchor, duration_days: duration, area: Decimal::new(area_tenths, 1) })
                .unwrap();

            prop_assert_eq!(schedule.growing_stages.len(), STAGE_COUNT);
            prop_assert_eq!(schedule.fertilizer_schedule.len(), 3);
            for stage in &schedule.growing_stages {
                prop_assert!(stage.planned_start <= stage.planned_end);
            }
            for pair in schedule.growing_stages.windows(2) {
                prop_assert!(pair[0].planned_start <= pair[1].planned_start);
            }
        }

        #[test]
        fn prop_generation_is_deterministic(duration in MIN_DURATION_DAYS..=MAX_DURATION_DAYS, area in 0i64..100) {
            let generator = ScheduleGenerator::default();
            let a = generator.generate(&inputs(duration, area)).unwrap();
            let b = generator.generate(&inputs(duration, area)).unwrap();
            prop_assert_eq!(a, b);
        }

        #[test]
        fn prop_quantities_scale_linearly(area_tenths in 0i64..2_000) {
            let generator = ScheduleGenerator::default();
            let single = generator
                .generate(&ScheduleInputs { area: Decimal::new(area_tenths, 1), ..inputs(105, 0) })
                .unwrap();
            let double = generator
                .generate(&ScheduleInputs { area: Decimal::new(area_tenths * 2, 1), ..inputs(105, 0) })
                .unwrap();

            for (one, two) in single.fertilizer_schedule.iter().zip(double.fertilizer_schedule.iter()) {
                for (a, b) in [
                    (one.fertilizers.urea, two.fertilizers.urea),
                    (one.fertilizers.tsp, two.fertilizers.tsp),
                    (one.fertilizers.mop, two.fertilizers.mop),
                ] {
                    // Each side is rounded once, so doubling can drift by at most 1 kg
                    prop_assert!((a * Decimal::TWO - b).abs() <= Decimal::ONE);
                }
            }
        }
    }
}
