//! Plans used by unit tests across the crate

use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{ExpectedHarvest, PlanStatus, SeasonPlan};
use crate::schedule::{ScheduleGenerator, ScheduleInputs};
use crate::types::{PaddyVarietyRef, PlantingMethod, Season};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// One acre of a 105-day variety, direct seeded on 2025-01-01
pub fn sample_plan() -> SeasonPlan {
    let anchor = date(2025, 1, 1);
    let schedule = ScheduleGenerator::default()
        .generate(&ScheduleInputs {
            anchor_date: anchor,
            duration_days: 105,
            area: Decimal::ONE,
        })
        .unwrap();
    let created = Utc.with_ymd_and_hms(2024, 12, 1, 8, 0, 0).unwrap();

    SeasonPlan {
        id: Uuid::new_v4(),
        farm_id: Uuid::new_v4(),
        variety: PaddyVarietyRef {
            id: Uuid::new_v4(),
            name: Some("Bg 300".to_string()),
            duration_days: 105,
            variety_type: "short".to_string(),
        },
        season: Season::Maha,
        climate_zone: None,
        irrigation_method: None,
        soil_condition: None,
        cultivating_area: Decimal::ONE,
        cultivation_date: anchor,
        planting_method: Some(PlantingMethod::Direct),
        transplanting_date: None,
        growing_stages: schedule.growing_stages,
        fertilizer_schedule: schedule.fertilizer_schedule,
        daily_remarks: Vec::new(),
        expected_harvest: Some(ExpectedHarvest {
            date: date(2025, 4, 16),
            estimated_yield: None,
        }),
        actual_harvest: None,
        status: PlanStatus::Planned,
        version: 0,
        created_by: None,
        created_at: created,
        updated_at: created,
    }
}
