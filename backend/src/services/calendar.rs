//! CSV export of a plan's stage and fertilizer calendars

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use shared::SeasonPlan;

use crate::error::{AppError, AppResult};

/// One line of the exported calendar
#[derive(Debug, Serialize)]
pub struct CalendarRow {
    pub kind: &'static str,
    pub label: String,
    pub planned_start: NaiveDate,
    pub planned_end: NaiveDate,
    pub done: bool,
    pub actual_date: Option<NaiveDate>,
    pub urea_kg: Option<Decimal>,
    pub tsp_kg: Option<Decimal>,
    pub mop_kg: Option<Decimal>,
    pub zinc_sulphate_kg: Option<Decimal>,
}

/// Stages first, then fertilizer entries in schedule order
pub fn calendar_rows(plan: &SeasonPlan) -> Vec<CalendarRow> {
    let stages = plan.growing_stages.iter().map(|s| CalendarRow {
        kind: "stage",
        label: s.stage.to_string(),
        planned_start: s.planned_start,
        planned_end: s.planned_end,
        done: s.completed,
        actual_date: s.actual_end.or(s.actual_start),
        urea_kg: None,
        tsp_kg: None,
        mop_kg: None,
        zinc_sulphate_kg: None,
    });

    let fertilizer = plan.fertilizer_schedule.iter().map(|f| CalendarRow {
        kind: "fertilizer",
        label: f.stage.to_string(),
        planned_start: f.planned_date,
        planned_end: f.planned_date,
        done: f.applied,
        actual_date: f.implemented_date,
        urea_kg: Some(f.fertilizers.urea),
        tsp_kg: Some(f.fertilizers.tsp),
        mop_kg: Some(f.fertilizers.mop),
        zinc_sulphate_kg: Some(f.fertilizers.zinc_sulphate),
    });

    stages.chain(fertilizer).collect()
}

/// Render the calendar as CSV with a header row
pub fn export_calendar(plan: &SeasonPlan) -> AppResult<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for row in calendar_rows(plan) {
        wtr.serialize(&row)
            .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
}
