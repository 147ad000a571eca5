//! WebAssembly bindings for the Paddy Season Planner
//!
//! Lets the browser run the same engine as the server for:
//! - Schedule previews before a plan is saved
//! - Leaf color chart urea recommendations in the field
//! - Progress and status of a locally cached plan

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use wasm_bindgen::prelude::*;

use shared::{
    derive_status, effective_anchor, progress_percent, validate_duration_days, LccAdjustor,
    LccTable, PlantingMethod, ScheduleGenerator, ScheduleInputs, SeasonPlan,
};

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::debug_1(&JsValue::from_str("paddy season planner engine loaded"));
}

fn to_js(err: String) -> JsValue {
    JsValue::from_str(&err)
}

fn decimal_to_f64(value: Decimal) -> Result<f64, String> {
    value
        .to_f64()
        .ok_or_else(|| format!("{} cannot be represented as a number", value))
}

fn parse_date(value: &str, field: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| format!("Invalid {} '{}': {}", field, value, e))
}

fn generate(inputs_json: &str) -> Result<String, String> {
    let inputs: ScheduleInputs = serde_json::from_str(inputs_json)
        .map_err(|e| format!("Invalid schedule inputs JSON: {}", e))?;
    let schedule = ScheduleGenerator::default()
        .generate(&inputs)
        .map_err(|e| e.to_string())?;
    serde_json::to_string(&schedule).map_err(|e| e.to_string())
}

/// Generate the baseline stage and fertilizer calendars.
///
/// Takes `{"anchorDate", "durationDays", "area"}` and returns the schedule
/// as JSON.
#[wasm_bindgen]
pub fn generate_schedule(inputs_json: &str) -> Result<String, JsValue> {
    generate(inputs_json).map_err(to_js)
}

fn anchor(cultivation_date: &str, planting_method: &str, transplanting_date: Option<String>) -> Result<String, String> {
    let cultivation = parse_date(cultivation_date, "cultivation date")?;
    let method: Option<PlantingMethod> = match planting_method {
        "" => None,
        other => Some(
            serde_json::from_value(serde_json::Value::String(other.to_string()))
                .map_err(|_| format!("Unknown planting method '{}'", other))?,
        ),
    };
    let transplanting = transplanting_date
        .as_deref()
        .map(|d| parse_date(d, "transplanting date"))
        .transpose()?;
    Ok(effective_anchor(cultivation, method, transplanting).to_string())
}

/// Date the schedule is anchored on, as `YYYY-MM-DD`
#[wasm_bindgen]
pub fn anchor_date(
    cultivation_date: &str,
    planting_method: &str,
    transplanting_date: Option<String>,
) -> Result<String, JsValue> {
    anchor(cultivation_date, planting_method, transplanting_date).map_err(to_js)
}

/// Whether a variety duration can be scheduled
#[wasm_bindgen]
pub fn is_supported_duration(duration_days: u32) -> bool {
    validate_duration_days(duration_days).is_ok()
}

fn lcc_urea(
    plant_age: u32,
    leaf_color_index: u8,
    area: f64,
    table_json: Option<&str>,
) -> Result<f64, String> {
    let area = Decimal::try_from(area).map_err(|_| format!("Invalid area {}", area))?;
    let table = match table_json {
        Some(json) => LccTable::from_json(json)?,
        None => LccTable::default(),
    };
    let recommendation = LccAdjustor::new(&table)
        .recommend(plant_age, leaf_color_index, area)
        .map_err(|e| e.to_string())?;
    decimal_to_f64(recommendation.recommended_total)
}

/// Total urea in kg recommended for a chart reading over `area` acres.
///
/// Pass the server's chart table as JSON when one is configured there; the
/// built-in table is used otherwise.
#[wasm_bindgen]
pub fn recommend_lcc_urea(
    plant_age: u32,
    leaf_color_index: u8,
    area: f64,
    table_json: Option<String>,
) -> Result<f64, JsValue> {
    lcc_urea(plant_age, leaf_color_index, area, table_json.as_deref()).map_err(to_js)
}

fn parse_plan(plan_json: &str) -> Result<SeasonPlan, String> {
    serde_json::from_str(plan_json).map_err(|e| format!("Invalid plan JSON: {}", e))
}

/// Completed stage percentage of a plan
#[wasm_bindgen]
pub fn plan_progress(plan_json: &str) -> Result<f64, JsValue> {
    let plan = parse_plan(plan_json).map_err(to_js)?;
    decimal_to_f64(progress_percent(&plan)).map_err(to_js)
}

fn status_on(plan_json: &str, today: &str) -> Result<String, String> {
    let plan = parse_plan(plan_json)?;
    let today = parse_date(today, "date")?;
    Ok(derive_status(&plan, today).as_str().to_string())
}

/// Status of a cached plan. Uses the browser clock when `today` is omitted.
#[wasm_bindgen]
pub fn plan_status(plan_json: &str, today: Option<String>) -> Result<String, JsValue> {
    let today = match today {
        Some(today) => today,
        None => {
            let iso: String = js_sys::Date::new_0().to_iso_string().into();
            iso.chars().take(10).collect()
        }
    };
    status_on(plan_json, &today).map_err(to_js)
}
