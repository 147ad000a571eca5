//! Leaf color chart (LCC) urea adjustment
//!
//! A chart reading compares leaf color against a reference scale; paler
//! leaves (a lower index) call for more nitrogen. The urea rate for each
//! index is agronomy reference data and is supplied as an [`LccTable`].
//! Every reading becomes its own fertilizer entry appended to the plan, so a
//! field checked several times in a season keeps the full history.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{PlanError, PlanResult};
use crate::models::{FertilizerApplication, FertilizerQuantities, FertilizerStage, LccData, SeasonPlan};

/// Plant-age window in which chart readings map to urea rates
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LccWindow {
    pub min_age_days: u32,
    pub max_age_days: u32,
    /// Chart index -> kg urea per acre
    pub urea_per_acre: BTreeMap<u8, Decimal>,
}

/// Lookup table from (plant age, chart index) to a urea rate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LccTable {
    pub windows: Vec<LccWindow>,
}

impl Default for LccTable {
    fn default() -> Self {
        let window = |min_age_days, max_age_days, rates: [(u8, i64); 4]| LccWindow {
            min_age_days,
            max_age_days,
            urea_per_acre: rates
                .into_iter()
                .map(|(index, kg)| (index, Decimal::from(kg)))
                .collect(),
        };
        Self {
            windows: vec![
                window(14, 35, [(2, 30), (3, 20), (4, 10), (5, 0)]),
                window(36, 70, [(2, 40), (3, 25), (4, 10), (5, 0)]),
            ],
        }
    }
}

impl LccTable {
    /// Parse a table from its JSON form
    pub fn from_json(json: &str) -> Result<Self, String> {
        let table: LccTable =
            serde_json::from_str(json).map_err(|e| format!("Invalid LCC table: {}", e))?;
        table.validate().map_err(str::to_string)?;
        Ok(table)
    }

    /// Check the table is usable: ordered, non-overlapping windows whose
    /// rates never increase as the chart index goes up
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.windows.is_empty() {
            return Err("LCC table must contain at least one age window");
        }
        for window in &self.windows {
            if window.min_age_days > window.max_age_days {
                return Err("LCC window minimum age is after its maximum age");
            }
            if window.urea_per_acre.is_empty() {
                return Err("LCC window has no chart indices");
            }
            if window
                .urea_per_acre
                .values()
                .any(|rate| rate.is_sign_negative() && !rate.is_zero())
            {
                return Err("LCC urea rates cannot be negative");
            }
            let rates: Vec<&Decimal> = window.urea_per_acre.values().collect();
            if rates.windows(2).any(|pair| pair[0] < pair[1]) {
                return Err("LCC urea rates must not increase with the chart index");
            }
        }
        let mut sorted: Vec<&LccWindow> = self.windows.iter().collect();
        sorted.sort_by_key(|w| w.min_age_days);
        if sorted
            .windows(2)
            .any(|pair| pair[1].min_age_days <= pair[0].max_age_days)
        {
            return Err("LCC age windows overlap");
        }
        Ok(())
    }

    fn window_for(&self, plant_age: u32) -> Option<&LccWindow> {
        self.windows
            .iter()
            .find(|w| w.min_age_days <= plant_age && plant_age <= w.max_age_days)
    }

    /// Urea per acre for a reading, or a validation error when the age is
    /// outside every window or the index is not on the chart
    pub fn urea_per_acre(&self, plant_age: u32, leaf_color_index: u8) -> PlanResult<Decimal> {
        let window = self.window_for(plant_age).ok_or_else(|| {
            PlanError::validation(
                "plantAge",
                format!(
                    "Leaf color chart readings are not used at {} days after planting",
                    plant_age
                ),
            )
        })?;
        window
            .urea_per_acre
            .get(&leaf_color_index)
            .copied()
            .ok_or_else(|| {
                PlanError::validation(
                    "leafColorIndex",
                    format!("Leaf color index {} is not on the chart", leaf_color_index),
                )
            })
    }
}

/// A chart reading reported from the field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LeafColorReading {
    pub date: NaiveDate,
    /// Days since the anchor; derived from `date` when omitted
    #[serde(default)]
    pub plant_age: Option<u32>,
    pub leaf_color_index: u8,
}

/// Recommended urea for one reading
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LccRecommendation {
    pub plant_age: u32,
    pub leaf_color_index: u8,
    pub recommended_per_acre: Decimal,
    pub recommended_total: Decimal,
    pub total_area: Decimal,
}

/// Turns chart readings into urea recommendations and fertilizer entries
#[derive(Debug, Clone, Copy)]
pub struct LccAdjustor<'a> {
    table: &'a LccTable,
}

impl<'a> LccAdjustor<'a> {
    pub fn new(table: &'a LccTable) -> Self {
        Self { table }
    }

    /// Pure recommendation: `recommendedTotal = perAcre x totalArea`
    pub fn recommend(
        &self,
        plant_age: u32,
        leaf_color_index: u8,
        total_area: Decimal,
    ) -> PlanResult<LccRecommendation> {
        if total_area.is_sign_negative() && !total_area.is_zero() {
            return Err(PlanError::validation("totalArea", "Total area cannot be negative"));
        }
        let per_acre = self.table.urea_per_acre(plant_age, leaf_color_index)?;
        let total = (per_acre * total_area)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            .normalize();
        Ok(LccRecommendation {
            plant_age,
            leaf_color_index,
            recommended_per_acre: per_acre,
            recommended_total: total,
            total_area,
        })
    }

    /// Build the standalone fertilizer entry for a reading
    pub fn build_entry(&self, date: NaiveDate, recommendation: &LccRecommendation) -> FertilizerApplication {
        FertilizerApplication {
            stage: FertilizerStage::LccAdjustment,
            description: format!(
                "Leaf color index {} at {} days: {} kg urea per acre",
                recommendation.leaf_color_index,
                recommendation.plant_age,
                recommendation.recommended_per_acre
            ),
            planned_date: date,
            fertilizers: FertilizerQuantities::urea_only(recommendation.recommended_total),
            applied: false,
            implemented_date: None,
            notes: None,
            is_lcc_based: true,
            lcc_data: Some(LccData {
                plant_age: recommendation.plant_age,
                leaf_color_index: recommendation.leaf_color_index,
                recommended_per_acre: recommendation.recommended_per_acre,
                total_area: recommendation.total_area,
            }),
        }
    }

    /// Append one LCC-based entry to the plan. Existing entries are never
    /// touched.
    pub fn record_reading(
        &self,
        plan: &mut SeasonPlan,
        reading: &LeafColorReading,
    ) -> PlanResult<LccRecommendation> {
        plan.ensure_mutable()?;

        let plant_age = match reading.plant_age {
            Some(age) => age,
            None => {
                let days = plan.days_since_anchor(reading.date);
                u32::try_from(days).map_err(|_| {
                    PlanError::validation("date", "Reading date is before the planting date")
                })?
            }
        };

        let recommendation = self.recommend(plant_age, reading.leaf_color_index, plan.cultivating_area)?;
        plan.fertilizer_schedule
            .push(self.build_entry(reading.date, &recommendation));
        Ok(recommendation)
    }
}
