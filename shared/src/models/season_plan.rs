//! Season plan aggregate

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{DailyRemark, FertilizerApplication, GrowingStage, STAGE_COUNT};
use crate::error::{PlanError, PlanResult};
use crate::types::{ClimateZone, PaddyVarietyRef, PlantingMethod, Season};

/// Lifecycle state of a season plan
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    #[default]
    Planned,
    Active,
    Completed,
    /// Terminal, only ever set by an explicit user action
    Cancelled,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Planned => "planned",
            PlanStatus::Active => "active",
            PlanStatus::Completed => "completed",
            PlanStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "planned" => Some(PlanStatus::Planned),
            "active" => Some(PlanStatus::Active),
            "completed" => Some(PlanStatus::Completed),
            "cancelled" => Some(PlanStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedHarvest {
    pub date: NaiveDate,
    /// Total expected yield in kg, when a per-acre expectation was given
    #[serde(default)]
    pub estimated_yield: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActualHarvest {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub actual_yield: Option<Decimal>,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// One cultivation plan for a farm, season and variety
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SeasonPlan {
    pub id: Uuid,
    pub farm_id: Uuid,
    pub variety: PaddyVarietyRef,
    pub season: Season,
    #[serde(default)]
    pub climate_zone: Option<ClimateZone>,
    #[serde(default)]
    pub irrigation_method: Option<String>,
    #[serde(default)]
    pub soil_condition: Option<String>,
    /// Acres
    pub cultivating_area: Decimal,
    pub cultivation_date: NaiveDate,
    #[serde(default)]
    pub planting_method: Option<PlantingMethod>,
    #[serde(default)]
    pub transplanting_date: Option<NaiveDate>,
    pub growing_stages: [GrowingStage; STAGE_COUNT],
    pub fertilizer_schedule: Vec<FertilizerApplication>,
    #[serde(default)]
    pub daily_remarks: Vec<DailyRemark>,
    #[serde(default)]
    pub expected_harvest: Option<ExpectedHarvest>,
    #[serde(default)]
    pub actual_harvest: Option<ActualHarvest>,
    #[serde(default)]
    pub status: PlanStatus,
    /// Optimistic concurrency token, bumped on every stored write
    #[serde(default)]
    pub version: i64,
    #[serde(default)]
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SeasonPlan {
    /// The date all stage and fertilizer offsets are measured from
    pub fn anchor_date(&self) -> NaiveDate {
        effective_anchor(
            self.cultivation_date,
            self.planting_method,
            self.transplanting_date,
        )
    }

    /// Days elapsed between the anchor and `date` (negative before the anchor)
    pub fn days_since_anchor(&self, date: NaiveDate) -> i64 {
        (date - self.anchor_date()).num_days()
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == PlanStatus::Cancelled
    }

    /// Reject mutations on plans that reached the terminal cancelled state
    pub fn ensure_mutable(&self) -> PlanResult<()> {
        if self.is_cancelled() {
            return Err(PlanError::Conflict(
                "Season plan has been cancelled and can no longer be modified".to_string(),
            ));
        }
        Ok(())
    }

    pub fn stage(&self, index: usize) -> PlanResult<&GrowingStage> {
        self.growing_stages
            .get(index)
            .ok_or_else(|| PlanError::NotFound(format!("Growing stage {}", index)))
    }

    pub fn fertilizer(&self, index: usize) -> PlanResult<&FertilizerApplication> {
        self.fertilizer_schedule
            .get(index)
            .ok_or_else(|| PlanError::NotFound(format!("Fertilizer application {}", index)))
    }

    pub fn remark(&self, id: Uuid) -> PlanResult<&DailyRemark> {
        self.daily_remarks
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| PlanError::NotFound("Daily remark".to_string()))
    }

    /// Every image filename referenced by the plan's remarks
    pub fn image_filenames(&self) -> Vec<String> {
        self.daily_remarks
            .iter()
            .flat_map(|r| r.images.iter().cloned())
            .collect()
    }
}

/// Transplanting date when the crop is transplanted and the date is known,
/// otherwise the cultivation date
pub fn effective_anchor(
    cultivation_date: NaiveDate,
    planting_method: Option<PlantingMethod>,
    transplanting_date: Option<NaiveDate>,
) -> NaiveDate {
    match (planting_method, transplanting_date) {
        (Some(PlantingMethod::Transplanting), Some(date)) => date,
        _ => cultivation_date,
    }
}
