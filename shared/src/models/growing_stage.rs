//! Growing stage models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Number of entries in every plan's stage calendar
pub const STAGE_COUNT: usize = 9;

/// The phases of a paddy cultivation cycle, in calendar order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    LandPreparation,
    Establishment,
    Tillering,
    PanicleInitiation,
    Flowering,
    GrainFilling,
    Maturity,
    Harvesting,
    PostHarvest,
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageKind::LandPreparation => write!(f, "Land Preparation"),
            StageKind::Establishment => write!(f, "Establishment"),
            StageKind::Tillering => write!(f, "Tillering"),
            StageKind::PanicleInitiation => write!(f, "Panicle Initiation"),
            StageKind::Flowering => write!(f, "Flowering"),
            StageKind::GrainFilling => write!(f, "Grain Filling"),
            StageKind::Maturity => write!(f, "Maturity"),
            StageKind::Harvesting => write!(f, "Harvesting"),
            StageKind::PostHarvest => write!(f, "Post-Harvest"),
        }
    }
}

/// One entry of the stage calendar: the planned window plus what happened
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GrowingStage {
    pub stage: StageKind,
    pub description: String,
    pub planned_start: NaiveDate,
    pub planned_end: NaiveDate,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub actual_start: Option<NaiveDate>,
    #[serde(default)]
    pub actual_end: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl GrowingStage {
    /// A stage counts as started once work on it has been reported
    pub fn is_started(&self) -> bool {
        self.completed || self.actual_start.is_some()
    }

    /// Whether `date` falls inside the planned window
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.planned_start <= date && date <= self.planned_end
    }
}
