//! Daily field remark models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed set of remark categories offered to farmers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RemarkCategory {
    General,
    Weather,
    FieldPreparation,
    Plowing,
    SeedsPreparation,
    SeedingSowing,
    Transplanting,
    Harvesting,
    Pest,
    Disease,
    Fertilizer,
    Irrigation,
    Growth,
    Other,
}

impl RemarkCategory {
    pub const ALL: [RemarkCategory; 14] = [
        RemarkCategory::General,
        RemarkCategory::Weather,
        RemarkCategory::FieldPreparation,
        RemarkCategory::Plowing,
        RemarkCategory::SeedsPreparation,
        RemarkCategory::SeedingSowing,
        RemarkCategory::Transplanting,
        RemarkCategory::Harvesting,
        RemarkCategory::Pest,
        RemarkCategory::Disease,
        RemarkCategory::Fertilizer,
        RemarkCategory::Irrigation,
        RemarkCategory::Growth,
        RemarkCategory::Other,
    ];
}

/// A dated free-form field observation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DailyRemark {
    pub id: Uuid,
    pub date: NaiveDate,
    pub category: RemarkCategory,
    pub description: String,
    /// Opaque blob store filenames
    #[serde(default)]
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
}
