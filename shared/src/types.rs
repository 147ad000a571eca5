//! Common types used across the platform

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sri Lankan paddy cultivation seasons
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    /// Roughly October to March
    Maha,
    /// Roughly April to September
    Yala,
}

impl Season {
    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Maha => "maha",
            Season::Yala => "yala",
        }
    }
}

impl std::fmt::Display for Season {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Season::Maha => write!(f, "Maha"),
            Season::Yala => write!(f, "Yala"),
        }
    }
}

/// How the crop is established in the field
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlantingMethod {
    Transplanting,
    Direct,
}

/// Agro-climatic zone of the farm
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ClimateZone {
    Wet,
    Intermediate,
    Dry,
}

impl ClimateZone {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wet" | "wet zone" => Some(ClimateZone::Wet),
            "intermediate" | "intermediate zone" => Some(ClimateZone::Intermediate),
            "dry" | "dry zone" => Some(ClimateZone::Dry),
            _ => None,
        }
    }
}

/// Paddy variety reference with the catalog attributes cached on the plan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaddyVarietyRef {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Days from anchor to maturity
    pub duration_days: u32,
    /// Catalog grain type, e.g. "samba" or "nadu"
    #[serde(rename = "type")]
    pub variety_type: String,
}
