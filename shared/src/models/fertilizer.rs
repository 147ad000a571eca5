//! Fertilizer application models

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Label of a fertilizer application within the season
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FertilizerStage {
    Basal,
    FirstTopDressing,
    SecondTopDressing,
    /// Extra urea triggered by a leaf color chart reading
    LccAdjustment,
}

impl std::fmt::Display for FertilizerStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FertilizerStage::Basal => write!(f, "Basal Application"),
            FertilizerStage::FirstTopDressing => write!(f, "First Top Dressing"),
            FertilizerStage::SecondTopDressing => write!(f, "Second Top Dressing"),
            FertilizerStage::LccAdjustment => write!(f, "LCC Based Application"),
        }
    }
}

/// Fertilizer quantities in kg for the whole cultivated area.
///
/// This is the only shape the engine works with. Older records stored each
/// nutrient as a nested `{ "perAcre": .., "total": .. }` object; those are
/// accepted on input and normalized to the field total.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", try_from = "RawFertilizerQuantities")]
pub struct FertilizerQuantities {
    pub urea: Decimal,
    pub tsp: Decimal,
    pub mop: Decimal,
    pub zinc_sulphate: Decimal,
}

impl FertilizerQuantities {
    pub const ZERO: FertilizerQuantities = FertilizerQuantities {
        urea: Decimal::ZERO,
        tsp: Decimal::ZERO,
        mop: Decimal::ZERO,
        zinc_sulphate: Decimal::ZERO,
    };

    /// Urea-only quantity, as produced by leaf color chart readings
    pub fn urea_only(urea: Decimal) -> Self {
        Self {
            urea,
            ..Self::ZERO
        }
    }

    pub fn is_zero(&self) -> bool {
        self.urea.is_zero() && self.tsp.is_zero() && self.mop.is_zero() && self.zinc_sulphate.is_zero()
    }

    /// Sum of all nutrients in kg
    pub fn total(&self) -> Decimal {
        self.urea + self.tsp + self.mop + self.zinc_sulphate
    }
}

/// Wire representation accepting both the flat and the legacy nested shape
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFertilizerQuantities {
    #[serde(default)]
    urea: Option<RawQuantity>,
    #[serde(default)]
    tsp: Option<RawQuantity>,
    #[serde(default)]
    mop: Option<RawQuantity>,
    #[serde(default, alias = "zinc_sulphate", alias = "zinc")]
    zinc_sulphate: Option<RawQuantity>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawQuantity {
    Amount(Decimal),
    PerField { total: Decimal },
}

impl RawQuantity {
    fn resolve(value: Option<RawQuantity>, key: &str) -> Result<Decimal, String> {
        let amount = match value {
            None => Decimal::ZERO,
            Some(RawQuantity::Amount(amount)) => amount,
            Some(RawQuantity::PerField { total }) => total,
        };
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(format!("fertilizer quantity '{}' cannot be negative", key));
        }
        Ok(amount)
    }
}

impl TryFrom<RawFertilizerQuantities> for FertilizerQuantities {
    type Error = String;

    fn try_from(raw: RawFertilizerQuantities) -> Result<Self, Self::Error> {
        Ok(Self {
            urea: RawQuantity::resolve(raw.urea, "urea")?,
            tsp: RawQuantity::resolve(raw.tsp, "tsp")?,
            mop: RawQuantity::resolve(raw.mop, "mop")?,
            zinc_sulphate: RawQuantity::resolve(raw.zinc_sulphate, "zincSulphate")?,
        })
    }
}

/// Inputs captured with a leaf color chart reading
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LccData {
    /// Days since the anchor date when the chart was read
    pub plant_age: u32,
    pub leaf_color_index: u8,
    pub recommended_per_acre: Decimal,
    pub total_area: Decimal,
}

/// One planned (and possibly executed) fertilizer application
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FertilizerApplication {
    pub stage: FertilizerStage,
    pub description: String,
    pub planned_date: NaiveDate,
    pub fertilizers: FertilizerQuantities,
    #[serde(default)]
    pub applied: bool,
    #[serde(default)]
    pub implemented_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, rename = "isLCCBased", alias = "isLccBased")]
    pub is_lcc_based: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lcc_data: Option<LccData>,
}
