//! Farm registry client
//!
//! Farm records are only used to pre-fill plan inputs the caller left out

use std::time::Duration;

use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::ClimateZone;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FarmProfile {
    pub id: Uuid,
    #[serde(default)]
    pub district: Option<String>,
    /// Free text such as "Dry Zone"
    #[serde(default)]
    pub climate_zone: Option<String>,
    /// Acres
    #[serde(default)]
    pub cultivated_area: Option<Decimal>,
}

impl FarmProfile {
    pub fn climate_zone(&self) -> Option<ClimateZone> {
        self.climate_zone.as_deref().and_then(ClimateZone::from_str)
    }
}

#[axum::async_trait]
pub trait FarmRegistry: Send + Sync {
    async fn get_farm(&self, id: Uuid) -> AppResult<Option<FarmProfile>>;
}

/// HTTP client for the farm registry service
#[derive(Clone)]
pub struct FarmRegistryClient {
    client: Client,
    base_url: String,
}

impl FarmRegistryClient {
    pub fn new(base_url: String, timeout_secs: u64) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build farm registry client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[axum::async_trait]
impl FarmRegistry for FarmRegistryClient {
    async fn get_farm(&self, id: Uuid) -> AppResult<Option<FarmProfile>> {
        let url = format!("{}/farms/{}", self.base_url, id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::FarmRegistryError(format!("Request failed: {}", e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::FarmRegistryError(format!("{} - {}", status, body)));
        }

        let farm = response
            .json()
            .await
            .map_err(|e| AppError::FarmRegistryError(format!("Failed to parse farm: {}", e)))?;
        Ok(Some(farm))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_climate_zone_text_is_parsed() {
        let farm: FarmProfile = serde_json::from_str(
            r#"{"id": "6f1c0c8e-2a57-4f53-9d7b-0b7f8f0a1c11", "district": "Polonnaruwa", "climateZone": "Dry Zone", "cultivatedArea": 2.5}"#,
        )
        .unwrap();
        assert_eq!(farm.climate_zone(), Some(ClimateZone::Dry));
        assert_eq!(farm.cultivated_area, Some(Decimal::new(25, 1)));
    }

    #[test]
    fn test_unknown_climate_zone_is_ignored() {
        let farm = FarmProfile {
            id: Uuid::new_v4(),
            district: None,
            climate_zone: Some("Highlands".to_string()),
            cultivated_area: None,
        };
        assert_eq!(farm.climate_zone(), None);
    }
}
