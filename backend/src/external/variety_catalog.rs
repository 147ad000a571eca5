//! Paddy variety catalog client
//!
//! Resolves a variety id to its maturity duration and type

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use shared::PaddyVarietyRef;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Variety record as served by the catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VarietyInfo {
    pub id: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    pub duration_days: u32,
    #[serde(rename = "type")]
    pub variety_type: String,
}

impl From<VarietyInfo> for PaddyVarietyRef {
    fn from(info: VarietyInfo) -> Self {
        PaddyVarietyRef {
            id: info.id,
            name: info.name,
            duration_days: info.duration_days,
            variety_type: info.variety_type,
        }
    }
}

/// Read-only source of variety reference data
#[axum::async_trait]
pub trait VarietyCatalog: Send + Sync {
    /// `Ok(None)` when the catalog does not know the id
    async fn get_variety(&self, id: Uuid) -> AppResult<Option<VarietyInfo>>;
}

/// HTTP client for the variety catalog service
#[derive(Clone)]
pub struct VarietyCatalogClient {
    client: Client,
    base_url: String,
}

impl VarietyCatalogClient {
    pub fn new(base_url: String, timeout_secs: u64) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build catalog client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[axum::async_trait]
impl VarietyCatalog for VarietyCatalogClient {
    async fn get_variety(&self, id: Uuid) -> AppResult<Option<VarietyInfo>> {
        let url = format!("{}/varieties/{}", self.base_url, id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::CatalogError(format!("Request failed: {}", e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::CatalogError(format!("{} - {}", status, body)));
        }

        let variety: VarietyInfo = response
            .json()
            .await
            .map_err(|e| AppError::CatalogError(format!("Failed to parse variety: {}", e)))?;

        tracing::debug!(variety_id = %id, duration_days = variety.duration_days, "Resolved paddy variety");
        Ok(Some(variety))
    }
}
