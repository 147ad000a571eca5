//! Season plan persistence
//!
//! Plans are stored one row per plan in `season_plans`, with the stage,
//! fertilizer and remark lists as JSONB documents. Updates are
//! compare-and-swap on the `version` column.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use shared::{PlanStatus, SeasonPlan};
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[axum::async_trait]
pub trait PlanStore: Send + Sync {
    async fn insert(&self, plan: &SeasonPlan) -> AppResult<()>;

    async fn load(&self, id: Uuid) -> AppResult<Option<SeasonPlan>>;

    async fn list(&self, farm_id: Option<Uuid>) -> AppResult<Vec<SeasonPlan>>;

    /// Write `plan` only if the stored version still equals
    /// `expected_version`. Returns `false` when another writer got there
    /// first.
    async fn update(&self, plan: &SeasonPlan, expected_version: i64) -> AppResult<bool>;

    /// Returns `false` when there was nothing to delete
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
}

/// PostgreSQL plan store
#[derive(Clone)]
pub struct PgPlanStore {
    db: PgPool,
}

impl PgPlanStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SeasonPlanRow {
    id: Uuid,
    farm_id: Uuid,
    variety: Value,
    season: String,
    climate_zone: Option<String>,
    irrigation_method: Option<String>,
    soil_condition: Option<String>,
    cultivating_area: Decimal,
    cultivation_date: NaiveDate,
    planting_method: Option<String>,
    transplanting_date: Option<NaiveDate>,
    growing_stages: Value,
    fertilizer_schedule: Value,
    daily_remarks: Value,
    expected_harvest: Option<Value>,
    actual_harvest: Option<Value>,
    status: String,
    version: i64,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn from_text<T: DeserializeOwned>(text: String) -> Result<T, serde_json::Error> {
    serde_json::from_value(Value::String(text))
}

fn to_text<T: Serialize>(value: &T) -> AppResult<String> {
    match serde_json::to_value(value) {
        Ok(Value::String(text)) => Ok(text),
        Ok(other) => Err(AppError::Internal(format!("Expected a text enum, got {}", other))),
        Err(e) => Err(AppError::Internal(format!("Failed to encode enum: {}", e))),
    }
}

impl TryFrom<SeasonPlanRow> for SeasonPlan {
    type Error = AppError;

    /// A stage list of the wrong length or any other malformed document
    /// surfaces as an integrity error
    fn try_from(row: SeasonPlanRow) -> Result<Self, Self::Error> {
        Ok(SeasonPlan {
            id: row.id,
            farm_id: row.farm_id,
            variety: serde_json::from_value(row.variety)?,
            season: from_text(row.season)?,
            climate_zone: row.climate_zone.map(from_text).transpose()?,
            irrigation_method: row.irrigation_method,
            soil_condition: row.soil_condition,
            cultivating_area: row.cultivating_area,
            cultivation_date: row.cultivation_date,
            planting_method: row.planting_method.map(from_text).transpose()?,
            transplanting_date: row.transplanting_date,
            growing_stages: serde_json::from_value(row.growing_stages)?,
            fertilizer_schedule: serde_json::from_value(row.fertilizer_schedule)?,
            daily_remarks: serde_json::from_value(row.daily_remarks)?,
            expected_harvest: row.expected_harvest.map(serde_json::from_value).transpose()?,
            actual_harvest: row.actual_harvest.map(serde_json::from_value).transpose()?,
            status: PlanStatus::from_str(&row.status).ok_or_else(|| {
                AppError::Integrity(format!("Unknown season plan status '{}'", row.status))
            })?,
            version: row.version,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, farm_id, variety, season, climate_zone, irrigation_method,
           soil_condition, cultivating_area, cultivation_date, planting_method,
           transplanting_date, growing_stages, fertilizer_schedule, daily_remarks,
           expected_harvest, actual_harvest, status, version, created_by,
           created_at, updated_at
    FROM season_plans
"#;

#[axum::async_trait]
impl PlanStore for PgPlanStore {
    async fn insert(&self, plan: &SeasonPlan) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO season_plans (
                id, farm_id, variety, season, climate_zone, irrigation_method,
                soil_condition, cultivating_area, cultivation_date, planting_method,
                transplanting_date, growing_stages, fertilizer_schedule, daily_remarks,
                expected_harvest, actual_harvest, status, version, created_by,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                    $15, $16, $17, $18, $19, $20, $21)
            "#,
        )
        .bind(plan.id)
        .bind(plan.farm_id)
        .bind(Json(&plan.variety))
        .bind(plan.season.as_str())
        .bind(plan.climate_zone.as_ref().map(to_text).transpose()?)
        .bind(&plan.irrigation_method)
        .bind(&plan.soil_condition)
        .bind(plan.cultivating_area)
        .bind(plan.cultivation_date)
        .bind(plan.planting_method.as_ref().map(to_text).transpose()?)
        .bind(plan.transplanting_date)
        .bind(Json(&plan.growing_stages))
        .bind(Json(&plan.fertilizer_schedule))
        .bind(Json(&plan.daily_remarks))
        .bind(plan.expected_harvest.as_ref().map(Json))
        .bind(plan.actual_harvest.as_ref().map(Json))
        .bind(plan.status.as_str())
        .bind(plan.version)
        .bind(plan.created_by)
        .bind(plan.created_at)
        .bind(plan.updated_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn load(&self, id: Uuid) -> AppResult<Option<SeasonPlan>> {
        let row = sqlx::query_as::<_, SeasonPlanRow>(&format!("{} WHERE id = $1", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        row.map(SeasonPlan::try_from).transpose()
    }

    async fn list(&self, farm_id: Option<Uuid>) -> AppResult<Vec<SeasonPlan>> {
        let rows = sqlx::query_as::<_, SeasonPlanRow>(&format!(
            "{} WHERE ($1::uuid IS NULL OR farm_id = $1) ORDER BY cultivation_date DESC, created_at DESC",
            SELECT_COLUMNS
        ))
        .bind(farm_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(SeasonPlan::try_from).collect()
    }

    async fn update(&self, plan: &SeasonPlan, expected_version: i64) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE season_plans
            SET growing_stages = $3,
                fertilizer_schedule = $4,
                daily_remarks = $5,
                expected_harvest = $6,
                actual_harvest = $7,
                status = $8,
                version = $9,
                updated_at = $10
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(plan.id)
        .bind(expected_version)
        .bind(Json(&plan.growing_stages))
        .bind(Json(&plan.fertilizer_schedule))
        .bind(Json(&plan.daily_remarks))
        .bind(plan.expected_harvest.as_ref().map(Json))
        .bind(plan.actual_harvest.as_ref().map(Json))
        .bind(plan.status.as_str())
        .bind(plan.version)
        .bind(plan.updated_at)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM season_plans WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
