//! Season plan HTTP handlers

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use shared::{
    FertilizerImplementationUpdate, HarvestRecord, LeafColorReading, PlanSummary, SeasonPlan,
    StageImplementationUpdate,
};
use uuid::Uuid;

use super::{AppJson, AppPath};
use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::season_plan::{
    CreateSeasonPlanInput, LccReadingResult, PreviewScheduleInput, SchedulePreview,
    SeasonPlanService,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPlansQuery {
    pub farm_id: Option<Uuid>,
}

/// Create a season plan with its baseline schedule
pub async fn create_season_plan(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(input): AppJson<CreateSeasonPlanInput>,
) -> AppResult<impl IntoResponse> {
    let service = SeasonPlanService::new(&state);
    let plan = service.create_plan(input, Some(user.user_id)).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

/// Preview the baseline schedule without storing a plan
pub async fn preview_schedule(
    State(state): State<AppState>,
    _user: CurrentUser,
    AppJson(input): AppJson<PreviewScheduleInput>,
) -> AppResult<Json<SchedulePreview>> {
    let service = SeasonPlanService::new(&state);
    Ok(Json(service.preview(input).await?))
}

/// List season plans, optionally for one farm
pub async fn list_season_plans(
    State(state): State<AppState>,
    _user: CurrentUser,
    query: Result<Query<ListPlansQuery>, axum::extract::rejection::QueryRejection>,
) -> AppResult<Json<Vec<SeasonPlan>>> {
    let Query(query) = query.map_err(AppError::from)?;
    let service = SeasonPlanService::new(&state);
    Ok(Json(service.list_plans(query.farm_id).await?))
}

pub async fn get_season_plan(
    State(state): State<AppState>,
    _user: CurrentUser,
    AppPath(plan_id): AppPath<Uuid>,
) -> AppResult<Json<SeasonPlan>> {
    let service = SeasonPlanService::new(&state);
    Ok(Json(service.get_plan(plan_id).await?))
}

pub async fn delete_season_plan(
    State(state): State<AppState>,
    _user: CurrentUser,
    AppPath(plan_id): AppPath<Uuid>,
) -> AppResult<StatusCode> {
    let service = SeasonPlanService::new(&state);
    service.delete_plan(plan_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Cancel a plan; cancelled plans accept no further changes
pub async fn cancel_season_plan(
    State(state): State<AppState>,
    _user: CurrentUser,
    AppPath(plan_id): AppPath<Uuid>,
) -> AppResult<Json<SeasonPlan>> {
    let service = SeasonPlanService::new(&state);
    Ok(Json(service.cancel_plan(plan_id).await?))
}

pub async fn get_plan_summary(
    State(state): State<AppState>,
    _user: CurrentUser,
    AppPath(plan_id): AppPath<Uuid>,
) -> AppResult<Json<PlanSummary>> {
    let service = SeasonPlanService::new(&state);
    Ok(Json(service.summary(plan_id).await?))
}

/// Export the stage and fertilizer calendars as CSV
pub async fn export_plan_calendar(
    State(state): State<AppState>,
    _user: CurrentUser,
    AppPath(plan_id): AppPath<Uuid>,
) -> AppResult<impl IntoResponse> {
    let service = SeasonPlanService::new(&state);
    let csv = service.calendar_csv(plan_id).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"season_plan_{}.csv\"", plan_id),
            ),
        ],
        csv,
    ))
}

/// Mark a fertilizer application as applied or not applied
pub async fn update_fertilizer_implementation(
    State(state): State<AppState>,
    _user: CurrentUser,
    AppPath((plan_id, index)): AppPath<(Uuid, usize)>,
    AppJson(update): AppJson<FertilizerImplementationUpdate>,
) -> AppResult<Json<SeasonPlan>> {
    let service = SeasonPlanService::new(&state);
    Ok(Json(service.update_fertilizer(plan_id, index, update).await?))
}

/// Delete a fertilizer application that has not been applied
pub async fn delete_fertilizer_application(
    State(state): State<AppState>,
    _user: CurrentUser,
    AppPath((plan_id, index)): AppPath<(Uuid, usize)>,
) -> AppResult<Json<SeasonPlan>> {
    let service = SeasonPlanService::new(&state);
    Ok(Json(service.delete_fertilizer(plan_id, index).await?))
}

pub async fn update_stage_implementation(
    State(state): State<AppState>,
    _user: CurrentUser,
    AppPath((plan_id, index)): AppPath<(Uuid, usize)>,
    AppJson(update): AppJson<StageImplementationUpdate>,
) -> AppResult<Json<SeasonPlan>> {
    let service = SeasonPlanService::new(&state);
    Ok(Json(service.update_stage(plan_id, index, update).await?))
}

/// Record a leaf color chart reading and append the resulting urea entry
pub async fn record_leaf_color_reading(
    State(state): State<AppState>,
    _user: CurrentUser,
    AppPath(plan_id): AppPath<Uuid>,
    AppJson(reading): AppJson<LeafColorReading>,
) -> AppResult<impl IntoResponse> {
    let service = SeasonPlanService::new(&state);
    let result: LccReadingResult = service.record_lcc_reading(plan_id, reading).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

pub async fn update_harvest(
    State(state): State<AppState>,
    _user: CurrentUser,
    AppPath(plan_id): AppPath<Uuid>,
    AppJson(record): AppJson<HarvestRecord>,
) -> AppResult<Json<SeasonPlan>> {
    let service = SeasonPlanService::new(&state);
    Ok(Json(service.record_harvest(plan_id, record).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Uri;

    #[test]
    fn test_list_query_uses_camel_case_farm_id() {
        let farm_id = Uuid::new_v4();
        let uri: Uri = format!("/api/v1/season-plans?farmId={}", farm_id).parse().unwrap();
        let Query(query) = Query::<ListPlansQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(query.farm_id, Some(farm_id));

        let uri: Uri = format!("/api/v1/season-plans?farm_id={}", farm_id).parse().unwrap();
        let Query(query) = Query::<ListPlansQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(query.farm_id, None);
    }
}
