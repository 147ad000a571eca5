//! Daily remark and remark image handlers

use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use shared::remarks::{NewRemark, RemarkUpdate};
use shared::SeasonPlan;
use uuid::Uuid;

use super::{AppJson, AppPath};
use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::season_plan::{ImageUpload, SeasonPlanService};
use crate::AppState;

/// Multipart field carrying the image
const IMAGE_FIELD: &str = "image";

pub async fn add_daily_remark(
    State(state): State<AppState>,
    _user: CurrentUser,
    AppPath(plan_id): AppPath<Uuid>,
    AppJson(remark): AppJson<NewRemark>,
) -> AppResult<impl IntoResponse> {
    let service = SeasonPlanService::new(&state);
    let plan = service.add_remark(plan_id, remark).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

pub async fn update_daily_remark(
    State(state): State<AppState>,
    _user: CurrentUser,
    AppPath((plan_id, remark_id)): AppPath<(Uuid, Uuid)>,
    AppJson(update): AppJson<RemarkUpdate>,
) -> AppResult<Json<SeasonPlan>> {
    let service = SeasonPlanService::new(&state);
    Ok(Json(service.update_remark(plan_id, remark_id, update).await?))
}

pub async fn delete_daily_remark(
    State(state): State<AppState>,
    _user: CurrentUser,
    AppPath((plan_id, remark_id)): AppPath<(Uuid, Uuid)>,
) -> AppResult<Json<SeasonPlan>> {
    let service = SeasonPlanService::new(&state);
    Ok(Json(service.delete_remark(plan_id, remark_id).await?))
}

/// Upload an image (multipart field `image`) and attach it to a remark
pub async fn upload_remark_image(
    State(state): State<AppState>,
    _user: CurrentUser,
    AppPath((plan_id, remark_id)): AppPath<(Uuid, Uuid)>,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::ValidationError(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let original_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::ValidationError(format!("Failed to read image: {}", e)))?;
        upload = Some(ImageUpload {
            original_name,
            content_type,
            bytes: bytes.to_vec(),
        });
        break;
    }
    let upload = upload
        .ok_or_else(|| AppError::validation(IMAGE_FIELD, "Multipart field 'image' is required"))?;

    let service = SeasonPlanService::new(&state);
    let plan = service.upload_remark_image(plan_id, remark_id, upload).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

/// Detach one image from a remark
pub async fn remove_remark_image(
    State(state): State<AppState>,
    _user: CurrentUser,
    AppPath((plan_id, remark_id, filename)): AppPath<(Uuid, Uuid, String)>,
) -> AppResult<Json<SeasonPlan>> {
    let service = SeasonPlanService::new(&state);
    Ok(Json(
        service
            .remove_remark_image(plan_id, remark_id, filename)
            .await?,
    ))
}

/// Serve a stored remark image
pub async fn fetch_remark_image(
    State(state): State<AppState>,
    _user: CurrentUser,
    AppPath(filename): AppPath<String>,
) -> AppResult<impl IntoResponse> {
    let service = SeasonPlanService::new(&state);
    let (bytes, content_type) = service.fetch_image(&filename).await?;
    Ok(([(header::CONTENT_TYPE, content_type)], bytes))
}
