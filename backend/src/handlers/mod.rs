//! HTTP handlers for the Paddy Season Planner API

pub mod health;
pub mod remarks;
pub mod season_plan;

use axum::{
    extract::{FromRequest, FromRequestParts},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::AppError;

pub use health::*;
pub use remarks::*;
pub use season_plan::*;

/// JSON body extractor whose rejections use the API error envelope, so an
/// unknown enum value or a malformed date is reported as a validation error
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

impl<T: Serialize> IntoResponse for AppJson<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Path extractor with the same error envelope
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);
