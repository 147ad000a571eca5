//! Route definitions for the Paddy Season Planner

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Multipart framing allowance on top of the image itself
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Create API routes
pub fn api_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - season plans
        .nest("/season-plans", season_plan_routes(state))
        // Protected routes - remark images
        .nest("/images", image_routes(state))
}

/// Season plan routes (protected)
fn season_plan_routes(state: &AppState) -> Router<AppState> {
    let upload_limit = state.config.storage.max_image_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route(
            "/",
            get(handlers::list_season_plans).post(handlers::create_season_plan),
        )
        .route("/preview", post(handlers::preview_schedule))
        .route(
            "/:id",
            get(handlers::get_season_plan).delete(handlers::delete_season_plan),
        )
        .route("/:id/cancel", post(handlers::cancel_season_plan))
        .route("/:id/summary", get(handlers::get_plan_summary))
        .route("/:id/calendar.csv", get(handlers::export_plan_calendar))
        // Implementation tracking
        .route(
            "/:id/fertilizer/:index",
            put(handlers::update_fertilizer_implementation)
                .delete(handlers::delete_fertilizer_application),
        )
        .route("/:id/stages/:index", put(handlers::update_stage_implementation))
        .route("/:id/lcc", post(handlers::record_leaf_color_reading))
        .route("/:id/harvest", put(handlers::update_harvest))
        // Daily remarks
        .route("/:id/remarks", post(handlers::add_daily_remark))
        .route(
            "/:id/remarks/:remark_id",
            put(handlers::update_daily_remark).delete(handlers::delete_daily_remark),
        )
        .route(
            "/:id/remarks/:remark_id/images",
            post(handlers::upload_remark_image).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/:id/remarks/:remark_id/images/:filename",
            delete(handlers::remove_remark_image),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Remark image routes (protected)
fn image_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/:filename", get(handlers::fetch_remark_image))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}
