pub mod health;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::assessment::handlers;
use crate::report::handlers as report_handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Catalog
        .route(
            "/api/v1/categories/classified",
            get(handlers::handle_classified_categories),
        )
        .route(
            "/api/v1/categories/:id/questions",
            get(handlers::handle_category_questions),
        )
        // Assessment progress and responses
        .route(
            "/api/v1/assessments/:id/progress",
            get(handlers::handle_get_progress),
        )
        .route(
            "/api/v1/assessments/:id/progress/sync",
            post(handlers::handle_sync_progress),
        )
        .route(
            "/api/v1/assessments/:id/categories/:category_id/progress",
            get(handlers::handle_category_progress),
        )
        .route(
            "/api/v1/assessments/:id/responses/:question_id",
            put(handlers::handle_save_response),
        )
        .route(
            "/api/v1/assessments/:id/cache",
            delete(handlers::handle_clear_cache),
        )
        // Reports
        .route(
            "/api/v1/assessments/:id/reports/:report_type",
            get(report_handlers::handle_get_report),
        )
        .route(
            "/api/v1/assessments/:id/reports/:report_type/export",
            post(report_handlers::handle_export_report),
        )
        .with_state(state)
}
