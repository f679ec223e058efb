//! Route table shared by the binary and the integration tests.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::handlers;
use crate::state::AppState;

/// Largest accepted upload (rosters, price workbooks, PDF scales).
pub const UPLOAD_LIMIT: usize = 32 * 1024 * 1024;

/// Build the desk router with static files and request tracing.
pub fn build_app_router(state: Arc<AppState>, static_dir: &str) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/upload", post(handlers::upload))
        .route("/process", post(handlers::process))
        .route("/export/xlsx", post(handlers::export_xlsx))
        .route("/export/pdf", post(handlers::export_pdf))
        .route("/rotations/filter", post(handlers::filter_rotations))
        .route("/rotations/reset", post(handlers::reset_rotations))
        .route("/config/bases", post(handlers::add_config_base))
        .route("/config/save", post(handlers::save_config))
        .route("/prices/year", post(handlers::select_price_year))
        .route("/prices/search", post(handlers::search_prices))
        .route("/prices/periods", post(handlers::add_price_period))
        .route("/prices/periods/delete", post(handlers::delete_price_period))
        .route("/prices/update", post(handlers::update_price))
        .route("/prices/duplicate", post(handlers::duplicate_prices))
        .route("/prices/import", post(handlers::import_prices))
        .route("/prices/import-pdf", post(handlers::import_pdf_prices))
        .route("/prices/export", get(handlers::export_prices))
        .route("/airports", post(handlers::add_airport))
        .route("/airports/search", post(handlers::search_airports))
        .route("/airports/reset", post(handlers::reset_airports))
        .route("/airports/next", post(handlers::next_airports))
        .route("/airports/prev", post(handlers::prev_airports))
        .route("/airports/import", post(handlers::import_airports))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(DefaultBodyLimit::max(UPLOAD_LIMIT))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
