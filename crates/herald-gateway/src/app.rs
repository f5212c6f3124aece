use axum::{
    routing::{get, post},
    Router,
};
use chrono_tz::Tz;
use herald_core::HeraldConfig;
use herald_scheduler::EntryStore;
use std::sync::Arc;

/// Central shared state — passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: HeraldConfig,
    pub store: EntryStore,
    /// Canonical zone for interpreting and rendering user-facing date-times.
    pub tz: Tz,
}

impl AppState {
    pub fn new(config: HeraldConfig, store: EntryStore, tz: Tz) -> Self {
        Self { config, store, tz }
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route(
            "/schedules",
            get(crate::http::schedules::list_schedules).post(crate::http::schedules::create_schedule),
        )
        .route(
            "/schedules/{id}",
            get(crate::http::schedules::get_schedule)
                .patch(crate::http::schedules::update_schedule)
                .delete(crate::http::schedules::delete_schedule),
        )
        .route("/chat/commands", post(crate::http::chat::command_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
