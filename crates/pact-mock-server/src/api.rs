//! Mock route definitions

use crate::handlers::{self, AppState};
use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Mock server routes
#[derive(Debug)]
pub struct MockApi;

impl MockApi {
    /// Router serving a session: every method and path goes to the matcher
    pub fn router(state: AppState, cors: bool) -> Router {
        let router = Router::new()
            .fallback(handlers::mock_handler)
            .with_state(state)
            .layer(TraceLayer::new_for_http());
        if cors {
            router.layer(CorsLayer::permissive())
        } else {
            router
        }
    }
}
