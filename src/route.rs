use std::sync::Arc;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::{handler::*, middleware::mw_require_auth, AppState};

pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/todos", get(get_todos))
        .route(
            "/todos/:id",
            get(get_todo)
                .post(create_todo)
                .put(update_todo)
                .delete(delete_todo),
        )
        .route("/logout", post(logout))
        .route_layer(from_fn_with_state(app_state.clone(), mw_require_auth))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/", get(health_checker_handler))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
}
