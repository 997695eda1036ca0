use std::sync::Arc;

use axum::{
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use crate::{auth::SESSION_COOKIE, error::AppError, model::CurrentUser, AppState};

/// Rejects requests without a live session cookie. On success the resolved
/// [`CurrentUser`] is available to handlers as a request extension.
pub async fn mw_require_auth<B>(
    State(data): State<Arc<AppState>>,
    mut request: Request<B>,
    next: Next<B>,
) -> Result<Response, AppError> {
    let jar = CookieJar::from_headers(request.headers());
    let session_id = match jar.get(SESSION_COOKIE) {
        Some(cookie) => cookie.value().to_string(),
        None => return Err(AppError::Unauthenticated),
    };

    let user_id = data
        .sessions
        .current_user(&session_id)
        .await?
        .ok_or(AppError::Unauthenticated)?;

    request
        .extensions_mut()
        .insert(CurrentUser { user_id, session_id });

    Ok(next.run(request).await)
}
