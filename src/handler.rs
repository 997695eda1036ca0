use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::json;

use crate::{
    auth::SESSION_COOKIE,
    error::{AppError, StoreError},
    model::{CurrentUser, Todo, TodoPatch},
    schema::{CreateTodoSchema, CredentialsSchema, UpdateTodoSchema},
    AppState,
};

// Handler for the health checker route
pub async fn health_checker_handler() -> impl IntoResponse {
    const MESSAGE: &str = "Todo API with Rust, SQLX, SQLite, and Axum";

    let json_response = serde_json::json!({
        "status": "success",
        "message": MESSAGE
    });

    Json(json_response)
}

pub async fn register(
    State(data): State<Arc<AppState>>,
    body: Result<Json<CredentialsSchema>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let (username, password) = json_body(body)?.into_parts()?;

    data.credentials.register(&username, &password).await?;

    Ok((
        StatusCode::OK,
        Json(json!({"status": "success", "message": "User registered successfully"})),
    ))
}

pub async fn login(
    State(data): State<Arc<AppState>>,
    jar: CookieJar,
    body: Result<Json<CredentialsSchema>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let (username, password) = json_body(body)?.into_parts()?;

    let session_id = data.sessions.login(&username, &password).await?;
    tracing::info!(%username, "logged in");

    // A session the client already holds is replaced, not kept alongside.
    // It may already be gone; anything else is a real failure.
    if let Some(previous) = jar.get(SESSION_COOKIE) {
        match data.sessions.logout(previous.value()).await {
            Ok(()) | Err(AppError::Unauthenticated) => {}
            Err(e) => return Err(e),
        }
    }

    let cookie = Cookie::build(SESSION_COOKIE, session_id)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(data.cookie_secure)
        .finish();

    Ok((
        jar.add(cookie),
        Json(json!({"status": "success", "message": "Logged in successfully"})),
    ))
}

pub async fn logout(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    data.sessions.logout(&user.session_id).await?;
    tracing::info!(user_id = user.user_id, "logged out");

    let removal = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    Ok((
        jar.remove(removal),
        Json(json!({"status": "success", "message": "Logged out successfully"})),
    ))
}

// Handler for getting all Todo items of the caller
pub async fn get_todos(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    let todos = data.store.fetch_todos(user.user_id).await?;
    Ok(Json(todos))
}

// Handler for getting a specific Todo by ID
pub async fn get_todo(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = todo_id(id)?;

    // Records of other users look exactly like missing ones.
    let todo = data
        .store
        .fetch_todo(user.user_id, id)
        .await?
        .ok_or_else(|| not_found(id))?;

    Ok(Json(todo))
}

// Handler for creating a new Todo under a caller-chosen ID
pub async fn create_todo(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<CreateTodoSchema>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = todo_id(id)?;
    let (task, summary) = json_body(body)?.into_parts()?;
    let todo = Todo { id, task, summary };

    match data.store.insert_todo(user.user_id, &todo).await {
        Ok(()) => {
            tracing::info!(user_id = user.user_id, todo_id = id, "todo created");
            Ok((StatusCode::CREATED, Json(todo)))
        }
        Err(StoreError::Duplicate) => Err(AppError::Conflict(format!(
            "Todo ID {} already exists",
            id
        ))),
        Err(e) => Err(e.into()),
    }
}

// Handler for updating a Todo by ID; omitted fields keep their value
pub async fn update_todo(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<UpdateTodoSchema>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = todo_id(id)?;
    let patch = TodoPatch::from(json_body(body)?);

    let todo = data
        .store
        .update_todo(user.user_id, id, &patch)
        .await?
        .ok_or_else(|| not_found(id))?;

    Ok(Json(todo))
}

// Handler for deleting a Todo by ID
pub async fn delete_todo(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = todo_id(id)?;

    if !data.store.delete_todo(user.user_id, id).await? {
        return Err(not_found(id));
    }
    tracing::info!(user_id = user.user_id, todo_id = id, "todo deleted");

    Ok(StatusCode::NO_CONTENT)
}

fn todo_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, AppError> {
    path.map(|Path(id)| id)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(body)| body)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Todo ID {} doesn't exist", id))
}
