use crate::{error::AppError, model::TodoPatch};

// Request body for /register and /login
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct CredentialsSchema {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl CredentialsSchema {
    pub fn into_parts(self) -> Result<(String, String), AppError> {
        Ok((
            required(self.username, "Username is required")?,
            required(self.password, "Password is required")?,
        ))
    }
}

// Struct representing the request body for creating a new Todo
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct CreateTodoSchema {
    pub task: Option<String>,
    pub summary: Option<String>,
}

impl CreateTodoSchema {
    pub fn into_parts(self) -> Result<(String, String), AppError> {
        Ok((
            required(self.task, "Task is required")?,
            required(self.summary, "Summary is required")?,
        ))
    }
}

// Struct representing the request body for updating a Todo
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct UpdateTodoSchema {
    pub task: Option<String>,
    pub summary: Option<String>,
}

impl From<UpdateTodoSchema> for TodoPatch {
    // Empty strings count as "not provided"
    fn from(body: UpdateTodoSchema) -> Self {
        TodoPatch {
            task: body.task.filter(|task| !task.is_empty()),
            summary: body.summary.filter(|summary| !summary.is_empty()),
        }
    }
}

fn required(value: Option<String>, message: &str) -> Result<String, AppError> {
    match value {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(AppError::Validation(message.to_string())),
    }
}
