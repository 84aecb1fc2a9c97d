use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use uuid::Uuid;

pub const INVALID_DUE_DATE: &str =
    "Invalid due date format. Use ISO format (YYYY-MM-DDTHH:MM:SS).";
pub const TITLE_REQUIRED: &str = "'title' is required and cannot be empty.";
pub const NOT_FOUND: &str = "Todo not found.";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Todo {
    pub entity_id: Uuid,
    pub title: String,
    pub description: String,
    pub is_completed: bool,
    pub due_date: Option<NaiveDateTime>,
    pub changed_on: Option<NaiveDateTime>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub todo: Option<Todo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub todos: Option<Vec<Todo>>,
}

impl Envelope {
    fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    fn failure(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: false,
            message: Some(message.into()),
            ..Self::default()
        })
    }

    fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    fn with_todo(mut self, todo: Todo) -> Self {
        self.todo = Some(todo);
        self
    }
}

#[derive(Deserialize)]
pub struct CreateTodo {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateTodo {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_completed: Option<bool>,
    pub due_date: Option<String>,
}

#[derive(Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
}

/// Todos in insertion order.
pub type Db = Arc<RwLock<Vec<Todo>>>;

#[derive(Clone)]
struct AppState {
    db: Db,
    token: Option<Arc<str>>,
}

pub fn app() -> Router {
    app_with_token(None)
}

/// Build the router. With `Some(token)`, every request must carry
/// `authorization: Bearer <token>`.
pub fn app_with_token(token: Option<String>) -> Router {
    let state = AppState {
        db: Arc::new(RwLock::new(Vec::new())),
        token: token.map(Arc::from),
    };
    Router::new()
        .route("/todo", get(list_todos).post(create_todo))
        .route(
            "/todo/{id}",
            get(get_todo).put(update_todo).delete(delete_todo),
        )
        .route("/todo/{id}/toggle", put(toggle_todo))
        .layer(middleware::from_fn_with_state(state.clone(), require_token))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(listener: TcpListener, token: Option<String>) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, auth = token.is_some(), "mock todo API listening");
    }
    axum::serve(listener, app_with_token(token)).await
}

async fn require_token(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(expected) = state.token.as_deref() else {
        return next.run(request).await;
    };
    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    match provided {
        Some(token) if token == expected => next.run(request).await,
        Some(_) => (StatusCode::UNAUTHORIZED, Envelope::failure("Token is invalid.")).into_response(),
        None => (StatusCode::UNAUTHORIZED, Envelope::failure("Token is missing.")).into_response(),
    }
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Empty strings count as "not provided".
fn parse_due_date(raw: Option<&str>) -> Result<Option<NaiveDateTime>, Json<Envelope>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse::<NaiveDateTime>()
            .map(Some)
            .map_err(|_| Envelope::failure(INVALID_DUE_DATE)),
    }
}

fn find(todos: &[Todo], id: &str) -> Option<usize> {
    let id = Uuid::parse_str(id).ok()?;
    todos.iter().position(|t| t.entity_id == id)
}

async fn list_todos(State(state): State<AppState>, Query(params): Query<ListParams>) -> Json<Envelope> {
    let todos = state.db.read().await;
    let status = params.status.unwrap_or_else(|| "all".to_string());
    let todos = todos
        .iter()
        .filter(|t| match status.as_str() {
            "active" => !t.is_completed,
            "completed" => t.is_completed,
            _ => true,
        })
        .cloned()
        .collect();
    Json(Envelope {
        todos: Some(todos),
        ..Envelope::ok()
    })
}

async fn create_todo(State(state): State<AppState>, Json(input): Json<CreateTodo>) -> Json<Envelope> {
    let title = match input.title.as_deref().map(str::trim) {
        Some(title) if !title.is_empty() => title.to_string(),
        _ => return Envelope::failure(TITLE_REQUIRED),
    };
    let due_date = match parse_due_date(input.due_date.as_deref()) {
        Ok(due_date) => due_date,
        Err(failure) => return failure,
    };

    let todo = Todo {
        entity_id: Uuid::new_v4(),
        title,
        description: input.description.unwrap_or_default(),
        is_completed: false,
        due_date,
        changed_on: Some(now()),
    };
    debug!(id = %todo.entity_id, "created todo");
    state.db.write().await.push(todo.clone());
    Json(
        Envelope::ok()
            .with_todo(todo)
            .with_message("Todo created successfully."),
    )
}

async fn get_todo(State(state): State<AppState>, Path(id): Path<String>) -> Json<Envelope> {
    let todos = state.db.read().await;
    match find(&todos, &id) {
        Some(index) => Json(Envelope::ok().with_todo(todos[index].clone())),
        None => Envelope::failure(NOT_FOUND),
    }
}

async fn update_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateTodo>,
) -> Json<Envelope> {
    let mut todos = state.db.write().await;
    let Some(index) = find(&todos, &id) else {
        return Envelope::failure(NOT_FOUND);
    };
    let due_date = match parse_due_date(input.due_date.as_deref()) {
        Ok(due_date) => due_date,
        Err(failure) => return failure,
    };

    let todo = &mut todos[index];
    if let Some(title) = input.title {
        if title.trim().is_empty() {
            return Envelope::failure("title is required");
        }
        todo.title = title;
    }
    if let Some(description) = input.description {
        todo.description = description;
    }
    if let Some(is_completed) = input.is_completed {
        todo.is_completed = is_completed;
    }
    if due_date.is_some() {
        todo.due_date = due_date;
    }
    todo.changed_on = Some(now());
    Json(
        Envelope::ok()
            .with_todo(todo.clone())
            .with_message("Todo updated successfully."),
    )
}

async fn delete_todo(State(state): State<AppState>, Path(id): Path<String>) -> Json<Envelope> {
    let mut todos = state.db.write().await;
    match find(&todos, &id) {
        Some(index) => {
            todos.remove(index);
            Json(Envelope::ok().with_message("Todo deleted successfully."))
        }
        None => Envelope::failure(NOT_FOUND),
    }
}

async fn toggle_todo(State(state): State<AppState>, Path(id): Path<String>) -> Json<Envelope> {
    let mut todos = state.db.write().await;
    let Some(index) = find(&todos, &id) else {
        return Envelope::failure(NOT_FOUND);
    };
    let todo = &mut todos[index];
    todo.is_completed = !todo.is_completed;
    todo.changed_on = Some(now());
    let label = if todo.is_completed { "completed" } else { "active" };
    Json(
        Envelope::ok()
            .with_todo(todo.clone())
            .with_message(format!("Todo marked as {label}.")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn todo_serializes_to_json() {
        let todo = Todo {
            entity_id: Uuid::nil(),
            title: "Test".to_string(),
            description: String::new(),
            is_completed: false,
            due_date: None,
            changed_on: None,
        };
        let json = serde_json::to_value(&todo).unwrap();
        assert_eq!(json["entity_id"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(json["title"], "Test");
        assert_eq!(json["is_completed"], false);
        assert!(json["due_date"].is_null());
    }

    #[test]
    fn failure_envelope_omits_payload() {
        let Json(envelope) = Envelope::failure(NOT_FOUND);
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json, serde_json::json!({ "success": false, "message": NOT_FOUND }));
    }

    #[test]
    fn create_todo_fields_are_optional_at_parse_time() {
        let input: CreateTodo = serde_json::from_str(r#"{}"#).unwrap();
        assert!(input.title.is_none());
        assert!(input.due_date.is_none());
    }

    #[test]
    fn due_date_parsing() {
        assert_eq!(parse_due_date(None).unwrap(), None);
        assert_eq!(parse_due_date(Some("  ")).unwrap(), None);
        let parsed = parse_due_date(Some("2025-03-01T09:30:00")).unwrap().unwrap();
        assert_eq!(parsed.to_string(), "2025-03-01 09:30:00");
        assert!(parse_due_date(Some("next tuesday")).is_err());
    }

    #[test]
    fn find_ignores_malformed_ids() {
        let todos = vec![Todo {
            entity_id: Uuid::from_u128(1),
            title: "a".to_string(),
            description: String::new(),
            is_completed: false,
            due_date: None,
            changed_on: None,
        }];
        assert_eq!(find(&todos, "not-a-uuid"), None);
        assert_eq!(find(&todos, &Uuid::from_u128(1).to_string()), Some(0));
        assert_eq!(find(&todos, &Uuid::from_u128(1).simple().to_string()), Some(0));
    }
}
