//! Stateless HTTP request builder and response parser for the todo API.
//!
//! # Design
//! `TodoClient` holds only a `base_url` and an optional bearer token, and
//! carries no mutable state between calls. Each operation is split into a
//! `build_*` method that produces an `HttpRequest` and a `parse_*` method that
//! consumes an `HttpResponse`. Every `parse_*` goes through
//! [`TodoClient::parse_envelope`], so status checks and the `success`
//! discriminator are handled in one place.

use uuid::Uuid;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{ApiEnvelope, CreateTodo, Filter, Todo, UpdateTodo};

/// Synchronous, stateless client for the todo API.
#[derive(Debug, Clone)]
pub struct TodoClient {
    base_url: String,
    token: Option<String>,
}

impl TodoClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Attach `authorization: Bearer <token>` to every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_list_todos(&self, filter: Filter) -> HttpRequest {
        self.request(
            HttpMethod::Get,
            format!("{}/todo?status={filter}", self.base_url),
            None,
        )
    }

    pub fn build_get_todo(&self, id: Uuid) -> HttpRequest {
        self.request(HttpMethod::Get, format!("{}/todo/{id}", self.base_url), None)
    }

    pub fn build_create_todo(&self, input: &CreateTodo) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(input).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(self.request(HttpMethod::Post, format!("{}/todo", self.base_url), Some(body)))
    }

    pub fn build_update_todo(&self, id: Uuid, input: &UpdateTodo) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(input).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(self.request(HttpMethod::Put, format!("{}/todo/{id}", self.base_url), Some(body)))
    }

    pub fn build_delete_todo(&self, id: Uuid) -> HttpRequest {
        self.request(HttpMethod::Delete, format!("{}/todo/{id}", self.base_url), None)
    }

    pub fn build_toggle_todo(&self, id: Uuid) -> HttpRequest {
        self.request(
            HttpMethod::Put,
            format!("{}/todo/{id}/toggle", self.base_url),
            None,
        )
    }

    /// Absent `todos` is treated as an empty list.
    pub fn parse_list_todos(&self, response: HttpResponse) -> Result<Vec<Todo>, ApiError> {
        Ok(self.parse_envelope(response)?.todos.unwrap_or_default())
    }

    pub fn parse_get_todo(&self, response: HttpResponse) -> Result<Todo, ApiError> {
        required_todo(self.parse_envelope(response)?)
    }

    pub fn parse_create_todo(&self, response: HttpResponse) -> Result<Todo, ApiError> {
        required_todo(self.parse_envelope(response)?)
    }

    pub fn parse_update_todo(&self, response: HttpResponse) -> Result<Todo, ApiError> {
        required_todo(self.parse_envelope(response)?)
    }

    /// Returns the server's confirmation message, if it sent one.
    pub fn parse_delete_todo(&self, response: HttpResponse) -> Result<Option<String>, ApiError> {
        Ok(self.parse_envelope(response)?.message)
    }

    pub fn parse_toggle_todo(&self, response: HttpResponse) -> Result<Todo, ApiError> {
        required_todo(self.parse_envelope(response)?)
    }

    /// Check the status, decode the body and reject `success: false`.
    pub fn parse_envelope(&self, response: HttpResponse) -> Result<ApiEnvelope, ApiError> {
        if !response.is_success() {
            let message = serde_json::from_str::<ApiEnvelope>(&response.body)
                .ok()
                .and_then(|envelope| envelope.message);
            return Err(ApiError::Http {
                status: response.status,
                message,
            });
        }

        let envelope: ApiEnvelope = serde_json::from_str(&response.body)
            .map_err(|e| ApiError::Deserialization(e.to_string()))?;
        if !envelope.success {
            return Err(ApiError::Rejected {
                message: envelope.message,
            });
        }
        Ok(envelope)
    }

    fn request(&self, method: HttpMethod, path: String, body: Option<String>) -> HttpRequest {
        let mut headers = Vec::new();
        if body.is_some() {
            headers.push(("content-type".to_string(), "application/json".to_string()));
        }
        if let Some(token) = &self.token {
            headers.push(("authorization".to_string(), format!("Bearer {token}")));
        }
        HttpRequest {
            method,
            path,
            headers,
            body,
        }
    }
}

fn required_todo(envelope: ApiEnvelope) -> Result<Todo, ApiError> {
    envelope.todo.ok_or(ApiError::MissingPayload("todo"))
}
