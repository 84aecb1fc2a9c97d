//! Client-side state container for the todo list.
//!
//! # Design
//! `TodoStore` owns a [`TodoState`] plus the three collaborators it needs to
//! change it: a `TodoClient` to build and parse requests, a [`Transport`] to
//! execute them and a [`Notifier`] for user feedback. Every action follows the
//! same shape: raise `loading`, perform one round-trip, lower `loading`, then
//! either apply the result and report success or report the error. Actions
//! return `bool` and never surface errors to the caller.
//!
//! Actions take `&mut self`, so a single store is never driven by two
//! requests at once; the single `loading` flag relies on that. The state
//! itself sits in a `watch` channel: [`TodoStore::subscribe`] hands out
//! receivers that observe every change, `loading` included, while an action
//! is still awaiting its response.

use tokio::sync::watch;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::client::TodoClient;
use crate::config::StoreConfig;
use crate::error::{ApiError, TransportError};
use crate::http::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
use crate::notify::{Notification, Notifier};
use crate::types::{CreateTodo, Filter, Todo, UpdateTodo};

pub const DEFAULT_ERROR_MESSAGE: &str = "An unknown error occurred";

/// The state bag: list, loading flag and filter, plus derived views.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoState {
    pub todos: Vec<Todo>,
    pub loading: bool,
    pub filter: Filter,
}

impl TodoState {
    pub fn filtered_todos(&self) -> Vec<&Todo> {
        self.todos.iter().filter(|t| self.filter.matches(t)).collect()
    }

    pub fn active_count(&self) -> usize {
        self.todos.iter().filter(|t| !t.is_completed).count()
    }

    pub fn completed_count(&self) -> usize {
        self.todos.iter().filter(|t| t.is_completed).count()
    }

    /// Swap in `todo` for the entry with id `id`. Returns false when no such
    /// entry is loaded.
    fn replace(&mut self, id: Uuid, todo: Todo) -> bool {
        match self.todos.iter_mut().find(|t| t.id == id) {
            Some(slot) => {
                *slot = todo;
                true
            }
            None => false,
        }
    }
}

pub struct TodoStore<T, N> {
    client: TodoClient,
    transport: T,
    notifier: N,
    state: watch::Sender<TodoState>,
}

impl<N: Notifier> TodoStore<ReqwestTransport, N> {
    pub fn from_config(config: &StoreConfig, notifier: N) -> Result<Self, TransportError> {
        let mut client = TodoClient::new(&config.base_url);
        if let Some(token) = &config.token {
            client = client.with_token(token.clone());
        }
        let transport = ReqwestTransport::new(config.timeout())?;
        Ok(Self::new(client, transport, notifier))
    }
}

impl<T: Transport, N: Notifier> TodoStore<T, N> {
    pub fn new(client: TodoClient, transport: T, notifier: N) -> Self {
        Self {
            client,
            transport,
            notifier,
            state: watch::channel(TodoState::default()).0,
        }
    }

    /// Borrow the current state. Do not hold the guard across an `.await`.
    pub fn state(&self) -> watch::Ref<'_, TodoState> {
        self.state.borrow()
    }

    /// A receiver that sees every state change made by this store.
    pub fn subscribe(&self) -> watch::Receiver<TodoState> {
        self.state.subscribe()
    }

    pub fn todos(&self) -> Vec<Todo> {
        self.state.borrow().todos.clone()
    }

    pub fn filter(&self) -> Filter {
        self.state.borrow().filter
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn filtered_todos(&self) -> Vec<Todo> {
        self.state.borrow().filtered_todos().into_iter().cloned().collect()
    }

    pub fn active_count(&self) -> usize {
        self.state.borrow().active_count()
    }

    pub fn completed_count(&self) -> usize {
        self.state.borrow().completed_count()
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.state.send_modify(|state| state.filter = filter);
    }

    /// Raise a negative notification; `None` shows the generic message.
    pub fn show_error_notification(&self, message: Option<&str>) {
        let message = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(DEFAULT_ERROR_MESSAGE);
        self.notifier.notify(Notification::error(message));
    }

    /// Load the list for the current filter, replacing local state.
    pub async fn fetch_todos(&mut self) -> bool {
        let filter = self.filter();
        debug!(%filter, "fetching todos");
        let request = Ok(self.client.build_list_todos(filter));
        match self.round_trip(request, TodoClient::parse_list_todos).await {
            Ok(todos) => {
                self.state.send_modify(|state| state.todos = todos);
                true
            }
            Err(err) => self.report_failure(&err, "Failed to fetch todos"),
        }
    }

    /// Create a todo and put it at the front of the list.
    pub async fn create_todo(&mut self, input: &CreateTodo) -> bool {
        debug!(title = %input.title, "creating todo");
        let request = self.client.build_create_todo(input);
        match self.round_trip(request, TodoClient::parse_create_todo).await {
            Ok(todo) => {
                self.state.send_modify(|state| state.todos.insert(0, todo));
                self.notifier
                    .notify(Notification::success("Todo created successfully"));
                true
            }
            Err(err) => self.report_failure(&err, "Failed to create todo"),
        }
    }

    pub async fn update_todo(&mut self, id: Uuid, input: &UpdateTodo) -> bool {
        debug!(%id, "updating todo");
        let request = self.client.build_update_todo(id, input);
        match self.round_trip(request, TodoClient::parse_update_todo).await {
            Ok(todo) => {
                if !self.state.send_if_modified(|state| state.replace(id, todo)) {
                    debug!(%id, "updated todo is not in the local list");
                }
                self.notifier
                    .notify(Notification::success("Todo updated successfully"));
                true
            }
            Err(err) => self.report_failure(&err, "Failed to update todo"),
        }
    }

    pub async fn delete_todo(&mut self, id: Uuid) -> bool {
        debug!(%id, "deleting todo");
        let request = Ok(self.client.build_delete_todo(id));
        match self.round_trip(request, TodoClient::parse_delete_todo).await {
            Ok(_) => {
                self.state.send_modify(|state| state.todos.retain(|t| t.id != id));
                self.notifier
                    .notify(Notification::success("Todo deleted successfully"));
                true
            }
            Err(err) => self.report_failure(&err, "Failed to delete todo"),
        }
    }

    /// Flip completion on the server. No success notification is raised.
    pub async fn toggle_todo_completion(&mut self, id: Uuid) -> bool {
        debug!(%id, "toggling todo");
        let request = Ok(self.client.build_toggle_todo(id));
        match self.round_trip(request, TodoClient::parse_toggle_todo).await {
            Ok(todo) => {
                self.state.send_if_modified(|state| state.replace(id, todo));
                true
            }
            Err(err @ ApiError::Rejected { .. }) => {
                warn!(%id, error = %err, "toggle rejected");
                let message = err.user_message("Failed to toggle todo");
                self.show_error_notification(Some(message.as_str()));
                false
            }
            Err(err) => {
                warn!(%id, error = %err, "toggle failed");
                self.show_error_notification(Some("Failed to toggle todo completion"));
                false
            }
        }
    }

    /// Execute one request with `loading` raised for its whole duration.
    ///
    /// `loading` is lowered before returning on every path, including a
    /// request that could not be built.
    async fn round_trip<R, P>(
        &mut self,
        request: Result<HttpRequest, ApiError>,
        parse: P,
    ) -> Result<R, ApiError>
    where
        P: FnOnce(&TodoClient, HttpResponse) -> Result<R, ApiError>,
    {
        self.state.send_modify(|state| state.loading = true);
        let result = match request {
            Ok(request) => match self.transport.execute(request).await {
                Ok(response) => parse(&self.client, response),
                Err(err) => Err(ApiError::from(err)),
            },
            Err(err) => Err(err),
        };
        self.state.send_modify(|state| state.loading = false);
        result
    }

    /// Notify the user about a failed action and return `false`.
    fn report_failure(&self, err: &ApiError, fallback: &str) -> bool {
        warn!(error = %err, "{fallback}");
        match err {
            ApiError::Rejected { message } => self.show_error_notification(message.as_deref()),
            other => self.show_error_notification(Some(other.user_message(fallback).as_str())),
        }
        false
    }
}
