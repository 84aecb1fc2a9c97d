//! Client-side state container for a todo list backed by a REST API.
//!
//! # Overview
//! [`TodoStore`] holds the loaded todos, a loading flag and a display filter.
//! Its actions (fetch, create, update, delete, toggle) each perform one
//! round-trip, apply the result to local state and raise a user-facing
//! [`Notification`].
//!
//! # Design
//! - `TodoClient` is stateless: it builds `HttpRequest` values and parses
//!   `HttpResponse` values without touching the network.
//! - A [`Transport`] executes the requests. [`ReqwestTransport`] is the
//!   production implementation; tests plug in scripted ones.
//! - A [`Notifier`] receives notifications, keeping the store free of any UI
//!   toolkit.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod notify;
pub mod store;
pub mod types;

pub use client::TodoClient;
pub use config::{ConfigError, StoreConfig};
pub use error::{ApiError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport};
pub use notify::{Notification, Notifier, RecordingNotifier, Severity, TracingNotifier};
pub use store::{TodoState, TodoStore, DEFAULT_ERROR_MESSAGE};
pub use types::{ApiEnvelope, CreateTodo, Filter, ParseFilterError, Todo, UpdateTodo};
