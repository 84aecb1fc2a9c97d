//! End-to-end tests against the live mock server.
//!
//! # Design
//! The client is exercised synchronously with ureq, mirroring a host that does
//! its own I/O. The store is exercised through `ReqwestTransport` on the
//! tokio runtime. Both run against a mock server bound to a random port.

use std::net::SocketAddr;

use todo_store::{
    ApiError, CreateTodo, Filter, HttpMethod, HttpRequest, HttpResponse, RecordingNotifier,
    ReqwestTransport, Severity, StoreConfig, TodoClient, TodoStore, UpdateTodo,
};

/// Execute an `HttpRequest` using ureq and return an `HttpResponse`.
///
/// Status codes are returned as data so the client interprets them.
fn execute(req: HttpRequest) -> HttpResponse {
    let agent = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .new_agent();

    let mut response = match (req.method, req.body) {
        (HttpMethod::Get, _) => agent.get(&req.path).call(),
        (HttpMethod::Delete, _) => agent.delete(&req.path).call(),
        (HttpMethod::Post, Some(body)) => {
            agent.post(&req.path).content_type("application/json").send(body.as_bytes())
        }
        (HttpMethod::Post, None) => agent.post(&req.path).send_empty(),
        (HttpMethod::Put, Some(body)) => {
            agent.put(&req.path).content_type("application/json").send(body.as_bytes())
        }
        (HttpMethod::Put, None) => agent.put(&req.path).send_empty(),
    }
    .expect("HTTP transport error");

    HttpResponse {
        status: response.status().as_u16(),
        headers: Vec::new(),
        body: response.body_mut().read_to_string().unwrap_or_default(),
    }
}

/// Start the mock server on its own thread and runtime.
fn spawn_server_thread() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener, None).await
        })
        .unwrap();
    });

    addr
}

/// Start the mock server as a task on the current runtime.
async fn spawn_server(token: Option<&str>) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let token = token.map(str::to_string);
    tokio::spawn(async move { mock_server::run(listener, token).await });
    addr
}

fn store_for(addr: SocketAddr, token: Option<&str>) -> (TodoStore<ReqwestTransport, RecordingNotifier>, RecordingNotifier) {
    let config = StoreConfig {
        base_url: format!("http://{addr}"),
        token: token.map(str::to_string),
        timeout_ms: 5_000,
    };
    let notifier = RecordingNotifier::new();
    let store = TodoStore::from_config(&config, notifier.clone()).unwrap();
    (store, notifier)
}

#[test]
fn client_crud_lifecycle() {
    let addr = spawn_server_thread();
    let client = TodoClient::new(&format!("http://{addr}"));

    // Step 1: list — should be empty.
    let todos = client.parse_list_todos(execute(client.build_list_todos(Filter::All))).unwrap();
    assert!(todos.is_empty(), "expected empty list");

    // Step 2: create.
    let req = client.build_create_todo(&CreateTodo::new("Integration test")).unwrap();
    let created = client.parse_create_todo(execute(req)).unwrap();
    assert_eq!(created.title, "Integration test");
    assert!(!created.is_completed);
    let id = created.id;

    // Step 3: get.
    let fetched = client.parse_get_todo(execute(client.build_get_todo(id))).unwrap();
    assert_eq!(fetched, created);

    // Step 4: partial update.
    let input = UpdateTodo {
        title: Some("Updated title".to_string()),
        ..UpdateTodo::default()
    };
    let req = client.build_update_todo(id, &input).unwrap();
    let updated = client.parse_update_todo(execute(req)).unwrap();
    assert_eq!(updated.title, "Updated title");
    assert!(!updated.is_completed);

    // Step 5: toggle.
    let toggled = client.parse_toggle_todo(execute(client.build_toggle_todo(id))).unwrap();
    assert!(toggled.is_completed);
    assert_eq!(toggled.title, "Updated title");

    // Step 6: server-side filters.
    let done = client
        .parse_list_todos(execute(client.build_list_todos(Filter::Completed)))
        .unwrap();
    assert_eq!(done.len(), 1);
    let open = client
        .parse_list_todos(execute(client.build_list_todos(Filter::Active)))
        .unwrap();
    assert!(open.is_empty());

    // Step 7: delete.
    let message = client.parse_delete_todo(execute(client.build_delete_todo(id))).unwrap();
    assert_eq!(message.as_deref(), Some("Todo deleted successfully."));

    // Step 8: get and delete after delete — rejected by the server.
    let err = client.parse_get_todo(execute(client.build_get_todo(id))).unwrap_err();
    assert_eq!(err, ApiError::Rejected { message: Some("Todo not found.".to_string()) });
    let err = client.parse_delete_todo(execute(client.build_delete_todo(id))).unwrap_err();
    assert!(matches!(err, ApiError::Rejected { .. }));
}

#[tokio::test]
async fn store_lifecycle() {
    let addr = spawn_server(None).await;
    let (mut store, notifier) = store_for(addr, None);

    assert!(store.fetch_todos().await);
    assert!(store.todos().is_empty());

    assert!(store.create_todo(&CreateTodo::new("First")).await);
    assert!(store.create_todo(&CreateTodo::new("Second")).await);
    let titles: Vec<String> = store.todos().into_iter().map(|t| t.title).collect();
    assert_eq!(titles, vec!["Second", "First"]);

    let first = store.todos()[1].id;
    assert!(store.toggle_todo_completion(first).await);
    assert_eq!(store.active_count(), 1);
    assert_eq!(store.completed_count(), 1);

    store.set_filter(Filter::Completed);
    assert_eq!(store.filtered_todos().len(), 1);
    assert!(store.fetch_todos().await);
    assert_eq!(store.todos().len(), 1);
    assert_eq!(store.todos()[0].id, first);

    let input = UpdateTodo {
        description: Some("details".to_string()),
        ..UpdateTodo::default()
    };
    assert!(store.update_todo(first, &input).await);
    assert_eq!(store.todos()[0].description, "details");

    assert!(store.delete_todo(first).await);
    assert!(store.todos().is_empty());
    assert!(!store.is_loading());

    let messages: Vec<String> = notifier.drain().into_iter().map(|n| n.message).collect();
    assert_eq!(
        messages,
        vec![
            "Todo created successfully",
            "Todo created successfully",
            "Todo updated successfully",
            "Todo deleted successfully",
        ]
    );

    // Server-side validation surfaces as an error notification.
    assert!(!store.create_todo(&CreateTodo::new("  ")).await);
    let last = notifier.last().unwrap();
    assert_eq!(last.severity, Severity::Negative);
    assert_eq!(last.message, mock_server::TITLE_REQUIRED);
}

#[tokio::test]
async fn store_sends_bearer_token() {
    let addr = spawn_server(Some("s3cret")).await;

    let (mut anonymous, notifier) = store_for(addr, None);
    assert!(!anonymous.fetch_todos().await);
    assert!(!anonymous.is_loading());
    assert_eq!(notifier.last().unwrap().message, "Token is missing.");

    let (mut authorised, notifier) = store_for(addr, Some("s3cret"));
    assert!(authorised.create_todo(&CreateTodo::new("Secret task")).await);
    assert!(authorised.fetch_todos().await);
    assert_eq!(authorised.todos().len(), 1);
    assert_eq!(notifier.notifications().len(), 1);
}

#[tokio::test]
async fn store_accepts_host_supplied_reqwest_client() {
    let addr = spawn_server(None).await;
    let client = TodoClient::new(&format!("http://{addr}/"));
    assert_eq!(client.base_url(), format!("http://{addr}"));

    let transport = ReqwestTransport::with_client(reqwest::Client::new());
    let notifier = RecordingNotifier::new();
    let mut store = TodoStore::new(client, transport, notifier.clone());

    assert!(store.create_todo(&CreateTodo::new("Shared client")).await);
    assert!(store.fetch_todos().await);
    assert_eq!(store.state().todos.len(), 1);
    assert_eq!(store.state().todos[0].title, "Shared client");
    assert_eq!(notifier.notifications().len(), 1);
}

#[tokio::test]
async fn store_survives_unreachable_server() {
    // Bind then drop to obtain a port with nothing listening.
    let addr = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let (mut store, notifier) = store_for(addr, None);

    assert!(!store.fetch_todos().await);
    assert!(!store.is_loading());
    assert!(!store.toggle_todo_completion(uuid::Uuid::nil()).await);
    assert!(!store.is_loading());

    let notifications = notifier.notifications();
    assert_eq!(notifications.len(), 2);
    assert!(notifications.iter().all(|n| n.severity == Severity::Negative));
    assert_eq!(notifications[1].message, "Failed to toggle todo completion");
}
