//! End-to-end tests for the cohort client.
//!
//! Each test drives a real `CohortClient` against an in-process TCP responder
//! that replies with canned HTTP bytes, with a mock identity provider
//! substituted for the HTTP one.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use cohort_query::identity::MockIdentityProvider;
use cohort_query::{ClientConfig, CohortClient, PayloadEnvelope};

/// Formats a canned HTTP/1.1 response.
fn http_response(status_line: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

/// Reads a full HTTP request (headers plus content-length body) from a socket.
async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut data = Vec::new();
    let mut buf = vec![0u8; 4096];

    loop {
        let Ok(n) = socket.read(&mut buf).await else {
            break;
        };
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);

        let text = String::from_utf8_lossy(&data).to_string();
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())?
                })
                .unwrap_or(0);
            if data.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }

    String::from_utf8_lossy(&data).to_string()
}

/// Spawns a responder that answers every connection with the same bytes and
/// reports each raw request through the returned channel.
async fn spawn_responder(response: String) -> (String, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let response = response.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let request = read_request(&mut socket).await;
                let _ = tx.send(request);
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (format!("http://{addr}"), rx)
}

/// Spawns a responder that accepts connections but never replies.
async fn spawn_stalled_responder() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let mut buf = vec![0u8; 16 * 1024];
                let _ = socket.read(&mut buf).await;
                // Hold the connection open without ever responding
                tokio::time::sleep(Duration::from_secs(3600)).await;
            });
        }
    });

    format!("http://{addr}")
}

fn test_client(base_url: &str) -> CohortClient {
    let config = ClientConfig::new(base_url, "test-token")
        .unwrap()
        .with_connect_timeout(Duration::from_secs(1))
        .with_query_timeout(Duration::from_secs(2))
        .with_list_timeout(Duration::from_secs(2));
    CohortClient::with_identity_provider(
        config,
        Arc::new(MockIdentityProvider::with_arn(
            "arn:aws:sts::123:assumed-role/test-role/session1",
        )),
    )
    .unwrap()
}

#[tokio::test]
async fn success_body_is_returned_unmodified() {
    let (base, _rx) = spawn_responder(http_response("200 OK", r#"{"rows": [1, 2, 3]}"#)).await;
    let client = test_client(&base);

    let result = client.execute("SELECT * FROM users").await;
    assert_eq!(result, json!({"rows": [1, 2, 3]}));
}

#[tokio::test]
async fn execute_sends_flat_payload_with_headers() {
    let (base, mut rx) = spawn_responder(http_response("200 OK", "{}")).await;
    let client = test_client(&base);

    client.execute("SELECT * FROM users JOIN orders ON users.id = orders.user_id").await;

    let request = rx.recv().await.unwrap();
    assert!(request.starts_with("POST /v1/execute"));
    assert!(request.contains("cookie: session=test-token"));
    assert!(request.contains("accept: application/json"));

    let body: Value = serde_json::from_str(request.split("\r\n\r\n").nth(1).unwrap()).unwrap();
    assert_eq!(body["role"], "test-role");
    assert_eq!(body["tables"], json!(["users", "orders"]));
    assert_eq!(
        body["query"],
        "SELECT * FROM users JOIN orders ON users.id = orders.user_id"
    );
}

#[tokio::test]
async fn execute_supports_data_wrapped_envelope() {
    let (base, mut rx) = spawn_responder(http_response("200 OK", "{}")).await;
    let config = ClientConfig::new(&base, "test-token")
        .unwrap()
        .with_envelope(PayloadEnvelope::DataWrapped);
    let client = CohortClient::with_identity_provider(
        config,
        Arc::new(MockIdentityProvider::with_arn("arn:aws:iam::123:role/admin")),
    )
    .unwrap();

    client.execute("SELECT * FROM users").await;

    let request = rx.recv().await.unwrap();
    let body: Value = serde_json::from_str(request.split("\r\n\r\n").nth(1).unwrap()).unwrap();
    assert_eq!(body["data"]["role"], "admin");
    assert_eq!(body["data"]["tables"], json!(["users"]));
}

#[tokio::test]
async fn unauthorized_status_wins_regardless_of_body() {
    let (base, _rx) =
        spawn_responder(http_response("401 Unauthorized", r#"{"whatever": true}"#)).await;
    let client = test_client(&base);

    let result = client.execute("SELECT * FROM users").await;
    assert_eq!(result, json!({"error": "User authentication failed."}));
}

#[tokio::test]
async fn application_error_envelope_surfaces_detail() {
    let body = r#"{"status":{"ok":false,"error":{"details":{"err":"quota exceeded"}}}}"#;
    let (base, _rx) = spawn_responder(http_response("400 Bad Request", body)).await;
    let client = test_client(&base);

    let result = client.execute("SELECT * FROM users").await;
    assert_eq!(result, json!({"error": "quota exceeded"}));
}

#[tokio::test]
async fn non_success_without_envelope_is_generic_failure() {
    let (base, _rx) =
        spawn_responder(http_response("500 Internal Server Error", r#"{"oops": 1}"#)).await;
    let client = test_client(&base);

    let result = client.execute("SELECT * FROM users").await;
    assert_eq!(result, json!({"error": "Query execution failed."}));
}

#[tokio::test]
async fn invalid_json_body_is_classified() {
    let (base, _rx) = spawn_responder(http_response("200 OK", "<html>oops</html>")).await;
    let client = test_client(&base);

    let result = client.execute("SELECT * FROM users").await;
    assert_eq!(
        result,
        json!({"error": "Invalid response from query execution."})
    );
}

#[tokio::test]
async fn connection_refused_is_unavailable() {
    // Bind and drop a listener so the port is closed
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = test_client(&format!("http://{addr}"));
    let result = client.execute("SELECT * FROM users").await;
    assert_eq!(result, json!({"error": "Service temporarily unavailable."}));
}

#[tokio::test]
async fn stalled_response_is_a_timeout() {
    let base = spawn_stalled_responder().await;
    let client = test_client(&base);

    let result = client.execute("SELECT * FROM users").await;
    assert_eq!(
        result,
        json!({"error": "The request took too long to process."})
    );
}

#[tokio::test]
async fn malformed_sql_never_reaches_the_wire() {
    let (base, mut rx) = spawn_responder(http_response("200 OK", "{}")).await;
    let client = test_client(&base);

    let result = client.execute("SELEKT * FORM x").await;
    assert_eq!(
        result,
        json!({"error": "The provided query is invalid or lacks permissions."})
    );
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn query_without_tables_never_reaches_the_wire() {
    let (base, mut rx) = spawn_responder(http_response("200 OK", "{}")).await;
    let client = test_client(&base);

    let result = client.execute("SELECT 1").await;
    assert_eq!(
        result,
        json!({"error": "The provided query is invalid or lacks permissions."})
    );
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn identity_failure_is_caller_safe() {
    let (base, _rx) = spawn_responder(http_response("200 OK", "{}")).await;
    let config = ClientConfig::new(&base, "test-token").unwrap();
    let client = CohortClient::with_identity_provider(
        config,
        Arc::new(MockIdentityProvider::unavailable("credentials expired")),
    )
    .unwrap();

    let result = client.execute("SELECT * FROM users").await;
    assert_eq!(
        result,
        json!({"error": "The provided query is invalid or lacks permissions."})
    );
}

#[tokio::test]
async fn list_cohorts_sends_role_parameter() {
    let (base, mut rx) =
        spawn_responder(http_response("200 OK", r#"[{"name": "active-users"}]"#)).await;
    let client = test_client(&base);

    let result = client.list_cohorts().await;
    assert_eq!(result, json!([{"name": "active-users"}]));

    let request = rx.recv().await.unwrap();
    assert!(request.starts_with("GET /v1/cohorts?role=test-role"));
    assert!(request.contains("cookie: session=test-token"));
}

#[tokio::test]
async fn repeated_execute_is_idempotent() {
    let (base, _rx) = spawn_responder(http_response("200 OK", r#"{"rows": [1]}"#)).await;
    let client = test_client(&base);

    let first = client.execute("SELECT * FROM users").await;
    let second = client.execute("SELECT * FROM users").await;
    assert_eq!(first, second);
}
