//! `ApiClient::fetch` against a scripted transport and recording collaborators.
//!
//! # Design
//! The transport answers every request with one canned response (or error)
//! and records what it was asked to send. The session counts logouts and the
//! cache records which operation received which payload, so each test can
//! assert on the exact collaborator traffic of a single call.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use api_client::{
    ApiClient, ApiError, CacheError, ClientConfig, HttpMethod, HttpRequest, HttpResponse,
    ObjectCache, RequestOptions, SessionStore, Transport, TransportError,
};
use async_trait::async_trait;
use serde_json::{json, Value};

struct ScriptedTransport {
    reply: Mutex<Option<Result<HttpResponse, ApiError>>>,
    seen: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    fn replying(reply: Result<HttpResponse, ApiError>) -> Self {
        Self {
            reply: Mutex::new(Some(reply)),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn last_request(&self) -> HttpRequest {
        self.seen.lock().unwrap().last().cloned().expect("no request sent")
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        self.seen.lock().unwrap().push(request);
        self.reply.lock().unwrap().take().expect("transport called twice")
    }
}

#[derive(Default)]
struct CountingSession {
    token: Option<String>,
    logouts: AtomicUsize,
}

impl SessionStore for CountingSession {
    fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn token(&self) -> Option<String> {
        self.token.clone()
    }

    fn logout(&self) {
        self.logouts.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct RecordingCache {
    many: Mutex<Vec<Vec<Value>>>,
    one: Mutex<Vec<(Value, Value)>>,
}

impl ObjectCache for RecordingCache {
    fn cache_many(&self, items: &[Value]) -> Result<(), CacheError> {
        self.many.lock().unwrap().push(items.to_vec());
        Ok(())
    }

    fn cache_one(&self, id: &Value, item: &Value) -> Result<(), CacheError> {
        self.one.lock().unwrap().push((id.clone(), item.clone()));
        Ok(())
    }
}

struct Harness {
    client: ApiClient,
    transport: Arc<ScriptedTransport>,
    session: Arc<CountingSession>,
    cache: Arc<RecordingCache>,
}

fn harness(reply: Result<HttpResponse, ApiError>, token: Option<&str>) -> Harness {
    let transport = Arc::new(ScriptedTransport::replying(reply));
    let session = Arc::new(CountingSession {
        token: token.map(str::to_string),
        ..Default::default()
    });
    let cache = Arc::new(RecordingCache::default());
    let config = ClientConfig {
        base_url: "https://api.example.com".to_string(),
        user_agent: "frontend/1.0".to_string(),
    };
    let client = ApiClient::new(config, transport.clone(), session.clone(), cache.clone());
    Harness {
        client,
        transport,
        session,
        cache,
    }
}

fn ok(body: &str) -> Result<HttpResponse, ApiError> {
    reply(200, "OK", body)
}

fn reply(status: u16, status_text: &str, body: &str) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse {
        status,
        status_text: status_text.to_string(),
        headers: vec![("Content-Type".to_string(), "application/json".to_string())],
        body: body.to_string(),
    })
}

#[tokio::test]
async fn cached_entity_goes_to_cache_one() {
    let h = harness(ok(r#"{"data":{"id":5,"name":"x"}}"#), None);

    let envelope = h
        .client
        .get("/items/5", &json!({"expand": "owner"}), RequestOptions::cached())
        .await
        .unwrap();

    assert_eq!(envelope, json!({"data": {"id": 5, "name": "x"}}));
    assert_eq!(
        *h.cache.one.lock().unwrap(),
        vec![(json!(5), json!({"id": 5, "name": "x"}))]
    );
    assert!(h.cache.many.lock().unwrap().is_empty());
}

#[tokio::test]
async fn cached_collection_goes_to_cache_many() {
    let h = harness(ok(r#"{"data":[{"id":1},{"id":2}]}"#), None);

    h.client
        .get("/items", &Value::Null, RequestOptions::cached())
        .await
        .unwrap();

    assert_eq!(
        *h.cache.many.lock().unwrap(),
        vec![vec![json!({"id": 1}), json!({"id": 2})]]
    );
    assert!(h.cache.one.lock().unwrap().is_empty());
}

#[tokio::test]
async fn uncached_success_leaves_cache_alone() {
    let h = harness(ok(r#"{"data":[{"id":1}]}"#), None);

    h.client
        .get("/items", &Value::Null, RequestOptions::default())
        .await
        .unwrap();

    assert!(h.cache.many.lock().unwrap().is_empty());
    assert!(h.cache.one.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unauthorized_logs_out_exactly_once() {
    let h = harness(
        reply(401, "Unauthorized", r#"{"error":"token expired"}"#),
        Some("stale"),
    );

    let err = h
        .client
        .get("/me", &Value::Null, RequestOptions::cached())
        .await
        .unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(err.message(), "token expired");
    assert_eq!(h.session.logouts.load(Ordering::SeqCst), 1);
    assert!(h.cache.one.lock().unwrap().is_empty());
}

#[tokio::test]
async fn other_errors_do_not_log_out() {
    let h = harness(reply(403, "Forbidden", ""), Some("tok"));

    let err = h
        .client
        .get("/admin", &Value::Null, RequestOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), Some(403));
    assert_eq!(h.session.logouts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn server_error_with_text_body_falls_back_to_status_text() {
    let h = harness(reply(500, "Server Error", "upstream exploded"), None);

    let err = h
        .client
        .get("/items", &Value::Null, RequestOptions::default())
        .await
        .unwrap_err();

    match err {
        ApiError::Http {
            status_code,
            error,
            fields,
            response,
        } => {
            assert_eq!(status_code, 500);
            assert_eq!(error, "Server Error");
            assert!(fields.is_empty());
            assert_eq!(response.body, "upstream exploded");
        }
        other => panic!("expected Http error, got {other:?}"),
    }
}

#[tokio::test]
async fn anonymous_requests_carry_no_authorization() {
    let h = harness(ok(r#"{"data":[]}"#), None);

    h.client
        .get("/items", &Value::Null, RequestOptions::default())
        .await
        .unwrap();

    let request = h.transport.last_request();
    assert!(request.header("Authorization").is_none());
    assert_eq!(request.header("Accept"), Some("application/json"));
    assert_eq!(request.header("Content-Type"), Some("application/json"));
    assert_eq!(request.header("User-Agent"), Some("frontend/1.0"));
}

#[tokio::test]
async fn authenticated_requests_carry_bearer_token() {
    let h = harness(ok(r#"{"data":[]}"#), Some("tok-42"));

    h.client
        .get("/items", &Value::Null, RequestOptions::default())
        .await
        .unwrap();

    assert_eq!(
        h.transport.last_request().header("Authorization"),
        Some("Bearer tok-42")
    );
}

#[tokio::test]
async fn post_sends_json_body_and_no_query() {
    let h = harness(reply(201, "Created", r#"{"data":{"id":7}}"#), Some("tok"));
    let data = json!({"name": "widget", "count": 3});

    h.client
        .post("/items", &data, RequestOptions::default())
        .await
        .unwrap();

    let request = h.transport.last_request();
    assert_eq!(request.method, HttpMethod::Post);
    assert_eq!(request.url, "https://api.example.com/items");
    let body: Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
    assert_eq!(body, data);
}

#[tokio::test]
async fn get_encodes_data_as_query() {
    let h = harness(ok(r#"{"data":[]}"#), None);

    h.client
        .get("/search", &json!({"q": "rust & c", "page": 1}), RequestOptions::default())
        .await
        .unwrap();

    let request = h.transport.last_request();
    assert_eq!(request.url, "https://api.example.com/search?q=rust%20%26%20c&page=1");
    assert!(request.body.is_none());
}

#[tokio::test]
async fn put_and_delete_use_their_methods() {
    let h = harness(ok(r#"{"data":{"id":1}}"#), Some("tok"));
    h.client
        .put("/items/1", &json!({"name": "y"}), RequestOptions::default())
        .await
        .unwrap();
    let request = h.transport.last_request();
    assert_eq!(request.method, HttpMethod::Put);
    assert!(request.body.is_some());

    let h = harness(ok(r#"{"data":{"id":1}}"#), Some("tok"));
    h.client
        .delete("/items/1", RequestOptions::default())
        .await
        .unwrap();
    let request = h.transport.last_request();
    assert_eq!(request.method, HttpMethod::Delete);
    assert!(request.body.is_none());
}

#[tokio::test]
async fn transport_failure_keeps_its_cause() {
    let h = harness(
        Err(TransportError::Network("connection refused".to_string()).into()),
        Some("tok"),
    );

    let err = h
        .client
        .get("/items", &Value::Null, RequestOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ApiError::Transport(TransportError::Network(ref msg)) if msg == "connection refused"
    ));
    assert_eq!(err.message(), "Unknown error");
    assert_eq!(h.session.logouts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn cache_without_data_field_fails_the_call() {
    let h = harness(ok(r#"{"meta":{"total":0}}"#), None);

    let err = h
        .client
        .get("/items", &Value::Null, RequestOptions::cached())
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Cache(CacheError::MissingData)));
}
