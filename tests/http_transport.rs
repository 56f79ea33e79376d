//! HTTP transport tests against an in-process fake registry.
//!
//! The fake registry is an axum router that records every request's
//! headers and body and answers with canned EPP documents, issuing and
//! rotating a session cookie the way a registry gateway does.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE, USER_AGENT};
use axum::http::{HeaderMap, HeaderName, Response, StatusCode};
use axum::routing::post;
use axum::Router;
use tokio::net::TcpListener;

use epp::transport::mock;
use epp::transport::DEFAULT_USER_AGENT;
use epp::{
    CookieSet, EppError, FileStore, HttpTransport, HttpTransportConfig, ProtocolState, Session,
    SessionOptions, TransportError,
};

const CHECK_OK: &str = r#"<domain:chkData xmlns:domain="urn:ietf:params:xml:ns:domain-1.0"><domain:cd><domain:name avail="false">example.it</domain:name><domain:reason>In use</domain:reason></domain:cd></domain:chkData>"#;

#[derive(Debug, Clone)]
struct Seen {
    user_agent: Option<String>,
    content_type: Option<String>,
    cookie: Option<String>,
    body: String,
}

#[derive(Debug, Default)]
struct Registry {
    seen: Mutex<Vec<Seen>>,
}

impl Registry {
    fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }
}

async fn epp(State(registry): State<Arc<Registry>>, headers: HeaderMap, body: String) -> Response<Body> {
    let get = |name: HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    registry.seen.lock().unwrap().push(Seen {
        user_agent: get(USER_AGENT),
        content_type: get(CONTENT_TYPE),
        cookie: get(COOKIE),
        body: body.clone(),
    });

    let (xml, set_cookie) = if body.contains("<hello/>") {
        (mock::greeting(), Some("JSESSIONID=s1; Path=/; HttpOnly"))
    } else if body.contains("<logout/>") {
        (mock::response(1500, None).to_string(), Some("JSESSIONID=s2; Path=/"))
    } else if body.contains("<domain:check") {
        (mock::response(1000, None).res_data(CHECK_OK).to_string(), None)
    } else {
        (mock::response(1000, None).to_string(), None)
    };

    let mut builder = Response::builder().header(CONTENT_TYPE, "text/xml; charset=UTF-8");
    if let Some(cookie) = set_cookie {
        builder = builder.header(SET_COOKIE, cookie);
    }
    builder.body(Body::from(xml)).unwrap()
}

async fn slow() -> String {
    tokio::time::sleep(Duration::from_secs(2)).await;
    mock::greeting()
}

async fn spawn_registry() -> (String, Arc<Registry>) {
    let registry = Arc::new(Registry::default());
    let router = Router::new()
        .route("/epp", post(epp))
        .route("/broken", post(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
        .route("/slow", post(slow))
        .with_state(registry.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (format!("http://{addr}"), registry)
}

fn session(
    url: &str,
    dir: &tempfile::TempDir,
    timeout: Duration,
) -> Session<HttpTransport, FileStore> {
    let transport = HttpTransport::new(
        HttpTransportConfig::new(url.parse().unwrap()).with_timeouts(timeout, Duration::from_secs(2)),
    );
    let options = SessionOptions::new("REG-A", "secret")
        .with_xml_log(dir.path().join("xml.log"))
        .with_request_timeout(timeout);
    Session::new(transport, FileStore::new(dir.path().join("store.json")), options).unwrap()
}

/// Test headers, cookie carry-over and cookie rotation over real HTTP
#[tokio::test]
async fn test_full_flow_over_http() {
    let (base, registry) = spawn_registry().await;
    let dir = tempfile::tempdir().unwrap();
    let mut session = session(&format!("{base}/epp"), &dir, Duration::from_secs(5));

    let reply = session.domain_check(&["example.it"]).await.unwrap();
    assert_eq!(reply.data.is_available("example.it"), Some(false));
    assert_eq!(session.status(), ProtocolState::LoggedIn);

    let seen = registry.seen();
    assert_eq!(seen.len(), 3);
    assert!(seen[0].body.contains("<hello/>"));
    assert!(seen[0].cookie.is_none());
    assert_eq!(seen[1].cookie.as_deref(), Some("JSESSIONID=s1"));
    assert_eq!(seen[2].cookie.as_deref(), Some("JSESSIONID=s1"));
    for request in &seen {
        assert_eq!(request.user_agent.as_deref(), Some(DEFAULT_USER_AGENT));
        assert!(request.content_type.as_deref().unwrap().starts_with("text/xml"));
    }

    session.logout().await.unwrap();
    assert_eq!(session.status(), ProtocolState::Helloed);
    assert_eq!(session.cookies(), &CookieSet::from_set_cookie(["JSESSIONID=s2"]));

    let log = std::fs::read_to_string(dir.path().join("xml.log")).unwrap();
    assert_eq!(log.matches(" OUT ").count(), 4);
    assert_eq!(log.matches(" IN ").count(), 4);
    assert!(log.contains("[JSESSIONID=s1]"));
}

/// Test a fresh session on the same store resumes without logging in
#[tokio::test]
async fn test_resume_from_store_over_http() {
    let (base, registry) = spawn_registry().await;
    let dir = tempfile::tempdir().unwrap();
    let url = format!("{base}/epp");

    session(&url, &dir, Duration::from_secs(5))
        .login(None)
        .await
        .unwrap();

    let mut resumed = session(&url, &dir, Duration::from_secs(5));
    assert_eq!(resumed.status(), ProtocolState::LoggedIn);
    resumed.domain_check(&["example.it"]).await.unwrap();

    let seen = registry.seen();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[2].cookie.as_deref(), Some("JSESSIONID=s1"));
}

/// Test non-2xx statuses surface as transport errors and are not resent
#[tokio::test]
async fn test_http_status_error() {
    let (base, _registry) = spawn_registry().await;
    let dir = tempfile::tempdir().unwrap();
    let mut session = session(&format!("{base}/broken"), &dir, Duration::from_secs(5));

    let err = session.hello().await.unwrap_err();
    assert!(matches!(
        err,
        EppError::Transport(TransportError::HttpStatus(500))
    ));
    assert_eq!(session.status(), ProtocolState::New);
}

/// Test a refused connection is retried once, then propagates
#[tokio::test]
async fn test_connection_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let dir = tempfile::tempdir().unwrap();
    let mut session = session(&format!("http://{addr}/epp"), &dir, Duration::from_secs(5));

    let err = session.hello().await.unwrap_err();
    assert!(err.is_retryable_transport());

    let log = std::fs::read_to_string(dir.path().join("xml.log")).unwrap();
    assert_eq!(log.matches(" OUT ").count(), 2);
    assert_eq!(log.matches(" IN ").count(), 0);
}

/// Test the per-request deadline
#[tokio::test]
async fn test_request_deadline() {
    let (base, _registry) = spawn_registry().await;
    let dir = tempfile::tempdir().unwrap();
    let mut session = session(&format!("{base}/slow"), &dir, Duration::from_millis(200));

    let err = session.hello().await.unwrap_err();
    assert!(matches!(
        err,
        EppError::Transport(TransportError::Timeout(_))
    ));
}
