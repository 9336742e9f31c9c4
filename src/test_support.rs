//! Fake ezpass service for tests.
//!
//! Binds an axum router to an ephemeral local port and answers `/user` and
//! `/groups/{group_id}` according to the token it receives. Compiled for
//! this crate's own tests and, behind the `test-support` feature, for
//! downstream integration tests.

use std::{
    collections::HashSet,
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use axum::{
    Router,
    extract::{ConnectInfo, Path, RawQuery, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use tokio::{net::TcpListener, task::JoinHandle};

use crate::middleware::auth::credentials::{FormParams, token_from};

pub const TOKEN_OK: &str = "200";
pub const TOKEN_UNAUTHORIZED: &str = "401";
pub const TOKEN_NOT_FOUND: &str = "404";
pub const TOKEN_TIMEOUT: &str = "408";
pub const TOKEN_ERROR: &str = "500";
/// Succeeds, but only after [`SLOW_DELAY`].
pub const TOKEN_SLOW_OK: &str = "slow";
/// 200 with a body that is not a pass.
pub const TOKEN_MALFORMED: &str = "malformed";
pub const TOKEN_TEAPOT: &str = "418";
/// 500 with a [`LARGE_BODY_LEN`] byte body.
pub const TOKEN_LARGE_ERROR: &str = "large-500";

pub const SLOW_DELAY: Duration = Duration::from_millis(200);
pub const TIMEOUT_DELAY: Duration = Duration::from_secs(1);
pub const LARGE_BODY_LEN: usize = 4 * 1024 * 1024;

pub const RESPONSE_UNAUTHORIZED: &str = "Unauthorized";
pub const RESPONSE_NOT_FOUND: &str = "Not Found";
pub const RESPONSE_ERROR: &str = "Internal Server Error";

pub const RESPONSE_USER: &str = r#"{
  "user": {
    "id":           "100",
    "name":         "Brandon Keene",
    "avatar_url":   "http://i.groupme.com/100",
    "access_token": "success"
  }
}"#;

pub const RESPONSE_MEMBERSHIP: &str = r#"{
  "user": {
    "id":           "100",
    "name":         "Brandon Keene",
    "avatar_url":   "http://i.groupme.com/100",
    "access_token": "success"
  },
  "membership": {
    "nickname": "B-money"
  }
}"#;

#[derive(Debug, Default)]
struct Recorder {
    hits: AtomicUsize,
    completed: AtomicUsize,
    peers: Mutex<HashSet<SocketAddr>>,
    last_group_id: Mutex<Option<String>>,
}

/// Handle to a running fake. The server stops when this is dropped.
#[derive(Debug)]
pub struct FakeEzpass {
    addr: SocketAddr,
    recorder: Arc<Recorder>,
    task: JoinHandle<()>,
}

impl FakeEzpass {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Requests received so far.
    pub fn hits(&self) -> usize {
        self.recorder.hits.load(Ordering::SeqCst)
    }

    /// Requests whose response has been produced.
    pub fn completed(&self) -> usize {
        self.recorder.completed.load(Ordering::SeqCst)
    }

    /// Distinct client connections that carried a request.
    pub fn connections(&self) -> usize {
        self.recorder.peers.lock().map(|p| p.len()).unwrap_or_default()
    }

    pub fn last_group_id(&self) -> Option<String> {
        self.recorder
            .last_group_id
            .lock()
            .map(|g| g.clone())
            .unwrap_or_default()
    }
}

impl Drop for FakeEzpass {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Start a fake ezpass on `127.0.0.1:0`.
///
/// # Panics
///
/// Panics when no local port can be bound.
pub async fn spawn() -> FakeEzpass {
    let recorder = Arc::new(Recorder::default());
    let app = Router::new()
        .route("/user", get(user))
        .route("/groups/{group_id}", get(group))
        .with_state(recorder.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake ezpass listener");
    let addr = listener.local_addr().expect("fake ezpass local addr");

    let task = tokio::spawn(async move {
        let service = app.into_make_service_with_connect_info::<SocketAddr>();
        if let Err(err) = axum::serve(listener, service).await {
            tracing::error!(error = %err, "fake ezpass stopped");
        }
    });

    FakeEzpass {
        addr,
        recorder,
        task,
    }
}

async fn user(
    State(recorder): State<Arc<Recorder>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Response {
    respond(&recorder, peer, &headers, query.as_deref(), RESPONSE_USER).await
}

async fn group(
    State(recorder): State<Arc<Recorder>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Path(group_id): Path<String>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Response {
    if let Ok(mut last) = recorder.last_group_id.lock() {
        *last = Some(group_id);
    }
    respond(&recorder, peer, &headers, query.as_deref(), RESPONSE_MEMBERSHIP).await
}

async fn respond(
    recorder: &Recorder,
    peer: SocketAddr,
    headers: &HeaderMap,
    query: Option<&str>,
    body: &'static str,
) -> Response {
    recorder.hits.fetch_add(1, Ordering::SeqCst);
    if let Ok(mut peers) = recorder.peers.lock() {
        peers.insert(peer);
    }
    let token = token_from(headers, &FormParams::from_query(query));
    tracing::debug!(token_len = token.len(), "fake ezpass request");

    let response = match token.as_str() {
        TOKEN_OK => (StatusCode::OK, body).into_response(),
        TOKEN_NOT_FOUND => (StatusCode::NOT_FOUND, RESPONSE_NOT_FOUND).into_response(),
        TOKEN_TIMEOUT => {
            tokio::time::sleep(TIMEOUT_DELAY).await;
            (StatusCode::REQUEST_TIMEOUT, RESPONSE_NOT_FOUND).into_response()
        }
        TOKEN_ERROR => (StatusCode::INTERNAL_SERVER_ERROR, RESPONSE_ERROR).into_response(),
        TOKEN_SLOW_OK => {
            tokio::time::sleep(SLOW_DELAY).await;
            (StatusCode::OK, body).into_response()
        }
        TOKEN_MALFORMED => (StatusCode::OK, "{\"user\": [").into_response(),
        TOKEN_TEAPOT => StatusCode::IM_A_TEAPOT.into_response(),
        TOKEN_LARGE_ERROR => {
            (StatusCode::INTERNAL_SERVER_ERROR, vec![b'x'; LARGE_BODY_LEN]).into_response()
        }
        _ => (StatusCode::UNAUTHORIZED, RESPONSE_UNAUTHORIZED).into_response(),
    };

    recorder.completed.fetch_add(1, Ordering::SeqCst);
    response
}
