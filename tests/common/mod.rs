// In-process backend for driving the client deterministically.
#![allow(dead_code)]

use clinicdesk::client::{ApiClient, HttpStack, REFRESH_TOKEN_PATH, SignInRedirect};
use clinicdesk::config::Config;
use clinicdesk::error::{ClientError, ClientResult};
use clinicdesk::session::SessionStore;
use clinicdesk::storage::{KeyValueStore, MemoryStore};
use futures::future::BoxFuture;
use http::header::AUTHORIZATION;
use http::{Method, Request, Response, StatusCode};
use hyper::body::Bytes;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::sync::Notify;
use tower_service::Service;

pub const BASE_URL: &str = "http://backend.test/api";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seen {
    pub method: Method,
    pub path: String,
    pub bearer: Option<String>,
}

/// Fake REST backend.
///
/// Protected endpoints answer 200 only for the currently accepted access token.
/// The refresh endpoint hands out `next_tokens` (or fails when unset) and can
/// be held back until a number of 401s have been served, so every concurrent
/// request is known to be waiting before the refresh completes.
#[derive(Debug, Default)]
pub struct Backend {
    accepted: Mutex<String>,
    next_tokens: Mutex<Option<(String, String)>>,
    reject_everything: AtomicBool,
    hold_refresh_until: AtomicUsize,
    unauthorized: AtomicUsize,
    refresh_calls: AtomicUsize,
    presented_refresh_tokens: Mutex<Vec<String>>,
    seen: Mutex<Vec<Seen>>,
    served: Notify,
}

impl Backend {
    pub fn accepting(token: &str) -> Arc<Self> {
        let backend = Self::default();
        *backend.accepted.lock().unwrap() = token.to_string();
        Arc::new(backend)
    }

    /// The refresh endpoint issues this pair and starts accepting `access`.
    pub fn issue_on_refresh(&self, access: &str, refresh: &str) {
        *self.next_tokens.lock().unwrap() = Some((access.to_string(), refresh.to_string()));
    }

    pub fn fail_refresh(&self) {
        *self.next_tokens.lock().unwrap() = None;
    }

    /// Protected endpoints answer 401 to every token, fresh or not.
    pub fn reject_everything(&self) {
        self.reject_everything.store(true, Ordering::SeqCst);
    }

    pub fn hold_refresh_until(&self, unauthorized: usize) {
        self.hold_refresh_until.store(unauthorized, Ordering::SeqCst);
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn unauthorized_served(&self) -> usize {
        self.unauthorized.load(Ordering::SeqCst)
    }

    pub fn presented_refresh_tokens(&self) -> Vec<String> {
        self.presented_refresh_tokens.lock().unwrap().clone()
    }

    /// Requests to protected endpoints, in arrival order.
    pub fn protected_requests(&self) -> Vec<Seen> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|s| !s.path.ends_with(REFRESH_TOKEN_PATH))
            .cloned()
            .collect()
    }

    async fn handle(&self, req: Request<String>) -> Response<Bytes> {
        let path = req.uri().path().to_string();
        let bearer = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string);
        self.seen.lock().unwrap().push(Seen {
            method: req.method().clone(),
            path: path.clone(),
            bearer: bearer.clone(),
        });

        if path.ends_with(REFRESH_TOKEN_PATH) {
            return self.refresh(req.body()).await;
        }

        let accepted = self.accepted.lock().unwrap().clone();
        let authorized = !self.reject_everything.load(Ordering::SeqCst)
            && bearer.as_deref() == Some(accepted.as_str());
        if !authorized {
            self.unauthorized.fetch_add(1, Ordering::SeqCst);
            self.served.notify_waiters();
            return json(StatusCode::UNAUTHORIZED, r#"{"message":"Unauthorized"}"#);
        }

        json(StatusCode::OK, &body_for(&path))
    }

    async fn refresh(&self, body: &str) -> Response<Bytes> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        let presented: serde_json::Value = serde_json::from_str(body).unwrap();
        self.presented_refresh_tokens
            .lock()
            .unwrap()
            .push(presented["refreshToken"].as_str().unwrap().to_string());

        loop {
            let served = self.served.notified();
            if self.unauthorized.load(Ordering::SeqCst)
                >= self.hold_refresh_until.load(Ordering::SeqCst)
            {
                break;
            }
            served.await;
        }

        let next = self.next_tokens.lock().unwrap().clone();
        match next {
            Some((access, refresh)) => {
                *self.accepted.lock().unwrap() = access.clone();
                json(
                    StatusCode::OK,
                    &serde_json::json!({
                        "data": {"accessToken": access, "refreshToken": refresh}
                    })
                    .to_string(),
                )
            }
            None => json(
                StatusCode::UNAUTHORIZED,
                r#"{"message":"Refresh token expired"}"#,
            ),
        }
    }
}

fn json(status: StatusCode, body: &str) -> Response<Bytes> {
    let mut response = Response::new(Bytes::from(body.to_string()));
    *response.status_mut() = status;
    response
}

fn body_for(path: &str) -> String {
    let data = match path {
        "/api/appointments/doctor/appointments" => serde_json::json!([
            {"id": "a2", "status": "PENDING", "scheduledAt": "2026-03-02T14:00:00Z"},
            {
                "id": "a1",
                "status": "CONFIRMED",
                "scheduledAt": "2026-03-02T09:30:00Z",
                "patient": {"id": "p1", "firstName": "Ann", "lastName": "Lee"}
            }
        ]),
        "/api/clinics/my/clinics" => serde_json::json!([
            {"id": "c1", "name": "North Clinic", "city": "Lyon", "isVerified": true}
        ]),
        "/api/services/my-services" => serde_json::json!([
            {"id": "s1", "name": "Consultation", "price": 50.0, "durationMinutes": 30}
        ]),
        "/api/users/me" => serde_json::json!(
            {"id": "u1", "email": "dr.lee@example.com", "firstName": "Jo", "role": "DOCTOR"}
        ),
        _ => serde_json::json!({}),
    };
    serde_json::json!({"data": data, "message": "ok"}).to_string()
}

#[derive(Debug, Clone)]
pub struct BackendTransport(pub Arc<Backend>);

impl Service<Request<String>> for BackendTransport {
    type Response = Response<Bytes>;
    type Error = ClientError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<String>) -> Self::Future {
        let backend = self.0.clone();
        Box::pin(async move { Ok(backend.handle(req).await) })
    }
}

/// Counts sign-in redirects and remembers the last reason.
#[derive(Debug, Default)]
pub struct RecordingRedirect {
    pub reasons: Mutex<Vec<ClientError>>,
}

impl RecordingRedirect {
    pub fn count(&self) -> usize {
        self.reasons.lock().unwrap().len()
    }
}

impl SignInRedirect for RecordingRedirect {
    fn redirect_to_sign_in(&self, reason: &ClientError) {
        self.reasons.lock().unwrap().push(reason.clone());
    }
}

/// Session storage that fails on demand, over a `MemoryStore` that tests
/// can inspect.
#[derive(Debug)]
pub struct FailingStore {
    inner: MemoryStore,
    unreadable: Mutex<Vec<String>>,
    fail_writes: AtomicBool,
}

impl FailingStore {
    pub fn over(inner: &MemoryStore) -> Arc<Self> {
        Arc::new(Self {
            inner: inner.clone(),
            unreadable: Mutex::new(Vec::new()),
            fail_writes: AtomicBool::new(false),
        })
    }

    pub fn fail_reads_of(&self, key: &str) {
        self.unreadable.lock().unwrap().push(key.to_string());
    }

    /// Every `set` fails; removals still go through.
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, key: &str) -> ClientResult<Option<String>> {
        if self.unreadable.lock().unwrap().iter().any(|k| k == key) {
            return Err(ClientError::StorageRead(format!("{} is unreadable", key)));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ClientError::StorageWrite("disk full".to_string()));
        }
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> ClientResult<()> {
        self.inner.remove(key).await
    }
}

pub type TestClient = ApiClient<HttpStack<BackendTransport>>;

pub fn client_for(
    backend: &Arc<Backend>,
    store: &MemoryStore,
) -> (TestClient, Arc<RecordingRedirect>) {
    client_over(backend, Arc::new(store.clone()))
}

pub fn client_over(
    backend: &Arc<Backend>,
    store: Arc<dyn KeyValueStore>,
) -> (TestClient, Arc<RecordingRedirect>) {
    let redirect = Arc::new(RecordingRedirect::default());
    let client = ApiClient::with_transport(
        &Config::new(BASE_URL),
        SessionStore::new(store),
        redirect.clone(),
        BackendTransport(backend.clone()),
    )
    .unwrap();
    (client, redirect)
}

/// A signed-in session holding `access` and `refresh`.
pub fn signed_in(access: &str, refresh: &str) -> MemoryStore {
    MemoryStore::with_entries([
        ("authToken", access),
        ("refreshToken", refresh),
        ("userData", r#"{"id":"u1","email":"dr.lee@example.com","role":"DOCTOR"}"#),
        ("isLoggedIn", "true"),
    ])
}
