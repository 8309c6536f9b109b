// File: ./src/client/refresh.rs
//! Single-flight token refresh.
//!
//! The first request to see a 401 starts the exchange on its own task;
//! that request and every other one that hits a 401 while it runs are parked
//! in a [`PendingQueue`] and resumed with whatever the exchange ends up with.
//! Dropping any of the waiting requests does not stop the exchange.
use crate::client::queue::{PendingQueue, PendingTicket, RefreshOutcome};
use crate::error::{ClientError, ClientResult};
use crate::model::{Envelope, TokenPair};
use crate::session::SessionStore;
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{Request, Response, Uri};
use hyper::body::Bytes;
use serde::Serialize;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tower::ServiceExt;
use tower_service::Service;

pub const REFRESH_TOKEN_PATH: &str = "/auth/refresh-token";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshState {
    #[default]
    Idle,
    InProgress,
}

#[derive(Debug, Default)]
struct Shared {
    state: RefreshState,
    queue: PendingQueue,
}

/// What a request that just saw a 401 has to do.
pub enum Role {
    /// Start the exchange and report the outcome through the lease, then
    /// wait on the ticket like everyone else.
    Leader {
        lease: RefreshLease,
        ticket: PendingTicket,
    },
    /// Wait for the running exchange.
    Follower(PendingTicket),
}

/// Owns the refresh flag and the queue of parked requests for one client.
///
/// The lock is only held for the state check and the queue operations,
/// never across an `.await`.
#[derive(Debug, Default)]
pub struct RefreshCoordinator {
    shared: Mutex<Shared>,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Claims the refresh if none is running and parks the caller either way.
    /// Observing `Idle` and switching to `InProgress` happen under one lock.
    pub fn join(self: &Arc<Self>) -> Role {
        let mut shared = self.lock();
        let ticket = shared.queue.enqueue();
        match shared.state {
            RefreshState::Idle => {
                shared.state = RefreshState::InProgress;
                Role::Leader {
                    lease: RefreshLease {
                        coordinator: self.clone(),
                        completed: false,
                    },
                    ticket,
                }
            }
            RefreshState::InProgress => {
                log::debug!("Refresh in flight, {} request(s) waiting", shared.queue.len());
                Role::Follower(ticket)
            }
        }
    }

    pub fn state(&self) -> RefreshState {
        self.lock().state
    }

    /// Number of requests parked behind the running refresh.
    pub fn pending(&self) -> usize {
        self.lock().queue.len()
    }

    fn finish(&self, outcome: &RefreshOutcome) -> usize {
        let mut shared = self.lock();
        shared.state = RefreshState::Idle;
        shared.queue.drain(outcome)
    }

    /// Resolves a fresh access token after a 401. If no refresh is running,
    /// `refresh` is spawned onto the runtime; the caller then waits for the
    /// running one.
    pub async fn token_after_unauthorized<F, Fut>(self: &Arc<Self>, refresh: F) -> RefreshOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RefreshOutcome> + Send + 'static,
    {
        let ticket = match self.join() {
            Role::Leader { lease, ticket } => {
                let exchange = refresh();
                tokio::spawn(async move {
                    let outcome = exchange.await;
                    let resumed = lease.complete(&outcome);
                    log::debug!("Released {} waiting request(s)", resumed);
                });
                ticket
            }
            Role::Follower(ticket) => ticket,
        };
        ticket
            .await
            .unwrap_or(Err(ClientError::RefreshInterrupted))
    }
}

/// Proof of leadership over the running refresh.
///
/// Dropping it without calling [`RefreshLease::complete`] (the refresh task
/// panicked or the runtime shut down) still resets the flag and rejects the
/// queue.
pub struct RefreshLease {
    coordinator: Arc<RefreshCoordinator>,
    completed: bool,
}

impl RefreshLease {
    /// Returns the flag to `Idle` and hands `outcome` to every parked
    /// request. Returns how many were still waiting.
    pub fn complete(mut self, outcome: &RefreshOutcome) -> usize {
        self.completed = true;
        self.coordinator.finish(outcome)
    }
}

impl Drop for RefreshLease {
    fn drop(&mut self) {
        if !self.completed {
            log::warn!("Token refresh ended before completion");
            self.coordinator
                .finish(&Err(ClientError::RefreshInterrupted));
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Trades the stored refresh token for a new token pair.
///
/// Sent straight to `transport`, below the auth layer, so a 401 here is a
/// plain failure rather than another refresh. No network call is made when
/// no refresh token is stored.
pub async fn exchange<S>(
    transport: S,
    endpoint: &Uri,
    session: &SessionStore,
) -> ClientResult<TokenPair>
where
    S: Service<Request<String>, Response = Response<Bytes>, Error = ClientError>,
{
    let refresh_token = session
        .refresh_token()
        .await?
        .ok_or(ClientError::NoRefreshToken)?;

    let body = serde_json::to_string(&RefreshRequest {
        refresh_token: &refresh_token,
    })
    .map_err(|e| ClientError::InvalidRequest(e.to_string()))?;

    let request = Request::post(endpoint.clone())
        .header(CONTENT_TYPE, "application/json")
        .header(ACCEPT, "application/json")
        .body(body)
        .map_err(|e| ClientError::InvalidRequest(e.to_string()))?;

    let response = transport
        .oneshot(request)
        .await
        .map_err(|e| ClientError::RefreshExchange(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ClientError::RefreshExchange(format!(
            "refresh endpoint returned {}",
            status
        )));
    }

    let envelope: Envelope<TokenPair> = serde_json::from_slice(response.body())
        .map_err(|e| ClientError::RefreshExchange(format!("unexpected refresh response: {}", e)))?;
    Ok(envelope.data)
}
