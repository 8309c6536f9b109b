// File: ./src/client/auth.rs
//! Bearer authentication with transparent session refresh.
//!
//! Outbound, every request gets `Authorization: Bearer <access token>` when a
//! token is stored. Inbound, a 401 on a first attempt funnels into the
//! client's [`RefreshCoordinator`]: one refresh runs on its own task, every
//! request that hit a 401 meanwhile waits for it, and each is replayed once
//! with the new token.
use crate::client::queue::RefreshOutcome;
use crate::client::refresh::{self, RefreshCoordinator};
use crate::error::{ClientError, ClientResult};
use crate::session::SessionStore;
use futures::future::BoxFuture;
use http::header::AUTHORIZATION;
use http::{HeaderValue, Request, Response, StatusCode, Uri};
use hyper::body::Bytes;
use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::ServiceExt;
use tower_layer::Layer;
use tower_service::Service;

/// Host hook invoked once a session is unrecoverable (refresh failed or no
/// refresh token), after the stored credentials were purged.
pub trait SignInRedirect: Send + Sync {
    fn redirect_to_sign_in(&self, reason: &ClientError);
}

impl<F> SignInRedirect for F
where
    F: Fn(&ClientError) + Send + Sync,
{
    fn redirect_to_sign_in(&self, reason: &ClientError) {
        self(reason)
    }
}

/// Redirect for hosts without a sign-in screen; only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogOnlyRedirect;

impl SignInRedirect for LogOnlyRedirect {
    fn redirect_to_sign_in(&self, reason: &ClientError) {
        log::info!("Session ended ({}); sign-in required", reason);
    }
}

/// Request extension for calls made without a session (sign-in,
/// registration): no bearer header is attached and a 401 is returned as is.
#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

/// Which pass a request is on. A 401 on a `Replay` is returned to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    Initial,
    Replay,
}

impl Attempt {
    /// Whether a response with `status` on this attempt should go through a refresh.
    pub fn needs_refresh(self, status: StatusCode) -> bool {
        self == Attempt::Initial && status == StatusCode::UNAUTHORIZED
    }
}

struct AuthState {
    session: SessionStore,
    refresh_endpoint: Uri,
    coordinator: Arc<RefreshCoordinator>,
    redirect: Arc<dyn SignInRedirect>,
}

impl fmt::Debug for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthState")
            .field("refresh_endpoint", &self.refresh_endpoint)
            .field("coordinator", &self.coordinator)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug)]
pub struct BearerAuthLayer {
    state: Arc<AuthState>,
}

impl BearerAuthLayer {
    /// `refresh_endpoint` is the absolute URL of the refresh-token endpoint.
    /// Every service built from this layer shares one coordinator.
    pub fn new(
        session: SessionStore,
        refresh_endpoint: Uri,
        redirect: Arc<dyn SignInRedirect>,
    ) -> Self {
        Self {
            state: Arc::new(AuthState {
                session,
                refresh_endpoint,
                coordinator: Arc::new(RefreshCoordinator::new()),
                redirect,
            }),
        }
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.state.coordinator
    }
}

impl<S> Layer<S> for BearerAuthLayer {
    type Service = BearerAuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        BearerAuthService {
            inner,
            state: self.state.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct BearerAuthService<S> {
    inner: S,
    state: Arc<AuthState>,
}

impl<S> BearerAuthService<S> {
    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.state.coordinator
    }
}

fn authorize(mut req: Request<String>, token: Option<&str>) -> ClientResult<Request<String>> {
    if let Some(token) = token {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| ClientError::InvalidRequest(format!("unusable access token: {}", e)))?;
        value.set_sensitive(true);
        req.headers_mut().insert(AUTHORIZATION, value);
    }
    Ok(req)
}

impl AuthState {
    async fn dispatch<S>(
        self: Arc<Self>,
        mut inner: S,
        req: Request<String>,
    ) -> ClientResult<Response<Bytes>>
    where
        S: Service<Request<String>, Response = Response<Bytes>, Error = ClientError>
            + Clone
            + Send
            + 'static,
        S::Future: Send + 'static,
    {
        let anonymous = req.extensions().get::<Anonymous>().is_some();
        let mut token = if anonymous {
            None
        } else {
            self.session.access_token().await?
        };
        log::debug!(
            "{} {} ({})",
            req.method(),
            req.uri().path(),
            if token.is_some() { "bearer" } else { "anonymous" }
        );

        let mut attempt = Attempt::Initial;
        loop {
            let response = inner
                .ready()
                .await?
                .call(authorize(req.clone(), token.as_deref())?)
                .await?;

            if anonymous || !attempt.needs_refresh(response.status()) {
                return Ok(response);
            }

            let state = self.clone();
            let refresh_transport = inner.clone();
            let fresh = self
                .coordinator
                .token_after_unauthorized(move || state.refresh(refresh_transport))
                .await?;

            log::debug!("Replaying {} {}", req.method(), req.uri().path());
            token = Some(fresh);
            attempt = Attempt::Replay;
        }
    }

    /// Body of the refresh task: exchange, persist, or end the session.
    async fn refresh<S>(self: Arc<Self>, transport: S) -> RefreshOutcome
    where
        S: Service<Request<String>, Response = Response<Bytes>, Error = ClientError>,
    {
        log::info!("Access token rejected, refreshing session");

        let result = match refresh::exchange(transport, &self.refresh_endpoint, &self.session).await
        {
            // The server has rotated the refresh token at this point; failing
            // to store the new pair loses the session just the same.
            Ok(tokens) => self
                .session
                .store_tokens(&tokens)
                .await
                .map(|()| tokens.access_token),
            Err(e) => Err(e),
        };

        match &result {
            Ok(_) => log::info!("Session refreshed"),
            // Storage was unreadable; the stored session may still be valid.
            Err(ClientError::StorageRead(e)) => {
                log::warn!("Could not read refresh token: {}", e)
            }
            Err(reason) => self.end_session(reason).await,
        }
        result
    }

    async fn end_session(&self, reason: &ClientError) {
        log::warn!("Session refresh failed, signing out: {}", reason);
        if let Err(e) = self.session.purge().await {
            log::error!("Failed to purge session after refresh failure: {}", e);
        }
        self.redirect.redirect_to_sign_in(reason);
    }
}

impl<S> Service<Request<String>> for BearerAuthService<S>
where
    S: Service<Request<String>, Response = Response<Bytes>, Error = ClientError>
        + Clone
        + Send
        + 'static,
    S::Future: Send + 'static,
{
    type Response = Response<Bytes>;
    type Error = ClientError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<String>) -> Self::Future {
        // Keep the instance that was polled ready; leave a clone for the next call.
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);
        let state = self.state.clone();

        Box::pin(async move { state.dispatch(inner, req).await })
    }
}
