// File: ./src/client/middleware.rs
//! Tower middleware stamping every request with the client's identity.
use http::header::{ACCEPT, USER_AGENT};
use http::{HeaderValue, Request};
use std::task::{Context, Poll};
use tower_layer::Layer;
use tower_service::Service;

/// Sets `User-Agent` and, unless the caller chose one, `Accept: application/json`.
#[derive(Clone, Debug)]
pub struct ClientHeadersLayer {
    user_agent: Option<HeaderValue>,
}

impl ClientHeadersLayer {
    /// An agent string that is not a valid header value is skipped.
    pub fn new(user_agent: &str) -> Self {
        Self {
            user_agent: HeaderValue::from_str(user_agent).ok(),
        }
    }
}

impl<S> Layer<S> for ClientHeadersLayer {
    type Service = ClientHeadersService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ClientHeadersService {
            inner,
            user_agent: self.user_agent.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ClientHeadersService<S> {
    inner: S,
    user_agent: Option<HeaderValue>,
}

impl<S, ReqBody> Service<Request<ReqBody>> for ClientHeadersService<S>
where
    S: Service<Request<ReqBody>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        if let Some(val) = &self.user_agent {
            req.headers_mut().insert(USER_AGENT, val.clone());
        }
        req.headers_mut()
            .entry(ACCEPT)
            .or_insert(HeaderValue::from_static("application/json"));
        self.inner.call(req)
    }
}
