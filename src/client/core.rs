// File: src/client/core.rs
use crate::client::auth::{Anonymous, BearerAuthLayer, BearerAuthService, SignInRedirect};
use crate::client::middleware::{ClientHeadersLayer, ClientHeadersService};
use crate::client::refresh::{REFRESH_TOKEN_PATH, RefreshState};
use crate::client::transport::HyperTransport;
use crate::config::Config;
use crate::error::{ClientError, ClientResult};
use crate::model::Envelope;
use crate::session::SessionStore;
use http::header::CONTENT_TYPE;
use http::{Method, Request, Response, Uri};
use hyper::body::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tower::ServiceExt;
use tower_layer::Layer;
use tower_service::Service;

/// Middleware stack every request goes through, outermost first. The refresh
/// exchange is sent below the auth layer, so it still gets the client headers.
pub type HttpStack<T> = BearerAuthService<ClientHeadersService<T>>;

/// The client used by the app: the stack over hyper/rustls.
pub type HttpsApiClient = ApiClient<HttpStack<HyperTransport>>;

/// Any service that can carry the client's requests.
pub trait HttpService:
    Service<Request<String>, Response = Response<Bytes>, Error = ClientError> + Clone
{
}

impl<T> HttpService for T where
    T: Service<Request<String>, Response = Response<Bytes>, Error = ClientError> + Clone
{
}

/// Checks that `id` can be used as a single path segment.
pub(crate) fn path_segment(id: &str) -> ClientResult<&str> {
    if id.is_empty() || id.contains(['/', '?', '#', '%', ' ']) {
        return Err(ClientError::InvalidRequest(format!(
            "'{}' is not a valid resource id",
            id
        )));
    }
    Ok(id)
}

/// JSON client for the REST backend.
///
/// Clones share the HTTP connection pool, the session store and the refresh
/// coordinator, so a refresh started through one clone is seen by all.
#[derive(Clone, Debug)]
pub struct ApiClient<S> {
    service: S,
    base_url: String,
    session: SessionStore,
    auth: BearerAuthLayer,
}

impl HttpsApiClient {
    pub fn new(
        config: &Config,
        session: SessionStore,
        redirect: Arc<dyn SignInRedirect>,
    ) -> ClientResult<Self> {
        config
            .validate()
            .map_err(|e| ClientError::InvalidRequest(e.to_string()))?;
        let transport = HyperTransport::new(config.allow_insecure_certs, config.request_timeout())?;
        Self::with_transport(config, session, redirect, transport)
    }
}

impl<T> ApiClient<HttpStack<T>>
where
    T: Service<Request<String>, Response = Response<Bytes>, Error = ClientError>
        + Clone
        + Send
        + 'static,
    T::Future: Send + 'static,
{
    /// Builds the stack over any transport; tests pass an in-process backend.
    pub fn with_transport(
        config: &Config,
        session: SessionStore,
        redirect: Arc<dyn SignInRedirect>,
        transport: T,
    ) -> ClientResult<Self> {
        let base_url = config.api_url.trim().trim_end_matches('/').to_string();
        let refresh_endpoint = join_url(&base_url, REFRESH_TOKEN_PATH)?;

        let auth = BearerAuthLayer::new(session.clone(), refresh_endpoint, redirect);
        let service = auth.layer(ClientHeadersLayer::new(&config.user_agent).layer(transport));

        Ok(Self {
            service,
            base_url,
            session,
            auth,
        })
    }
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> ClientResult<T> {
    let envelope: Envelope<T> =
        serde_json::from_slice(bytes).map_err(|e| ClientError::Decode(e.to_string()))?;
    Ok(envelope.data)
}

fn join_url(base_url: &str, path: &str) -> ClientResult<Uri> {
    let url = if path.starts_with('/') {
        format!("{}{}", base_url, path)
    } else {
        format!("{}/{}", base_url, path)
    };
    url.parse::<Uri>()
        .map_err(|e| ClientError::InvalidRequest(format!("bad URL '{}': {}", url, e)))
}

impl<S: HttpService> ApiClient<S> {
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn refresh_state(&self) -> RefreshState {
        self.auth.coordinator().state()
    }

    pub fn url(&self, path: &str) -> ClientResult<Uri> {
        join_url(&self.base_url, path)
    }

    fn build_request(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
        anonymous: bool,
    ) -> ClientResult<Request<String>> {
        let mut builder = Request::builder().method(method).uri(self.url(path)?);
        if body.is_some() {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }
        if anonymous {
            builder = builder.extension(Anonymous);
        }
        builder
            .body(body.unwrap_or_default())
            .map_err(|e| ClientError::InvalidRequest(e.to_string()))
    }

    /// Sends a request through the full stack and returns the raw response,
    /// whatever its status.
    pub async fn send(&self, req: Request<String>) -> ClientResult<Response<Bytes>> {
        self.service.clone().oneshot(req).await
    }

    async fn call<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        anonymous: bool,
    ) -> ClientResult<Bytes> {
        let body = body
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| ClientError::InvalidRequest(e.to_string()))?;

        let response = self
            .send(self.build_request(method, path, body, anonymous)?)
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::from_status(status, response.body()));
        }
        Ok(response.into_body())
    }

    /// Sends a request and checks for a 2xx status; the body is returned unread.
    pub async fn execute<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> ClientResult<Bytes> {
        self.call(method, path, body, false).await
    }

    /// Sends a request and decodes `data` from the response envelope.
    pub async fn request<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        decode(&self.execute(method, path, body).await?)
    }

    /// POST without the session: no bearer header, and a 401 is not refreshed.
    pub async fn post_anonymous<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        decode(&self.call(Method::POST, path, Some(body), true).await?)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        self.request::<(), T>(Method::GET, path, None).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::PUT, path, Some(body)).await
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::PATCH, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> ClientResult<()> {
        self.execute::<()>(Method::DELETE, path, None).await?;
        Ok(())
    }
}
