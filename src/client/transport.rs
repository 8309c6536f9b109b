// File: ./src/client/transport.rs
//! Bottom of the stack: hyper over rustls, with bodies buffered into `Bytes`.
use crate::client::cert::NoVerifier;
use crate::error::ClientError;
use futures::future::BoxFuture;
use http::{Request, Response};
use http_body_util::BodyExt;
use hyper::body::Bytes;
use hyper_rustls::HttpsConnectorBuilder;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tower_service::Service;

type HttpsClient = Client<hyper_rustls::HttpsConnector<HttpConnector>, String>;

fn tls_config(insecure: bool) -> Result<rustls::ClientConfig, ClientError> {
    let builder = rustls::ClientConfig::builder();

    if insecure {
        log::warn!("TLS certificate verification is disabled");
        return Ok(builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(NoVerifier))
            .with_no_client_auth());
    }

    let mut root_store = rustls::RootCertStore::empty();

    #[cfg(not(target_os = "android"))]
    {
        let result = rustls_native_certs::load_native_certs();
        for err in &result.errors {
            log::debug!("Skipping unreadable system certificate: {}", err);
        }
        root_store.add_parsable_certificates(result.certs);
    }

    #[cfg(target_os = "android")]
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    if root_store.is_empty() {
        return Err(ClientError::Tls(
            "No valid system certificates found.".to_string(),
        ));
    }
    Ok(builder
        .with_root_certificates(root_store)
        .with_no_client_auth())
}

/// Sends requests with hyper and buffers the response body.
#[derive(Clone, Debug)]
pub struct HyperTransport {
    client: HttpsClient,
    timeout: Duration,
}

impl HyperTransport {
    pub fn new(insecure: bool, timeout: Duration) -> Result<Self, ClientError> {
        let https_connector = HttpsConnectorBuilder::new()
            .with_tls_config(tls_config(insecure)?)
            .https_or_http()
            .enable_http1()
            .build();

        let client = Client::builder(TokioExecutor::new()).build(https_connector);
        Ok(Self { client, timeout })
    }
}

impl Service<Request<String>> for HyperTransport {
    type Response = Response<Bytes>;
    type Error = ClientError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // The pooled client is always ready; connections are made per request.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<String>) -> Self::Future {
        let client = self.client.clone();
        let timeout = self.timeout;

        Box::pin(async move {
            let exchange = async {
                let response = client
                    .request(req)
                    .await
                    .map_err(|e| ClientError::Transport(e.to_string()))?;
                let (parts, body) = response.into_parts();
                let bytes = body
                    .collect()
                    .await
                    .map_err(|e| ClientError::Transport(e.to_string()))?
                    .to_bytes();
                Ok::<_, ClientError>(Response::from_parts(parts, bytes))
            };

            tokio::time::timeout(timeout, exchange)
                .await
                .map_err(|_| ClientError::Timeout)?
        })
    }
}
