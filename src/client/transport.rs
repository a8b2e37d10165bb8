//! The external HTTP-client seam.
//!
//! Defines the [`Transport`] trait that the orchestration layer calls to
//! actually move bytes, and [`HyperTransport`], the default
//! implementation on the `hyper-util` legacy client with rustls TLS.
//! Connection handling, socket retries, and TLS all live behind this
//! seam; the rest of the crate only sees a settled [`ResponseParts`] or
//! an error.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Request, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::error::CourierError;

/// A fully collected response: status, headers, and body bytes.
#[derive(Debug, Clone)]
pub struct ResponseParts {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

// async_trait is required here because transports are held as
// `Arc<dyn Transport>` and native async fn in traits does not support
// dyn dispatch.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(&self, request: Request<Full<Bytes>>) -> Result<ResponseParts, CourierError>;
}

pub type HttpsConnector =
    hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>;
pub type HttpClient = Client<HttpsConnector, Full<Bytes>>;

/// Default transport: connection-pooled hyper client, HTTPS via rustls
/// with webpki roots, plain HTTP allowed.
pub struct HyperTransport {
    client: HttpClient,
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HyperTransport {
    #[must_use]
    pub fn new() -> Self {
        // When multiple rustls crypto providers are compiled in, rustls
        // cannot auto-detect which one to use. Explicitly install `ring`
        // as the default provider.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let https = hyper_rustls::HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .build();
        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(30))
            .build(https);
        Self { client }
    }
}

#[async_trait]
impl Transport for HyperTransport {
    async fn send(&self, request: Request<Full<Bytes>>) -> Result<ResponseParts, CourierError> {
        let response = self
            .client
            .request(request)
            .await
            .map_err(|e| CourierError::Transport { source: e.into() })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| CourierError::BodyRead { source: e.into() })?
            .to_bytes();

        Ok(ResponseParts {
            status,
            headers,
            body,
        })
    }
}
