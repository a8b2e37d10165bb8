//! Request orchestration: token issue, registration, transport racing,
//! and response-chain completion.
//!
//! A [`Courier`] owns the shared pieces every request flows through: a
//! [`Transport`], the [`RequestRegistry`] of in-flight requests, one
//! response [`Chain`] shared by all responses, and the interceptors and
//! defaults fixed at construction time. The dispatch path is strict
//! sequencing, no new machinery: issue a fresh token and cancel handle,
//! register them, race the transport against cancellation, deregister in
//! the same continuation that observes settlement, and only on success
//! run the response chain before the caller's [`InFlight`] resolves.

pub mod options;
pub mod shape;
pub mod transport;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::chain::Chain;
use crate::error::CourierError;
use crate::registry::{CancelHandle, RequestRegistry, RequestToken};

use options::{RequestDefaults, RequestOptions};
use transport::{HyperTransport, Transport};

/// Mutates a request description before it is shaped and sent.
pub type RequestInterceptor = Arc<dyn Fn(&mut RequestOptions) + Send + Sync>;

/// Maps a failed request's error before it reaches the caller. Use
/// [`CourierError::is_cancelled`] to tell explicit cancellation apart
/// from genuine failure.
pub type ErrorInterceptor = Arc<dyn Fn(CourierError) -> CourierError + Send + Sync>;

/// Cancel capability held by the registry for one dispatch. Inert when
/// the request was dispatched with cancellation disabled, so
/// registry-level cancellation (`deregister`, `clear`) can no more
/// reject a non-cancelable request than the per-request entry point
/// can.
struct DispatchHandle {
    handle: CancellationToken,
    cancelable: bool,
}

impl CancelHandle for DispatchHandle {
    fn cancel(&self) {
        if self.cancelable {
            self.handle.cancel();
        }
    }
}

/// A settled response travelling through the response chain.
#[derive(Debug)]
pub struct Exchange {
    pub token: RequestToken,
    pub method: Method,
    pub url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// The request-wrapping client.
pub struct Courier {
    transport: Arc<dyn Transport>,
    registry: Arc<RequestRegistry>,
    response_chain: Arc<Chain<Exchange>>,
    request_interceptor: Option<RequestInterceptor>,
    error_interceptor: Option<ErrorInterceptor>,
    defaults: RequestDefaults,
}

impl Default for Courier {
    fn default() -> Self {
        Self::new()
    }
}

impl Courier {
    /// A courier over the default hyper transport with empty defaults
    /// and no interceptors.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    #[must_use]
    pub fn builder() -> CourierBuilder {
        CourierBuilder::default()
    }

    /// The shared response chain. Register middleware with
    /// [`Chain::use_handler`] / [`Chain::use_fn`]; every response of
    /// every request runs through it before the caller sees the result.
    #[must_use]
    pub fn response_chain(&self) -> &Chain<Exchange> {
        &self.response_chain
    }

    /// The live registry of in-flight requests.
    #[must_use]
    pub fn registry(&self) -> &RequestRegistry {
        &self.registry
    }

    /// Cancel every outstanding request at once.
    pub fn cancel_all(&self) {
        self.registry.clear();
    }

    /// Issue a request. Returns an [`InFlight`] that resolves once the
    /// transport has settled and, on success, the response chain has
    /// completed.
    ///
    /// Shaping failures (bad URL, unencodable body) surface here, before
    /// anything is registered or sent. The request itself runs on a
    /// spawned task, so it proceeds whether or not the returned handle
    /// is awaited.
    pub fn dispatch(&self, mut opts: RequestOptions) -> Result<InFlight, CourierError> {
        if let Some(ref intercept) = self.request_interceptor {
            intercept(&mut opts);
        }
        let cancelable = opts.cancelable.unwrap_or(self.defaults.cancelable);
        let shaped = shape::shape(&opts, &self.defaults)?;

        let token = RequestToken::new();
        let handle = CancellationToken::new();
        self.registry.register(
            token,
            Arc::new(DispatchHandle {
                handle: handle.clone(),
                cancelable,
            }),
        );
        tracing::debug!(
            token = %token,
            method = %opts.method,
            url = %shaped.url,
            "request dispatched"
        );

        let transport = Arc::clone(&self.transport);
        let registry = Arc::clone(&self.registry);
        let chain = Arc::clone(&self.response_chain);
        let error_interceptor = self.error_interceptor.clone();
        let cancelled = handle.clone();
        let method = opts.method;
        let url = shaped.url;
        let request = shaped.request;

        let task = tokio::spawn(async move {
            // Biased so cancellation always wins the race: a response
            // arriving for an already-cancelled request is discarded
            // rather than handed to the chain.
            let settled = tokio::select! {
                biased;
                () = cancelled.cancelled() => Err(CourierError::Cancelled { token }),
                result = transport.send(request) => result,
            };
            // Bookkeeping happens in the same continuation that observes
            // settlement, before any other registry operation can
            // interleave on this token.
            registry.deregister(&token);

            match settled {
                Ok(parts) => {
                    tracing::debug!(token = %token, status = %parts.status, "request settled");
                    let exchange = Exchange {
                        token,
                        method,
                        url,
                        status: parts.status,
                        headers: parts.headers,
                        body: parts.body,
                    };
                    Ok(chain.run(exchange).await)
                }
                Err(err) => {
                    if err.is_cancelled() {
                        tracing::info!(token = %token, "request cancelled");
                    } else {
                        tracing::warn!(token = %token, error = %err, "request failed");
                    }
                    Err(match error_interceptor {
                        Some(map) => map(err),
                        None => err,
                    })
                }
            }
        });

        Ok(InFlight {
            token,
            handle,
            cancelable,
            task,
        })
    }
}

/// Builder for [`Courier`]. Interceptors and defaults are fixed here;
/// there is no way to swap them on a live client, so an in-flight
/// request can never observe a half-applied configuration change.
#[derive(Default)]
pub struct CourierBuilder {
    transport: Option<Arc<dyn Transport>>,
    defaults: RequestDefaults,
    request_interceptor: Option<RequestInterceptor>,
    error_interceptor: Option<ErrorInterceptor>,
}

impl CourierBuilder {
    #[must_use]
    pub fn transport(mut self, transport: impl Transport) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    #[must_use]
    pub fn defaults(mut self, defaults: RequestDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Run `intercept` over every request before shaping.
    #[must_use]
    pub fn on_request(
        mut self,
        intercept: impl Fn(&mut RequestOptions) + Send + Sync + 'static,
    ) -> Self {
        self.request_interceptor = Some(Arc::new(intercept));
        self
    }

    /// Map every failed request's error before the caller sees it.
    #[must_use]
    pub fn on_error(
        mut self,
        map: impl Fn(CourierError) -> CourierError + Send + Sync + 'static,
    ) -> Self {
        self.error_interceptor = Some(Arc::new(map));
        self
    }

    #[must_use]
    pub fn build(self) -> Courier {
        Courier {
            transport: self
                .transport
                .unwrap_or_else(|| Arc::new(HyperTransport::new())),
            registry: Arc::new(RequestRegistry::new()),
            response_chain: Arc::new(Chain::new()),
            request_interceptor: self.request_interceptor,
            error_interceptor: self.error_interceptor,
            defaults: self.defaults,
        }
    }
}

/// Handle to one dispatched request.
///
/// Awaiting it yields the post-chain [`Exchange`] or the request's
/// error. Dropping it detaches the request, which still runs to
/// settlement and deregisters itself. [`cancel`](Self::cancel) is the
/// per-request entry point backed by the same handle the registry
/// holds; it is idempotent and a no-op once the request has settled, or
/// always when the request was dispatched with cancellation disabled.
#[derive(Debug)]
pub struct InFlight {
    token: RequestToken,
    handle: CancellationToken,
    cancelable: bool,
    task: JoinHandle<Result<Exchange, CourierError>>,
}

impl InFlight {
    /// The registry key for this request, usable with
    /// [`RequestRegistry::deregister`].
    #[must_use]
    pub const fn token(&self) -> RequestToken {
        self.token
    }

    #[must_use]
    pub const fn is_cancelable(&self) -> bool {
        self.cancelable
    }

    pub fn cancel(&self) {
        if self.cancelable {
            self.handle.cancel();
        }
    }
}

impl Future for InFlight {
    type Output = Result<Exchange, CourierError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.task).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(join_error)) => Poll::Ready(Err(CourierError::TaskFailed {
                reason: join_error.to_string(),
            })),
            Poll::Pending => Poll::Pending,
        }
    }
}
