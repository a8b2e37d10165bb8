//! Courier is a request-wrapping layer over a generic HTTP client.
//!
//! It adds three things to a plain transport: per-request cancellation
//! tracked in a shared registry, a sequential async middleware chain
//! that post-processes every response before the caller's future
//! resolves, and normalized request shaping (content-type-aware body
//! encoding, default parameter injection). The transport itself —
//! connections, TLS, socket-level retries — stays behind the
//! [`Transport`](client::transport::Transport) seam.
//!
//! # Architecture
//!
//! - [`chain`] -- Sequential async middleware chain; each handler
//!   decides whether a run continues or completes early.
//! - [`registry`] -- Live token → cancel-handle mapping for all
//!   in-flight requests; single-request and cancel-everything paths.
//! - [`client`] -- Orchestration glue composing the two around a
//!   [`Transport`](client::transport::Transport): shaping, dispatch,
//!   settlement bookkeeping, response-chain completion.
//! - [`error`] -- Unified error types using `thiserror`.
//!
//! # Example
//!
//! ```no_run
//! use courier::client::options::RequestOptions;
//! use courier::chain::Flow;
//! use courier::Courier;
//! use http::Method;
//!
//! # async fn demo() -> Result<(), courier::CourierError> {
//! let courier = Courier::new();
//!
//! // Every response passes through the shared chain.
//! courier.response_chain().use_fn(|exchange| async move {
//!     tracing::info!(status = %exchange.status, "response observed");
//!     Flow::Continue(exchange)
//! });
//!
//! let in_flight = courier.dispatch(RequestOptions::new(
//!     Method::GET,
//!     "https://example.org/items",
//! ))?;
//! // in_flight.cancel() would abandon it; awaiting resolves it.
//! let exchange = in_flight.await?;
//! assert!(exchange.status.is_success());
//! # Ok(())
//! # }
//! ```

#![allow(clippy::missing_errors_doc)]

pub mod chain;
pub mod client;
pub mod error;
pub mod registry;

pub use chain::{Chain, Flow, Handler};
pub use client::{Courier, CourierBuilder, Exchange, InFlight};
pub use error::CourierError;
pub use registry::{CancelHandle, RequestRegistry, RequestToken};
