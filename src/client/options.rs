//! Request description and per-client defaults.
//!
//! [`RequestOptions`] is the caller-facing description of one request;
//! [`RequestDefaults`] holds the construction-time defaults a
//! [`Courier`](crate::client::Courier) injects into every request it
//! dispatches. Defaults derive serde so they can be loaded from
//! whatever configuration surface embeds this crate.

use http::{HeaderMap, Method};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of an outgoing request, by encoding.
///
/// The variant decides the encoder: JSON bodies go through
/// `serde_json`, form bodies through `serde_urlencoded`, raw bodies are
/// sent as-is. Bodyless requests use [`RequestBody::Empty`].
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Form(Vec<(String, String)>),
    Raw(bytes::Bytes),
}

/// Description of a single request handed to
/// [`Courier::dispatch`](crate::client::Courier::dispatch).
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    /// Explicit query parameters, appended to any query already present
    /// in `url`.
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
    /// Overrides [`RequestDefaults::cancelable`] when set. A request
    /// with cancellation disabled ignores its handle's `cancel()`.
    pub cancelable: Option<bool>,
}

impl RequestOptions {
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: RequestBody::Empty,
            cancelable: None,
        }
    }

    #[must_use]
    pub fn header(mut self, name: http::header::HeaderName, value: http::HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    #[must_use]
    pub fn form(mut self, fields: Vec<(String, String)>) -> Self {
        self.body = RequestBody::Form(fields);
        self
    }

    #[must_use]
    pub fn raw(mut self, body: bytes::Bytes) -> Self {
        self.body = RequestBody::Raw(body);
        self
    }

    #[must_use]
    pub fn cancelable(mut self, cancelable: bool) -> Self {
        self.cancelable = Some(cancelable);
        self
    }
}

const fn default_true() -> bool {
    true
}

fn default_json_content_type() -> String {
    "application/json;charset=UTF-8".to_string()
}

/// Defaults injected into every dispatched request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestDefaults {
    /// Parameters merged into every request: into the query string for
    /// bodyless requests, into the top-level object for JSON bodies,
    /// into the field list for form bodies. Defaults win over
    /// per-request values of the same name.
    #[serde(default)]
    pub params: Map<String, Value>,

    /// Whether requests are cancellable unless they say otherwise.
    #[serde(default = "default_true")]
    pub cancelable: bool,

    /// `content-type` applied to JSON bodies that set none themselves.
    #[serde(default = "default_json_content_type")]
    pub json_content_type: String,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            params: Map::new(),
            cancelable: true,
            json_content_type: default_json_content_type(),
        }
    }
}
