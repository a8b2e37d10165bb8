//! Request shaping: body encoding and default-parameter injection.
//!
//! Turns a [`RequestOptions`] plus the client's [`RequestDefaults`] into
//! a concrete `http::Request`. The body variant picks the encoder (JSON
//! via `serde_json`, forms via `serde_urlencoded`) and default params
//! are injected where the request can carry them: the query string for
//! bodyless requests, the top-level object for JSON bodies, the field
//! list for form bodies. Defaults win over per-request values of the
//! same name. Percent-encoding itself is owned by the `url` crate.

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http_body_util::Full;
use serde_json::{Map, Value};
use url::Url;

use crate::error::CourierError;

use super::options::{RequestBody, RequestDefaults, RequestOptions};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// A shaped request ready for the transport, with the resolved URL kept
/// alongside for the response exchange.
#[derive(Debug)]
pub struct ShapedRequest {
    pub request: http::Request<Full<Bytes>>,
    pub url: Url,
}

pub fn shape(
    opts: &RequestOptions,
    defaults: &RequestDefaults,
) -> Result<ShapedRequest, CourierError> {
    let mut url = Url::parse(&opts.url).map_err(|source| CourierError::InvalidUrl {
        url: opts.url.clone(),
        source,
    })?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(CourierError::UnsupportedScheme {
                scheme: other.to_string(),
            })
        }
    }

    let inject_into_query = matches!(opts.body, RequestBody::Empty);
    apply_query(&mut url, &opts.query, defaults, inject_into_query);

    let (body, default_content_type) = encode_body(&opts.body, defaults)?;

    let mut builder = http::Request::builder()
        .method(opts.method.clone())
        .uri(url.as_str());
    for (name, value) in &opts.headers {
        builder = builder.header(name, value);
    }
    if let Some(content_type) = default_content_type {
        if !opts.headers.contains_key(CONTENT_TYPE) {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
    }

    let request = builder
        .body(Full::new(body))
        .map_err(|source| CourierError::RequestBuild { source })?;

    Ok(ShapedRequest { request, url })
}

/// Append explicit query params, then the defaults when the request is
/// bodyless. Defaults replace same-named pairs.
fn apply_query(
    url: &mut Url,
    query: &[(String, String)],
    defaults: &RequestDefaults,
    inject: bool,
) {
    if query.is_empty() && (!inject || defaults.params.is_empty()) {
        return;
    }

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    pairs.extend(query.iter().cloned());

    if inject {
        for (name, value) in &defaults.params {
            pairs.retain(|(existing, _)| existing != name);
            pairs.push((name.clone(), param_text(value)));
        }
    }

    url.set_query(None);
    if !pairs.is_empty() {
        url.query_pairs_mut().extend_pairs(pairs);
    }
}

fn encode_body(
    body: &RequestBody,
    defaults: &RequestDefaults,
) -> Result<(Bytes, Option<HeaderValue>), CourierError> {
    match body {
        RequestBody::Empty => Ok((Bytes::new(), None)),
        RequestBody::Json(value) => {
            let merged = merge_json_defaults(value, &defaults.params);
            let encoded = serde_json::to_vec(&merged)
                .map_err(|source| CourierError::BodyEncode { source })?;
            let content_type = HeaderValue::from_str(&defaults.json_content_type)
                .unwrap_or_else(|_| HeaderValue::from_static("application/json"));
            Ok((Bytes::from(encoded), Some(content_type)))
        }
        RequestBody::Form(fields) => {
            let mut merged: Vec<(String, String)> = fields.clone();
            for (name, value) in &defaults.params {
                merged.retain(|(existing, _)| existing != name);
                merged.push((name.clone(), param_text(value)));
            }
            let encoded = serde_urlencoded::to_string(&merged)
                .map_err(|source| CourierError::FormEncode { source })?;
            Ok((
                Bytes::from(encoded),
                Some(HeaderValue::from_static(FORM_CONTENT_TYPE)),
            ))
        }
        RequestBody::Raw(bytes) => Ok((bytes.clone(), None)),
    }
}

/// Merge default params into a top-level JSON object, defaults winning.
/// Non-object bodies pass through untouched.
fn merge_json_defaults(value: &Value, params: &Map<String, Value>) -> Value {
    match value {
        Value::Object(fields) if !params.is_empty() => {
            let mut merged = fields.clone();
            for (name, default) in params {
                merged.insert(name.clone(), default.clone());
            }
            Value::Object(merged)
        }
        other => other.clone(),
    }
}

fn param_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
