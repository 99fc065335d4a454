//! Call options for the generic request executor.

use reqwest::{Method, StatusCode};
use serde_json::Value;
use url::form_urlencoded;

/// Which normalizer the executor applies to JSON bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseParser {
    /// The playable-item normalizer ([`crate::parser::parse_response`]).
    Tracks,
    /// No normalization; the body is returned as-is.
    Raw,
}

/// A query parameter value; arrays are comma-joined before encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    One(String),
    Many(Vec<String>),
}

impl QueryValue {
    fn render(&self) -> String {
        match self {
            QueryValue::One(v) => v.clone(),
            QueryValue::Many(vs) => vs.join(","),
        }
    }
}

impl From<&str> for QueryValue {
    fn from(v: &str) -> Self {
        QueryValue::One(v.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(v: String) -> Self {
        QueryValue::One(v)
    }
}

impl From<u64> for QueryValue {
    fn from(v: u64) -> Self {
        QueryValue::One(v.to_string())
    }
}

impl From<bool> for QueryValue {
    fn from(v: bool) -> Self {
        QueryValue::One(v.to_string())
    }
}

impl From<Vec<String>> for QueryValue {
    fn from(vs: Vec<String>) -> Self {
        QueryValue::Many(vs)
    }
}

impl From<Vec<&str>> for QueryValue {
    fn from(vs: Vec<&str>) -> Self {
        QueryValue::Many(vs.into_iter().map(str::to_string).collect())
    }
}

/// Outcome of an executed request.
///
/// Endpoints that legitimately answer with an empty (or otherwise
/// non-JSON) body yield the raw status code; that is a success path,
/// not an error.
#[derive(Debug, Clone)]
pub enum ApiResponse {
    Json(Value),
    Status(StatusCode),
}

impl ApiResponse {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ApiResponse::Json(v) => Some(v),
            ApiResponse::Status(_) => None,
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            ApiResponse::Json(v) => Some(v),
            ApiResponse::Status(_) => None,
        }
    }
}

/// High-level call options mapped onto one HTTP request.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Spotify URL/URI whose resolved endpoint gets prepended to
    /// [`RequestOptions::endpoint`].
    pub url: Option<String>,
    /// REST path relative to the API base, e.g. `/me/player/queue`.
    pub endpoint: String,
    pub method: Method,
    /// Keys with a `None` value are omitted entirely, never serialized
    /// as empty strings.
    pub query: Vec<(String, Option<QueryValue>)>,
    pub headers: Vec<(String, String)>,
    /// Serialized as the JSON request payload when present.
    pub body: Option<Value>,
    /// Per-call override of the client's configured parser.
    pub parser: Option<ResponseParser>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        RequestOptions {
            url: None,
            endpoint: String::new(),
            method: Method::GET,
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            parser: None,
        }
    }
}

impl RequestOptions {
    pub fn endpoint(endpoint: impl Into<String>) -> RequestOptions {
        RequestOptions {
            endpoint: endpoint.into(),
            ..RequestOptions::default()
        }
    }

    pub fn url(url: impl Into<String>) -> RequestOptions {
        RequestOptions {
            url: Some(url.into()),
            ..RequestOptions::default()
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.query.push((key.into(), Some(value.into())));
        self
    }

    /// Adds a parameter that is dropped from the query string when absent.
    pub fn query_opt(
        mut self,
        key: impl Into<String>,
        value: Option<impl Into<QueryValue>>,
    ) -> Self {
        self.query.push((key.into(), value.map(Into::into)));
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Skip response normalization for this call.
    pub fn raw(mut self) -> Self {
        self.parser = Some(ResponseParser::Raw);
        self
    }
}

/// Builds an encoded query string, omitting absent values.
pub(crate) fn build_query(pairs: &[(String, Option<QueryValue>)]) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        if let Some(value) = value {
            serializer.append_pair(key, &value.render());
        }
    }
    serializer.finish()
}
