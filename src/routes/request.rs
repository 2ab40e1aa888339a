//! Request object handed to endpoint handlers.

use crate::error::ApiError;
use axum::body::Bytes;
use axum::extract::{Query, RawPathParams};
use axum::http::{Extensions, HeaderMap, Method, Uri};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug)]
pub struct ApiRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    /// Values left by middlewares (e.g. an authenticated identity).
    pub extensions: Extensions,
    pub path_params: HashMap<String, String>,
    /// Query pairs in request order.
    pub query: Vec<(String, String)>,
    /// Parsed JSON body; `None` when the body is empty.
    pub body: Option<Value>,
}

impl ApiRequest {
    pub(crate) fn from_parts(
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        extensions: Extensions,
        params: Option<RawPathParams>,
        body: Bytes,
    ) -> Result<Self, ApiError> {
        let path_params = params
            .map(|p| p.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
            .unwrap_or_default();
        let query = Query::<Vec<(String, String)>>::try_from_uri(&uri)
            .map(|Query(q)| q)
            .unwrap_or_default();
        let body = if body.iter().all(u8::is_ascii_whitespace) {
            None
        } else {
            let v = serde_json::from_slice(&body)
                .map_err(|_| ApiError::InvalidBody(vec!["malformed JSON body".into()]))?;
            Some(v)
        };
        Ok(ApiRequest {
            method,
            uri,
            headers,
            extensions,
            path_params,
            query,
            body,
        })
    }

    /// Plain request for tests and direct handler calls.
    pub fn new(method: Method, uri: Uri) -> Self {
        let query = Query::<Vec<(String, String)>>::try_from_uri(&uri)
            .map(|Query(q)| q)
            .unwrap_or_default();
        ApiRequest {
            method,
            uri,
            headers: HeaderMap::new(),
            extensions: Extensions::new(),
            path_params: HashMap::new(),
            query,
            body: None,
        }
    }

    pub fn with_path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }

    /// First value of a query key.
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}
