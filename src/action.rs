//! Logical actions submitted to the cluster.

use std::marker::PhantomData;

use serde_json::Value;

use crate::error::Result;

/// Request payload.
///
/// `Json` is rendered through the codec; `Raw` is a caller-serialized
/// document passed through byte-for-byte, which keeps numeric literals
/// exactly as written, however large.
#[derive(Debug, Clone)]
pub enum Body {
    /// A JSON document serialized at request-preparation time.
    Json(Value),
    /// A pre-serialized payload, forwarded verbatim.
    Raw(String),
}

impl Body {
    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>> {
        match self {
            Body::Json(value) => Ok(serde_json::to_vec(value)?),
            Body::Raw(payload) => Ok(payload.as_bytes().to_vec()),
        }
    }
}

/// A caller's abstract request: operation, target and payload, independent
/// of transport details. `T` is the type the response decodes into and
/// defaults to [`serde_json::Value`]; use [`typed`](Self::typed) to bind a
/// concrete one.
#[derive(Debug, Clone)]
pub struct Action<T = Value> {
    method: String,
    uri: String,
    body: Option<Body>,
    headers: Vec<(String, String)>,
    _output: PhantomData<fn() -> T>,
}

impl Action<Value> {
    /// Create an action with a free-form method name and a URI relative to
    /// a pool base URL.
    pub fn new(method: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            uri: uri.into(),
            body: None,
            headers: Vec::new(),
            _output: PhantomData,
        }
    }

    /// GET action.
    pub fn get(uri: impl Into<String>) -> Self {
        Self::new("GET", uri)
    }

    /// POST action.
    pub fn post(uri: impl Into<String>) -> Self {
        Self::new("POST", uri)
    }

    /// PUT action.
    pub fn put(uri: impl Into<String>) -> Self {
        Self::new("PUT", uri)
    }

    /// DELETE action.
    pub fn delete(uri: impl Into<String>) -> Self {
        Self::new("DELETE", uri)
    }

    /// HEAD action.
    pub fn head(uri: impl Into<String>) -> Self {
        Self::new("HEAD", uri)
    }
}

impl<T> Action<T> {
    /// Set a JSON body.
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(Body::Json(body));
        self
    }

    /// Set a pre-serialized body, forwarded without re-encoding.
    pub fn raw_body(mut self, payload: impl Into<String>) -> Self {
        self.body = Some(Body::Raw(payload.into()));
        self
    }

    /// Add a per-request header. Repeated names are kept and each becomes
    /// its own header line on the wire.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Rebind the decode target.
    pub fn typed<U>(self) -> Action<U> {
        Action {
            method: self.method,
            uri: self.uri,
            body: self.body,
            headers: self.headers,
            _output: PhantomData,
        }
    }

    /// Method name as supplied by the caller.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// URI suffix relative to a pool base URL.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Request payload, if any.
    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    /// Per-request headers in insertion order.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn get_action_has_no_body() {
        let action = Action::get("_cluster/health");
        assert_eq!(action.method(), "GET");
        assert_eq!(action.uri(), "_cluster/health");
        assert!(action.body().is_none());
    }

    #[test]
    fn json_body_renders_through_codec() {
        let action = Action::post("twitter/_search").json(json!({"query": {"match_all": {}}}));
        let body = action.body().unwrap().to_bytes().unwrap();
        assert_eq!(body, br#"{"query":{"match_all":{}}}"#);
    }

    #[test]
    fn raw_body_is_forwarded_verbatim() {
        let payload = r#"{"term":{"id":567800000000000000000}}"#;
        let action = Action::post("twitter/_search").raw_body(payload);
        let body = action.body().unwrap().to_bytes().unwrap();
        assert_eq!(body, payload.as_bytes());
    }

    #[test]
    fn duplicate_headers_are_kept_in_order() {
        let action = Action::get("_stats")
            .header("x-tag", "a")
            .header("x-tag", "b");
        assert_eq!(
            action.headers(),
            &[
                ("x-tag".to_string(), "a".to_string()),
                ("x-tag".to_string(), "b".to_string()),
            ]
        );
    }

    #[test]
    fn typed_rebind_keeps_the_request_shape() {
        #[derive(serde::Deserialize)]
        struct Health {}

        let action = Action::get("_cluster/health").header("x-a", "1").typed::<Health>();
        assert_eq!(action.method(), "GET");
        assert_eq!(action.uri(), "_cluster/health");
        assert_eq!(action.headers().len(), 1);
    }
}
