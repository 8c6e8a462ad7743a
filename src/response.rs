//! Response decoding and protocol-mismatch classification.

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, StatusCode, Version};
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{ClientError, Result};

/// Media type the cluster is expected to speak.
pub(crate) const PROTOCOL_MEDIA_TYPE: &str = "application/json";

/// A fully buffered response.
///
/// Buffering happens inside the transport, so the underlying connection is
/// back in the pool before decoding starts, whatever the outcome.
#[derive(Debug)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// Status reason phrase.
    pub reason: String,
    /// HTTP version the server answered with.
    pub version: Version,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body, possibly empty.
    pub body: Bytes,
    /// URL the response came from.
    pub url: Url,
}

impl RawResponse {
    /// Declared content types, in header order.
    pub fn content_types(&self) -> impl Iterator<Item = &str> {
        self.headers
            .get_all(CONTENT_TYPE)
            .iter()
            .filter_map(|value| value.to_str().ok())
    }

    /// Response body as text, lossily.
    pub fn body_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Decode a response body into `T`, classifying decode failures.
pub(crate) fn decode<T: DeserializeOwned>(response: &RawResponse, request_line: &str) -> Result<T> {
    serde_json::from_slice(&response.body)
        .map_err(|source| classify_decode_failure(response, request_line, source))
}

/// A decode failure on a response that never claimed to be json is reported
/// as a protocol mismatch — typically an intercepting proxy answering with
/// an HTML error page. With a json content type declared, or none at all,
/// the failure is genuine corruption and surfaces unchanged.
fn classify_decode_failure(
    response: &RawResponse,
    request_line: &str,
    source: serde_json::Error,
) -> ClientError {
    let declared: Vec<&str> = response.content_types().collect();
    let json_declared = declared
        .iter()
        .any(|media_type| media_type.starts_with(PROTOCOL_MEDIA_TYPE));

    match declared.first() {
        Some(media_type) if !json_declared => ClientError::ProtocolMismatch {
            request: request_line.to_string(),
            media_type: (*media_type).to_string(),
            version: format!("{:?}", response.version),
            status: response.status.as_u16(),
            reason: response.reason.clone(),
        },
        _ => ClientError::Decode(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use serde_json::Value;

    fn response(status: u16, content_type: Option<&str>, body: &str) -> RawResponse {
        let mut headers = HeaderMap::new();
        if let Some(content_type) = content_type {
            headers.append(CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        }
        RawResponse {
            status: StatusCode::from_u16(status).unwrap(),
            reason: StatusCode::from_u16(status)
                .unwrap()
                .canonical_reason()
                .unwrap_or("")
                .to_string(),
            version: Version::HTTP_11,
            headers,
            body: Bytes::copy_from_slice(body.as_bytes()),
            url: Url::parse("http://localhost:9200/_cluster/health").unwrap(),
        }
    }

    #[test]
    fn well_formed_json_decodes() {
        let response = response(200, Some("application/json"), r#"{"status":"green"}"#);
        let value: Value = decode(&response, "GET http://localhost:9200/_cluster/health").unwrap();
        assert_eq!(value["status"], "green");
    }

    #[test]
    fn html_response_is_a_protocol_mismatch() {
        let response = response(502, Some("text/html"), "<html>Bad Gateway</html>");
        let error = decode::<Value>(&response, "GET http://localhost:9200/_cluster/health")
            .unwrap_err();

        match error {
            ClientError::ProtocolMismatch {
                media_type,
                status,
                reason,
                request,
                ..
            } => {
                assert_eq!(media_type, "text/html");
                assert_eq!(status, 502);
                assert_eq!(reason, "Bad Gateway");
                assert!(request.contains("_cluster/health"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn corrupt_json_with_matching_content_type_stays_a_decode_error() {
        let response = response(200, Some("application/json"), r#"{"truncated":"#);
        let error = decode::<Value>(&response, "GET http://localhost:9200/x").unwrap_err();
        assert!(matches!(error, ClientError::Decode(_)));
    }

    #[test]
    fn charset_suffix_still_counts_as_json() {
        let response = response(200, Some("application/json; charset=UTF-8"), "not json");
        let error = decode::<Value>(&response, "GET http://localhost:9200/x").unwrap_err();
        assert!(matches!(error, ClientError::Decode(_)));
    }

    #[test]
    fn missing_content_type_stays_a_decode_error() {
        let response = response(200, None, "not json");
        let error = decode::<Value>(&response, "GET http://localhost:9200/x").unwrap_err();
        assert!(matches!(error, ClientError::Decode(_)));
    }
}
