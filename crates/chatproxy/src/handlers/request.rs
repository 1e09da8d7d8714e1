use common::consts::REQUEST_ID_HEADER;
use common::model_registry::ModelRegistry;
use http_body::Body;
use http_body_util::BodyExt;
use hyper::Request;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::errors::ChatProxyError;

/// Extract request ID from incoming request headers, or generate a new UUID v4.
pub fn extract_request_id<T>(request: &Request<T>) -> String {
    request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

/// Body of both chat routes.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    /// Model key; `None` means the configured default key. Any JSON value is
    /// accepted here, only strings can match a registered key.
    #[serde(default)]
    pub model: Option<Value>,
}

impl ChatRequest {
    /// Upstream model id for this request. Never fails: a key that is not a
    /// registered string resolves to the default upstream id.
    pub fn resolve_model<'a>(&self, registry: &'a ModelRegistry) -> &'a str {
        match &self.model {
            None => registry.resolve(None),
            Some(Value::String(key)) => registry.resolve(Some(key)),
            Some(other) => {
                debug!(model_key = %other, "non-string model key, using default model");
                registry.default_model()
            }
        }
    }
}

/// Read and validate a chat request. An empty or absent message is rejected
/// before anything is sent upstream; a body that cannot be read or parsed is
/// an internal error.
pub async fn parse_chat_request<B>(request: Request<B>) -> Result<ChatRequest, ChatProxyError>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let body = request
        .into_body()
        .collect()
        .await
        .map_err(|err| {
            ChatProxyError::Internal(format!("failed to read request body: {}", err))
        })?
        .to_bytes();

    let chat_request: ChatRequest = serde_json::from_slice(&body).map_err(|err| {
        warn!(error = %err, "failed to parse chat request");
        ChatProxyError::Internal(format!("failed to parse request body: {}", err))
    })?;

    if chat_request.message.is_empty() {
        debug!("rejecting chat request with empty message");
        return Err(ChatProxyError::EmptyMessage);
    }

    Ok(chat_request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http_body_util::Full;

    fn post(body: &'static str) -> Request<Full<Bytes>> {
        Request::post("/api/chat")
            .body(Full::new(Bytes::from_static(body.as_bytes())))
            .unwrap()
    }

    #[test]
    fn test_request_id_from_header() {
        let request = Request::get("/")
            .header(REQUEST_ID_HEADER, "req-123")
            .body(())
            .unwrap();
        assert_eq!(extract_request_id(&request), "req-123");
    }

    #[test]
    fn test_request_id_generated_when_missing() {
        let request = Request::get("/").body(()).unwrap();
        let id = extract_request_id(&request);
        assert!(uuid::Uuid::parse_str(&id).is_ok());
    }

    #[tokio::test]
    async fn test_model_is_optional() {
        let chat_request = parse_chat_request(post(r#"{"message": "hello"}"#))
            .await
            .unwrap();
        assert_eq!(chat_request.message, "hello");
        assert_eq!(chat_request.model, None);
    }

    #[tokio::test]
    async fn test_empty_and_missing_message_rejected() {
        for body in [r#"{"message": ""}"#, r#"{"model": "phi"}"#, "{}"] {
            let err = parse_chat_request(post(body)).await.unwrap_err();
            assert!(matches!(err, ChatProxyError::EmptyMessage), "body: {body}");
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_internal_error() {
        for body in ["", "not json", "{not json", "null", r#"{"message": 42}"#] {
            let err = parse_chat_request(post(body)).await.unwrap_err();
            assert!(matches!(err, ChatProxyError::Internal(_)), "body: {body}");
            assert_eq!(err.status_code(), hyper::StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[tokio::test]
    async fn test_non_string_model_key_is_accepted() {
        for body in [
            r#"{"message": "hi", "model": 5}"#,
            r#"{"message": "hi", "model": ["phi"]}"#,
            r#"{"message": "hi", "model": {"key": "phi"}}"#,
        ] {
            let chat_request = parse_chat_request(post(body)).await.unwrap();
            assert!(chat_request.model.is_some(), "body: {body}");
        }
    }

    #[test]
    fn test_resolve_model() {
        let registry = ModelRegistry::builtin().with_defaults("phi", "org/fallback");
        let with_model = |model: Option<Value>| ChatRequest {
            message: "hi".to_string(),
            model,
        };

        assert_eq!(with_model(None).resolve_model(&registry), "microsoft/phi-2");
        assert_eq!(
            with_model(Some(Value::from("gemma"))).resolve_model(&registry),
            "google/gemma-7b-it"
        );
        assert_eq!(
            with_model(Some(Value::from("gpt-4"))).resolve_model(&registry),
            "org/fallback"
        );
        assert_eq!(
            with_model(Some(Value::from(5))).resolve_model(&registry),
            "org/fallback"
        );
        assert_eq!(
            with_model(Some(Value::Bool(true))).resolve_model(&registry),
            "org/fallback"
        );
    }
}
