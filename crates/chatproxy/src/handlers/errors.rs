use std::any::Any;

use hyper::StatusCode;
use serde_json::json;
use thiserror::Error;

use super::response::{json_response, HandlerResponse};

#[derive(Debug, Error)]
pub enum ChatProxyError {
    #[error("Message must not be empty")]
    EmptyMessage,

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ChatProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ChatProxyError::EmptyMessage => StatusCode::BAD_REQUEST,
            ChatProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// `{"success": false, "error": "..."}` with the matching status.
    pub fn into_response(self) -> HandlerResponse {
        json_response(
            self.status_code(),
            &json!({
                "success": false,
                "error": self.to_string(),
            }),
        )
    }
}

/// Best-effort text for a caught panic payload.
pub fn describe_panic(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "request handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ChatProxyError::EmptyMessage.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ChatProxyError::Internal("boom".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_describe_panic() {
        let payload: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(describe_panic(payload.as_ref()), "static message");

        let payload: Box<dyn Any + Send> = Box::new(format!("formatted {}", 42));
        assert_eq!(describe_panic(payload.as_ref()), "formatted 42");

        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(describe_panic(payload.as_ref()), "request handler panicked");
    }
}
