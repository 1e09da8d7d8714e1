use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use http_body::{Body, Frame};
use hyper::Request;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn, Instrument};

use super::errors::{describe_panic, ChatProxyError};
use super::request::parse_chat_request;
use super::response::{sse_event, sse_response, HandlerResponse};
use crate::app_state::AppState;

/// Payload of the single event sent on the stream route.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum StreamEvent {
    Chunk(String),
    Error(String),
}

/// POST /api/chat/stream
///
/// Same validation as the plain chat route. The upstream call is not itself
/// streamed, so the body carries exactly one event once the full reply is in:
/// `data: {"chunk": ...}` or, if generation blew up, `data: {"error": ...}`.
pub async fn chat_stream<B>(
    request: Request<B>,
    state: Arc<AppState>,
) -> Result<HandlerResponse, ChatProxyError>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let chat_request = parse_chat_request(request).await?;
    let model = chat_request
        .resolve_model(&state.model_registry)
        .to_string();
    tracing::Span::current().record("llm.model", model.as_str());

    let (tx, rx) = mpsc::channel(1);
    let generator = Arc::clone(&state.generator);
    let message = chat_request.message;

    tokio::spawn(
        async move {
            let event = match AssertUnwindSafe(generator.generate(&message, &model))
                .catch_unwind()
                .await
            {
                Ok(text) => StreamEvent::Chunk(text),
                Err(panic) => {
                    let reason = describe_panic(panic.as_ref());
                    warn!(model = %model, reason = %reason, "generation task panicked");
                    StreamEvent::Error(reason)
                }
            };

            if tx.send(Ok(Frame::data(sse_event(&event)))).await.is_err() {
                debug!("client disconnected before the reply was ready");
            }
        }
        .in_current_span(),
    );

    Ok(sse_response(rx))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_payload_shape() {
        assert_eq!(
            serde_json::to_value(StreamEvent::Chunk("hi".to_string())).unwrap(),
            serde_json::json!({ "chunk": "hi" })
        );
        assert_eq!(
            serde_json::to_value(StreamEvent::Error("boom".to_string())).unwrap(),
            serde_json::json!({ "error": "boom" })
        );
    }
}
