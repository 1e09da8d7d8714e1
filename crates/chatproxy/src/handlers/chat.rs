use std::sync::Arc;

use http_body::Body;
use hyper::{Request, StatusCode};
use serde::Serialize;
use tracing::{debug, info};

use super::errors::ChatProxyError;
use super::request::parse_chat_request;
use super::response::{json_response, HandlerResponse};
use crate::app_state::AppState;

#[derive(Debug, Serialize)]
struct ChatResponse {
    success: bool,
    response: String,
    model: String,
}

/// POST /api/chat
///
/// Upstream problems are not errors here: the generator always hands back
/// display text, so the reply is a `200` with `success: true` either way.
pub async fn chat<B>(
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

    debug!(
        model_key = ?chat_request.model,
        message_len = chat_request.message.len(),
        "chat request accepted"
    );

    let response = state.generator.generate(&chat_request.message, &model).await;
    info!(model = %model, response_len = response.len(), "chat reply ready");

    let body = serde_json::to_value(ChatResponse {
        success: true,
        response,
        model,
    })
    .map_err(|err| ChatProxyError::Internal(err.to_string()))?;

    Ok(json_response(StatusCode::OK, &body))
}
