use hyper::StatusCode;
use serde_json::json;

use super::response::{json_response, HandlerResponse};
use crate::app_state::AppState;

/// GET /api/models
pub fn list_models(state: &AppState) -> HandlerResponse {
    json_response(
        StatusCode::OK,
        &json!({ "models": state.model_registry.to_json() }),
    )
}
