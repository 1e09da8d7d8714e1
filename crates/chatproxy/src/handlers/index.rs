use hyper::StatusCode;
use serde::Serialize;
use tera::{Context, Tera};

use super::errors::ChatProxyError;
use super::response::{html_response, HandlerResponse};
use crate::app_state::AppState;

const INDEX_TEMPLATE_NAME: &str = "index.html";
const INDEX_TEMPLATE: &str = include_str!("../../templates/index.html");

#[derive(Serialize)]
struct ModelOption<'a> {
    key: &'a str,
    model: &'a str,
}

/// Compile the embedded page templates.
pub fn load_pages() -> Result<Tera, tera::Error> {
    let mut tera = Tera::default();
    tera.add_raw_template(INDEX_TEMPLATE_NAME, INDEX_TEMPLATE)?;
    Ok(tera)
}

/// GET /
pub fn index(state: &AppState) -> Result<HandlerResponse, ChatProxyError> {
    let models: Vec<ModelOption> = state
        .model_registry
        .iter()
        .map(|(key, model)| ModelOption { key, model })
        .collect();

    let mut context = Context::new();
    context.insert("models", &models);
    context.insert("default_key", state.model_registry.default_key());

    let page = state
        .pages
        .render(INDEX_TEMPLATE_NAME, &context)
        .map_err(|err| ChatProxyError::Internal(format!("failed to render index: {}", err)))?;

    Ok(html_response(StatusCode::OK, page))
}
