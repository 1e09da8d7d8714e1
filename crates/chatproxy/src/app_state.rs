use std::sync::Arc;

use common::model_registry::ModelRegistry;
use tera::Tera;

use crate::upstream::TextGenerator;

/// Everything the handlers need, built once at start-up and shared
/// read-only across connections as a single `Arc<AppState>`.
pub struct AppState {
    pub model_registry: ModelRegistry,
    pub generator: Arc<dyn TextGenerator>,
    /// Server-rendered pages.
    pub pages: Tera,
}
