pub mod apis;
pub mod errors;

pub use apis::text_generation::{GenerationParameters, InferenceOutput, TextGenerationRequest};
pub use errors::InferenceError;

/// Hosted inference endpoint used when no base url is configured.
pub const DEFAULT_INFERENCE_BASE_URL: &str = "https://api-inference.huggingface.co";

/// Upper bound on a single upstream call.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Builds the per-model inference url, e.g.
/// `https://api-inference.huggingface.co/models/microsoft/phi-2`.
pub fn model_endpoint(base_url: &str, model_id: &str) -> String {
    format!("{}/models/{}", base_url.trim_end_matches('/'), model_id)
}
