use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const GENERATED_TEXT_FIELD: &str = "generated_text";
pub const SUMMARY_TEXT_FIELD: &str = "summary_text";
pub const ERROR_FIELD: &str = "error";

pub const MODEL_LOADING_MESSAGE: &str =
    "The model is loading, please try again in a few seconds...";

/// Sampling settings sent with every text-generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParameters {
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub do_sample: bool,
    /// When false the upstream strips the prompt from the generated text.
    pub return_full_text: bool,
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            max_new_tokens: 512,
            temperature: 0.7,
            top_p: 0.95,
            do_sample: true,
            return_full_text: false,
        }
    }
}

/// Body of `POST /models/{model_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextGenerationRequest {
    pub inputs: String,
    pub parameters: GenerationParameters,
}

impl TextGenerationRequest {
    pub fn new(inputs: impl Into<String>) -> Self {
        Self {
            inputs: inputs.into(),
            parameters: GenerationParameters::default(),
        }
    }
}

/// The upstream answers in a handful of shapes depending on the task the
/// model is deployed for. This is the normalized view of a successful
/// (2xx, valid JSON) reply.
#[derive(Debug, Clone, PartialEq)]
pub enum InferenceOutput {
    Generated(String),
    Summary(String),
    ModelLoading,
    ApiError(String),
    /// Anything we do not recognize, kept as its JSON text.
    Unrecognized(String),
}

impl InferenceOutput {
    /// Shape checks, first match wins:
    /// `[{"generated_text"}]`, `[{"summary_text"}]`, `{"generated_text"}`,
    /// `{"error"}`, then the raw body.
    pub fn from_value(body: &Value) -> Self {
        match body {
            Value::Array(items) => {
                if let Some(Value::Object(first)) = items.first() {
                    if let Some(text) = first.get(GENERATED_TEXT_FIELD) {
                        return InferenceOutput::Generated(field_text(text));
                    }
                    if let Some(text) = first.get(SUMMARY_TEXT_FIELD) {
                        return InferenceOutput::Summary(field_text(text));
                    }
                }
            }
            Value::Object(map) => {
                if let Some(text) = map.get(GENERATED_TEXT_FIELD) {
                    return InferenceOutput::Generated(field_text(text));
                }
                if let Some(error) = map.get(ERROR_FIELD) {
                    let error = field_text(error);
                    if error.to_lowercase().contains("loading") {
                        log::debug!("upstream model is still loading: {}", error);
                        return InferenceOutput::ModelLoading;
                    }
                    return InferenceOutput::ApiError(error);
                }
            }
            _ => {}
        }

        log::warn!("unrecognized inference response shape: {}", body);
        InferenceOutput::Unrecognized(body.to_string())
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let body: Value = serde_json::from_slice(bytes)?;
        Ok(Self::from_value(&body))
    }
}

impl fmt::Display for InferenceOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferenceOutput::Generated(text) | InferenceOutput::Summary(text) => f.write_str(text),
            InferenceOutput::ModelLoading => f.write_str(MODEL_LOADING_MESSAGE),
            InferenceOutput::ApiError(error) => write!(f, "API error: {}", error),
            InferenceOutput::Unrecognized(raw) => f.write_str(raw),
        }
    }
}

impl From<InferenceOutput> for String {
    fn from(output: InferenceOutput) -> Self {
        match output {
            InferenceOutput::Generated(text)
            | InferenceOutput::Summary(text)
            | InferenceOutput::Unrecognized(text) => text,
            other => other.to_string(),
        }
    }
}

fn field_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
