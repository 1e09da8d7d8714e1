pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub const INDEX_PATH: &str = "/";
pub const MODELS_PATH: &str = "/api/models";
pub const CHAT_PATH: &str = "/api/chat";
pub const CHAT_STREAM_PATH: &str = "/api/chat/stream";

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:5000";
pub const DEFAULT_MODEL_KEY: &str = "mistral";
pub const DEFAULT_MODEL_ID: &str = "mistralai/Mistral-7B-Instruct-v0.2";

pub const CONFIG_PATH_ENV: &str = "CHATPROXY_CONFIG";
pub const API_KEY_ENV: &str = "HUGGINGFACE_API_KEY";
pub const BIND_ADDRESS_ENV: &str = "BIND_ADDRESS";
pub const INFERENCE_API_URL_ENV: &str = "INFERENCE_API_URL";
