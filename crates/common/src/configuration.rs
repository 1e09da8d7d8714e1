use crate::consts::{
    API_KEY_ENV, BIND_ADDRESS_ENV, DEFAULT_BIND_ADDRESS, DEFAULT_MODEL_ID, DEFAULT_MODEL_KEY,
    INFERENCE_API_URL_ENV,
};
use crate::model_registry::{ModelEntry, ModelRegistry, ModelRegistryError};
use duration_string::DurationString;
use hfinference::{DEFAULT_INFERENCE_BASE_URL, DEFAULT_REQUEST_TIMEOUT_SECS};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Process-wide settings. Built once at start-up and never mutated after.
///
/// Every field is optional in the YAML file; anything left out keeps the
/// built-in default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub listener: Listener,
    pub inference: InferenceSettings,
    pub default_model: Option<String>,
    pub default_model_key: Option<String>,
    pub models: Option<Vec<ModelEntry>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Listener {
    pub address: String,
}

impl Default for Listener {
    fn default() -> Self {
        Self {
            address: DEFAULT_BIND_ADDRESS.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InferenceSettings {
    pub base_url: String,
    pub request_timeout: DurationString,
    /// Bearer credential for the inference API. Usually supplied through the
    /// environment instead of the file.
    pub access_key: Option<String>,
}

impl Default for InferenceSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_INFERENCE_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS).into(),
            access_key: None,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigurationError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error(transparent)]
    Registry(#[from] ModelRegistryError),
}

impl Configuration {
    /// Load from `path` when given, otherwise start from defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigurationError> {
        let Some(path) = path else {
            log::info!("no configuration file given, using built-in defaults");
            return Ok(Configuration::default());
        };

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigurationError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_yaml::from_str(&contents).map_err(|source| ConfigurationError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Environment wins over the file. An empty credential counts as absent.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            self.inference.access_key = Some(key);
        }
        if let Ok(address) = std::env::var(BIND_ADDRESS_ENV) {
            self.listener.address = address;
        }
        if let Ok(url) = std::env::var(INFERENCE_API_URL_ENV) {
            self.inference.base_url = url;
        }

        if self
            .inference
            .access_key
            .as_deref()
            .is_some_and(str::is_empty)
        {
            self.inference.access_key = None;
        }
    }

    pub fn access_key(&self) -> Option<&str> {
        self.inference.access_key.as_deref()
    }

    pub fn request_timeout(&self) -> Duration {
        self.inference.request_timeout.into()
    }

    pub fn model_registry(&self) -> Result<ModelRegistry, ConfigurationError> {
        let registry = match &self.models {
            Some(models) => ModelRegistry::try_from(models.clone())?,
            None => ModelRegistry::builtin(),
        };

        Ok(registry.with_defaults(
            self.default_model_key
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL_KEY.to_string()),
            self.default_model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL_ID.to_string()),
        ))
    }
}
