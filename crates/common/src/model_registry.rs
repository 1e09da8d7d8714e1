use crate::consts::{DEFAULT_MODEL_ID, DEFAULT_MODEL_KEY};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// One selectable model: a short user-facing key and the fully qualified
/// upstream model id it stands for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub key: String,
    pub model: String,
}

impl ModelEntry {
    pub fn new(key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            model: model.into(),
        }
    }
}

pub fn builtin_models() -> Vec<ModelEntry> {
    vec![
        ModelEntry::new("mistral", "mistralai/Mistral-7B-Instruct-v0.2"),
        ModelEntry::new("llama", "meta-llama/Llama-2-7b-chat-hf"),
        ModelEntry::new("falcon", "tiiuae/falcon-7b-instruct"),
        ModelEntry::new("phi", "microsoft/phi-2"),
        ModelEntry::new("gemma", "google/gemma-7b-it"),
    ]
}

/// Immutable key -> upstream id table.
///
/// Lookups never fail: an unknown key resolves to the default upstream id.
/// Entries keep their configured order so listings are stable.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    entries: Vec<ModelEntry>,
    index: HashMap<String, usize>,
    default_key: String,
    default_model: String,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ModelRegistry {
    pub fn builtin() -> Self {
        let entries = builtin_models();
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (entry.key.clone(), i))
            .collect();

        ModelRegistry {
            entries,
            index,
            default_key: DEFAULT_MODEL_KEY.to_string(),
            default_model: DEFAULT_MODEL_ID.to_string(),
        }
    }

    /// Replace the key used when a request names no model and the id used
    /// when it names an unknown one.
    pub fn with_defaults(
        mut self,
        default_key: impl Into<String>,
        default_model: impl Into<String>,
    ) -> Self {
        self.default_key = default_key.into();
        self.default_model = default_model.into();
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|entry| (entry.key.as_str(), entry.model.as_str()))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.index
            .get(key)
            .map(|&i| self.entries[i].model.as_str())
    }

    pub fn resolve(&self, key: Option<&str>) -> &str {
        let key = key.unwrap_or(self.default_key.as_str());
        match self.get(key) {
            Some(model) => model,
            None => {
                log::debug!(
                    "model key '{}' not registered, using default '{}'",
                    key,
                    self.default_model
                );
                &self.default_model
            }
        }
    }

    pub fn default_key(&self) -> &str {
        &self.default_key
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `{key: upstream_id, ...}` in registry order.
    pub fn to_json(&self) -> Value {
        let models: Map<String, Value> = self
            .iter()
            .map(|(key, model)| (key.to_string(), Value::String(model.to_string())))
            .collect();
        Value::Object(models)
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ModelRegistryError {
    #[error("There must be at least one model")]
    EmptySource,
    #[error("\'{0}\' is not a unique model key")]
    DuplicateKey(String),
    #[error("model key \'{0}\' has an empty upstream id")]
    EmptyModel(String),
}

impl TryFrom<Vec<ModelEntry>> for ModelRegistry {
    type Error = ModelRegistryError;

    fn try_from(models: Vec<ModelEntry>) -> Result<Self, Self::Error> {
        if models.is_empty() {
            return Err(ModelRegistryError::EmptySource);
        }

        let mut index = HashMap::with_capacity(models.len());
        for (i, entry) in models.iter().enumerate() {
            if entry.model.trim().is_empty() {
                return Err(ModelRegistryError::EmptyModel(entry.key.clone()));
            }
            if index.insert(entry.key.clone(), i).is_some() {
                return Err(ModelRegistryError::DuplicateKey(entry.key.clone()));
            }
        }

        Ok(ModelRegistry {
            entries: models,
            index,
            default_key: DEFAULT_MODEL_KEY.to_string(),
            default_model: DEFAULT_MODEL_ID.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_registered_keys_resolve_exactly() {
        let registry = ModelRegistry::builtin();
        for entry in builtin_models() {
            assert_eq!(registry.resolve(Some(&entry.key)), entry.model);
        }
    }

    #[test]
    fn test_unknown_key_falls_back_to_default_model() {
        let registry = ModelRegistry::builtin();
        assert_eq!(registry.resolve(Some("gpt-4")), DEFAULT_MODEL_ID);
        assert_eq!(registry.resolve(Some("")), DEFAULT_MODEL_ID);
        assert_eq!(registry.resolve(Some("MISTRAL")), DEFAULT_MODEL_ID);
    }

    #[test]
    fn test_missing_key_uses_default_key() {
        let registry = ModelRegistry::builtin().with_defaults("phi", DEFAULT_MODEL_ID);
        assert_eq!(registry.resolve(None), "microsoft/phi-2");
    }

    #[test]
    fn test_default_key_not_registered_still_resolves() {
        let registry = ModelRegistry::builtin().with_defaults("nope", "org/fallback");
        assert_eq!(registry.resolve(None), "org/fallback");
    }

    #[test]
    fn test_to_json_keeps_order() {
        let registry = ModelRegistry::builtin();
        let json = registry.to_json();
        let keys: Vec<&str> = json
            .as_object()
            .unwrap()
            .keys()
            .map(|k| k.as_str())
            .collect();
        assert_eq!(keys, vec!["mistral", "llama", "falcon", "phi", "gemma"]);
        assert_eq!(json["gemma"], "google/gemma-7b-it");
    }

    #[test]
    fn test_try_from_rejects_empty_and_duplicates() {
        assert_eq!(
            ModelRegistry::try_from(Vec::<ModelEntry>::new()).unwrap_err(),
            ModelRegistryError::EmptySource
        );

        let duplicated = vec![
            ModelEntry::new("phi", "microsoft/phi-2"),
            ModelEntry::new("phi", "microsoft/phi-3"),
        ];
        assert_eq!(
            ModelRegistry::try_from(duplicated).unwrap_err(),
            ModelRegistryError::DuplicateKey("phi".to_string())
        );

        let blank = vec![ModelEntry::new("phi", " ")];
        assert_eq!(
            ModelRegistry::try_from(blank).unwrap_err(),
            ModelRegistryError::EmptyModel("phi".to_string())
        );
    }

    #[test]
    fn test_custom_registry_lookup() {
        let registry = ModelRegistry::try_from(vec![ModelEntry::new(
            "zephyr",
            "HuggingFaceH4/zephyr-7b-beta",
        )])
        .unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("zephyr"), Some("HuggingFaceH4/zephyr-7b-beta"));
        assert_eq!(registry.get("mistral"), None);
        assert_eq!(registry.resolve(None), DEFAULT_MODEL_ID);
    }
}
