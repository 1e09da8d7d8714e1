pub mod configuration;
pub mod consts;
pub mod model_registry;
