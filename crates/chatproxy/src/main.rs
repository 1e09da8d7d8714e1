use chatproxy::app_state::AppState;
use chatproxy::handlers::index::load_pages;
use chatproxy::server::serve;
use chatproxy::upstream::InferenceClient;
use chatproxy::utils::tracing::init_tracer;
use common::configuration::Configuration;
use common::consts::CONFIG_PATH_ENV;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn load_config() -> Result<Configuration, BoxError> {
    let config_path = env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
    if let Some(path) = &config_path {
        info!(path = %path.display(), "loading configuration");
    }

    let mut config = Configuration::load(config_path.as_deref())?;
    config.apply_env_overrides();
    Ok(config)
}

fn init_app_state(config: &Configuration) -> Result<Arc<AppState>, BoxError> {
    let model_registry = config.model_registry()?;
    info!(
        models = model_registry.len(),
        default_model_key = %model_registry.default_key(),
        default_model = %model_registry.default_model(),
        "model registry ready"
    );

    if config.access_key().is_none() {
        warn!("no inference api key configured, upstream calls will be unauthenticated");
    }

    let generator = InferenceClient::from_configuration(config)?;
    info!(
        base_url = %config.inference.base_url,
        timeout = ?config.request_timeout(),
        "inference client ready"
    );

    Ok(Arc::new(AppState {
        model_registry,
        generator: Arc::new(generator),
        pages: load_pages()?,
    }))
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // A missing .env file is not an error.
    let _ = dotenvy::dotenv();
    let _tracer_provider = init_tracer();

    let config = load_config()?;
    let state = init_app_state(&config)?;

    let listener = TcpListener::bind(&config.listener.address).await?;
    serve(listener, state, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await?;

    Ok(())
}
