//! Picks a `Backend` from the model config plus CLI overrides. Only two
//! adapters exist in this crate: the mock backend (default, no URL
//! configured) and the HTTP adapter (any URL configured, via `--backend-url`
//! or `model.base_url`) — same spirit as the original's `create_backend`
//! dispatch but without the half-dozen subscription-CLI adapters it wired
//! up.

use std::sync::Arc;

use agentloop_backend::Backend;
use agentloop_config::ModelConfig;
use anyhow::Result;

pub fn select_backend(
    model: &ModelConfig,
    backend_url_override: Option<&str>,
    model_override: Option<&str>,
) -> Result<Arc<dyn Backend>> {
    let model_name = model_override.unwrap_or(&model.name).to_string();
    let base_url = backend_url_override
        .map(str::to_string)
        .or_else(|| model.base_url.clone());

    match base_url {
        Some(url) => build_http_backend(url, model_name),
        None if model.backend.eq_ignore_ascii_case("http") => {
            anyhow::bail!("model.backend is 'http' but no base_url was configured or passed via --backend-url")
        }
        None => {
            tracing::info!("no backend URL configured, using the mock backend");
            Ok(Arc::new(agentloop_backend::MockBackend::new(Vec::new())))
        }
    }
}

#[cfg(feature = "http")]
fn build_http_backend(base_url: String, model_name: String) -> Result<Arc<dyn Backend>> {
    let api_key = std::env::var("AGENTLOOP_API_KEY").ok();
    Ok(Arc::new(agentloop_backend::HttpBackend::new(base_url, model_name, api_key)))
}

#[cfg(not(feature = "http"))]
fn build_http_backend(_base_url: String, _model_name: String) -> Result<Arc<dyn Backend>> {
    anyhow::bail!("a backend URL was configured, but this binary was built without the `http` feature")
}
