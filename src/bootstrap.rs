//! One-shot bearer token acquisition
//!
//! When the configuration declares an active bootstrap call, it is made once
//! before any scenario is materialized and the extracted token becomes a
//! global `Bearer` header.

use reqwest::Url;

use crate::configuration::Configuration;
use crate::error::{DashError, Result};
use crate::executor::{self, Transports};
use crate::extraction;

/// Run the bootstrap call declared in `config.init_func`, if active.
///
/// Returns the configuration with `headers[target_value]` set to
/// `Bearer <token>`. Any failure aborts the run.
pub async fn acquire_token(mut config: Configuration, transports: &Transports) -> Result<Configuration> {
    let init = &config.init_func;
    if !init.active {
        return Ok(config);
    }

    if init.target_value.trim().is_empty() {
        return Err(DashError::Bootstrap(
            "no target header configured for the bootstrap token".to_string(),
        ));
    }

    log::info!("Fetching bootstrap token from {}", init.url);

    let method = executor::parse_method(&init.method).map_err(|e| DashError::Bootstrap(e.to_string()))?;
    let url = Url::parse(&init.url)
        .map_err(|e| DashError::Bootstrap(format!("Invalid bootstrap URL {}: {}", init.url, e)))?;
    let headers = executor::header_map(&init.headers).map_err(|e| DashError::Bootstrap(e.to_string()))?;

    let client = transports.select(url.host_str().unwrap_or_default());
    let exchange = executor::send(client.request(method, url).headers(headers))
        .await
        .map_err(|e| DashError::Bootstrap(e.to_string()))?;

    if !(200..300).contains(&exchange.status) {
        log::warn!("Bootstrap call answered with status {}", exchange.status);
    }

    let token = extraction::extract_text(&exchange.body, &init.get_value);
    if token.is_empty() {
        return Err(DashError::Bootstrap(format!(
            "no value found at '{}' in the bootstrap response (status {})",
            init.get_value, exchange.status
        )));
    }

    let target = init.target_value.clone();
    log::debug!("Injecting bootstrap token into header {}", target);
    config.headers.insert(target, format!("Bearer {}", token));
    Ok(config)
}
