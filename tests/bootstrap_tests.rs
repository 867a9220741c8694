mod common;

use std::collections::HashMap;

use common::MockServer;
use dash::bootstrap::acquire_token;
use dash::{BootstrapToken, DashError, Transports};

fn token_call(server: &MockServer, headers: HashMap<String, String>) -> BootstrapToken {
    BootstrapToken {
        active: true,
        action: "login".to_string(),
        alias: "auth".to_string(),
        get_value: "data.token".to_string(),
        target_value: "Authorization".to_string(),
        url: server.url("/token"),
        headers,
        method: "post".to_string(),
    }
}

#[tokio::test]
async fn test_token_is_injected_as_bearer_header() {
    let server = MockServer::start().await;
    let transports = Transports::direct_only().unwrap();
    let mut config = common::config();
    config.init_func = token_call(
        &server,
        HashMap::from([("X-Client".to_string(), "dash".to_string())]),
    );

    let config = acquire_token(config, &transports).await.unwrap();
    assert_eq!(config.headers["Authorization"], "Bearer secret-token");
    assert_eq!(config.headers["Accept"], "application/json");
}

#[tokio::test]
async fn test_inactive_bootstrap_is_a_no_op() {
    let transports = Transports::direct_only().unwrap();
    let config = common::config();
    let before = config.headers.clone();

    let config = acquire_token(config, &transports).await.unwrap();
    assert_eq!(config.headers, before);
}

#[tokio::test]
async fn test_missing_token_is_fatal() {
    let server = MockServer::start().await;
    let transports = Transports::direct_only().unwrap();
    let mut config = common::config();
    config.init_func = token_call(&server, HashMap::new());

    let result = acquire_token(config, &transports).await;
    assert!(matches!(result, Err(DashError::Bootstrap(_))));
}

#[tokio::test]
async fn test_unreachable_token_endpoint_is_fatal() {
    let transports = Transports::direct_only().unwrap();
    let mut config = common::config();
    config.init_func = BootstrapToken {
        active: true,
        get_value: "data.token".to_string(),
        target_value: "Authorization".to_string(),
        url: "not a url".to_string(),
        ..BootstrapToken::default()
    };

    let result = acquire_token(config, &transports).await;
    assert!(matches!(result, Err(DashError::Bootstrap(_))));
}
