//! Shared test utilities for petcare-server integration tests

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use petcare_models::auth::CredentialPool;
use petcare_models::{AnalyzerRegistry, RegistryConfig};
use petcare_server::{AppState, PetcareServer, ServerConfig};
use tokio::net::TcpListener;

/// Registry config pointing both providers at `base_url`
#[allow(dead_code)]
pub fn mock_config(base_url: &str) -> RegistryConfig {
    RegistryConfig {
        gemini_base_url: base_url.to_string(),
        huggingface_base_url: base_url.to_string(),
        request_timeout: Duration::from_secs(5),
        file_poll_interval: Duration::from_millis(5),
        ..RegistryConfig::default()
    }
}

/// Creates a test server with the given providers, returns state and address
#[allow(dead_code)]
pub async fn create_test_server(
    registry_config: &RegistryConfig,
    gemini_keys: &[&str],
    hf_keys: &[&str],
) -> (Arc<AppState>, SocketAddr) {
    create_test_server_with_config(
        ServerConfig::new("127.0.0.1", 0),
        registry_config,
        gemini_keys,
        hf_keys,
    )
    .await
}

/// Creates a test server with custom server config
#[allow(dead_code)]
pub async fn create_test_server_with_config(
    config: ServerConfig,
    registry_config: &RegistryConfig,
    gemini_keys: &[&str],
    hf_keys: &[&str],
) -> (Arc<AppState>, SocketAddr) {
    let registry = AnalyzerRegistry::new(
        registry_config,
        CredentialPool::new("gemini", gemini_keys.iter().copied()),
        CredentialPool::new("huggingface", hf_keys.iter().copied()),
    )
    .unwrap();
    let state = Arc::new(AppState::new(registry));

    let server = PetcareServer::with_state(config, Arc::clone(&state));
    let addr = spawn_server(server).await;

    (state, addr)
}

/// Spawns server in background task, returns bound address
async fn spawn_server(server: PetcareServer) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = server.run_with_listener(listener).await;
    });

    // Brief delay to ensure server is accepting connections
    tokio::time::sleep(Duration::from_millis(10)).await;

    addr
}

/// Multipart form with a single `file` part
#[allow(dead_code)]
pub fn file_form(bytes: &[u8], file_name: &str, mime: &str) -> reqwest::multipart::Form {
    let part = reqwest::multipart::Part::bytes(bytes.to_vec())
        .file_name(file_name.to_string())
        .mime_str(mime)
        .unwrap();
    reqwest::multipart::Form::new().part("file", part)
}
