// tests/common/mod.rs
pub use axum::{body::Body, Router};
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use crate::acquisition::coordinator::{AcquisitionConfig, TokenCoordinator};
use crate::acquisition::region::Region;
use crate::credentials::cipher::FallbackEncryptor;
use crate::credentials::set::CredentialSet;
use crate::credentials::store::CredentialStore;
use crate::validator::TokenValidator;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use reqwest::Client;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

/// Forge an unsigned three-segment token with the given payload claims.
pub fn forge_token(payload: serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string().as_bytes());
    format!("{header}.{body}.sig")
}

pub fn build_reqwest_client() -> Client {
    Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .expect("reqwest client")
}

pub async fn store_with_credentials() -> Arc<CredentialStore> {
    let store = Arc::new(CredentialStore::new(Arc::new(
        FallbackEncryptor::with_session_cipher(),
    )));
    store
        .save(&CredentialSet::new("c1", "s1", "t1", Region::NorthAmerica).unwrap())
        .await
        .unwrap();
    store
}

pub fn empty_store() -> Arc<CredentialStore> {
    Arc::new(CredentialStore::new(Arc::new(
        FallbackEncryptor::with_session_cipher(),
    )))
}

/// Coordinator wired against test endpoints with a short exchange timeout.
pub fn build_coordinator(
    store: Arc<CredentialStore>,
    broker_url: Option<String>,
    direct_token_url: Option<String>,
) -> TokenCoordinator {
    TokenCoordinator::new(
        build_reqwest_client(),
        store,
        TokenValidator::default(),
        AcquisitionConfig {
            exchange_timeout: Duration::from_secs(5),
            broker_url,
            direct_token_url,
            ..AcquisitionConfig::default()
        },
    )
}
