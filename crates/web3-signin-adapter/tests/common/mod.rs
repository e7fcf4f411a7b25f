/*
[INPUT]:  Test configuration and mock server requirements
[OUTPUT]: Shared test utilities, fixtures, and mock helpers
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for web3-signin-adapter tests

use std::time::Duration;

use web3_signin_adapter::SigninConfig;
use wiremock::MockServer;

pub const API_KEY: &str = "anon-test-key";

/// Well-known development key, address 0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266
pub const ETH_TEST_KEY: &str =
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// Setup a mock HTTP server for testing
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Deterministic base58 Solana seed
#[allow(dead_code)]
pub fn solana_test_key() -> String {
    bs58::encode([7u8; 32]).into_string()
}

/// Config pointed at `server` with timings short enough for real-time tests
pub fn test_config(server: &MockServer) -> SigninConfig {
    let mut config = SigninConfig::default();
    config.service.url = Some(server.uri());
    config.service.api_key = Some(API_KEY.to_string());
    config.wallet.locate_timeout_ms = 300;
    config.wallet.poll_interval_ms = 20;
    config.ui.settle_delay_ms = 100;
    config.ui.error_dismiss_ms = None;
    config
}

pub fn user_json(wallet_address: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "user-1",
        "email": "",
        "user_metadata": {"wallet_address": wallet_address},
        "identities": []
    })
}

pub fn session_json(token: &str, wallet_address: &str) -> serde_json::Value {
    serde_json::json!({
        "access_token": token,
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": "refresh-1",
        "user": user_json(wallet_address)
    })
}

/// Poll `condition` until it holds or `timeout` passes
#[allow(dead_code)]
pub async fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
