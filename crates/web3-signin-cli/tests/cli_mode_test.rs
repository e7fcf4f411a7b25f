/*
[INPUT]:  Built binary, mock auth service
[OUTPUT]: Test results for CLI startup and commands
[POS]:    Integration tests - CLI surface
[UPDATE]: When CLI flags or commands change
*/

use std::process::Command;

use tokio_test::assert_ok;
use web3_signin_adapter::{SessionState, SigninConfig};
use web3_signin_cli::commands;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> SigninConfig {
    let mut config = SigninConfig::default();
    config.service.url = Some(server.uri());
    config.service.api_key = Some("anon-test-key".to_string());
    config.ui.error_dismiss_ms = None;
    config
}

#[test]
fn cli_without_service_settings_fails() {
    let binary_path = env!("CARGO_BIN_EXE_web3-signin");
    let config_path = std::env::temp_dir().join("web3-signin-cli-test-empty.yaml");
    std::fs::write(&config_path, "{}\n").expect("write temp config");

    let output = Command::new(binary_path)
        .arg("--config")
        .arg(&config_path)
        .arg("status")
        .arg("--access-token")
        .arg("token")
        .env_remove("WEB3_SIGNIN_SERVICE_URL")
        .env_remove("SUPABASE_URL")
        .env_remove("WEB3_SIGNIN_API_KEY")
        .env_remove("SUPABASE_ANON_KEY")
        .output()
        .expect("Failed to start web3-signin binary");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid configuration"), "stderr: {stderr}");
}

#[test]
fn cli_help_lists_subcommands() {
    let output = Command::new(env!("CARGO_BIN_EXE_web3-signin"))
        .arg("--help")
        .output()
        .expect("Failed to start web3-signin binary");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["sign-in", "status", "sign-out"] {
        assert!(stdout.contains(command), "missing {command} in help");
    }
}

#[tokio::test]
async fn status_reports_user_behind_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", "Bearer jwt-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "user-1",
            "email": "a@example.test",
            "user_metadata": {"wallet_address": "0xabc"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let state = assert_ok!(commands::status(&config_for(&server), "jwt-1").await);
    assert_eq!(
        state,
        SessionState::Authenticated {
            user_id: "user-1".to_string(),
            email: Some("a@example.test".to_string()),
            wallet_address: Some("0xabc".to_string()),
        }
    );
}

#[tokio::test]
async fn sign_out_revokes_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .and(header("authorization", "Bearer jwt-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let state = assert_ok!(commands::sign_out(config_for(&server), "jwt-1").await);
    assert_eq!(state, SessionState::Unauthenticated);
}

#[tokio::test]
async fn sign_in_with_local_wallet_returns_token() {
    let server = MockServer::start().await;
    let address = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
    let user = serde_json::json!({"id": "user-1", "user_metadata": {"wallet_address": address}});
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "jwt-eth",
            "expires_in": 3600,
            "user": user.clone()
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user))
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.ui.settle_delay_ms = 50;
    let wallet = assert_ok!(web3_signin_cli::local_wallet(
        web3_signin_adapter::WalletKind::Ethereum,
        "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        None,
    ));

    let (state, token) = assert_ok!(
        commands::sign_in(config, wallet, Some(std::time::Duration::from_millis(50))).await
    );
    assert_eq!(state.wallet_address(), Some(address));
    assert_eq!(token.as_deref(), Some("jwt-eth"));
}
