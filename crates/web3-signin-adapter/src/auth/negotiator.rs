/*
[INPUT]:  Located provider handle
[OUTPUT]: Connected account identifier, or the last connect error
[POS]:    Auth layer - account access with one fallback attempt
[UPDATE]: When a wallet kind gains or changes connect call forms
*/

use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::error::{ProviderError, Result, SigninError, classify_provider_error};
use crate::types::{ConnectResult, WalletKind};
use crate::wallet::{ConnectOptions, ProviderHandle, WalletProvider};

/// One way of asking a wallet for account access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectAttempt {
    /// `eth_requestAccounts`, prompts the user
    RequestAccounts,
    /// `eth_accounts`, accounts already exposed to the site
    Accounts,
    /// `connect()` on the wallet object
    Connect,
    /// `request("connect")`
    RequestConnect,
}

impl ConnectAttempt {
    /// Primary and alternate call forms for a wallet kind
    pub fn for_kind(kind: WalletKind) -> [ConnectAttempt; 2] {
        match kind {
            WalletKind::Ethereum => [ConnectAttempt::RequestAccounts, ConnectAttempt::Accounts],
            WalletKind::Solana => [ConnectAttempt::Connect, ConnectAttempt::RequestConnect],
        }
    }

    async fn run(
        self,
        provider: &dyn WalletProvider,
    ) -> std::result::Result<Option<String>, ProviderError> {
        match self {
            ConnectAttempt::RequestAccounts => provider
                .request("eth_requestAccounts", json!([]))
                .await
                .map(|value| identifier_from(&value)),
            ConnectAttempt::Accounts => provider
                .request("eth_accounts", json!([]))
                .await
                .map(|value| identifier_from(&value)),
            ConnectAttempt::Connect => {
                let options = ConnectOptions {
                    only_if_trusted: false,
                };
                provider.connect(options).await
            }
            ConnectAttempt::RequestConnect => provider
                .request("connect", json!({ "onlyIfTrusted": false }))
                .await
                .map(|value| identifier_from(&value)),
        }
    }
}

/// Pull an address out of whatever shape the wallet answered with
fn identifier_from(value: &Value) -> Option<String> {
    match value {
        Value::String(identifier) => Some(identifier.clone()),
        Value::Array(accounts) => accounts.first().and_then(identifier_from),
        Value::Object(fields) => fields.get("publicKey").and_then(identifier_from),
        _ => None,
    }
}

/// Request account access from the wallet behind `handle`
///
/// The alternate call form runs only if the primary one fails. When both
/// fail, the alternate's error is the one reported.
pub async fn connect(handle: &ProviderHandle) -> Result<ConnectResult> {
    let kind = handle.kind();
    let provider = handle.provider()?;
    let [primary, alternate] = ConnectAttempt::for_kind(kind);

    let (identifier, primary_err) = match primary.run(provider.as_ref()).await {
        Ok(identifier) => (identifier, None),
        Err(err) => {
            warn!(%kind, attempt = ?primary, error = %err, "connect failed, trying alternate");
            match alternate.run(provider.as_ref()).await {
                Ok(identifier) => (identifier, Some(err)),
                Err(err) => {
                    warn!(%kind, attempt = ?alternate, error = %err, "alternate connect failed");
                    return Err(classify_provider_error(err, kind));
                }
            }
        }
    };

    let identifier = identifier
        .or_else(|| handle.public_identifier())
        .map(|identifier| identifier.trim().to_string())
        .filter(|identifier| !identifier.is_empty());
    let identifier = match (identifier, primary_err) {
        (Some(identifier), _) => identifier,
        // the alternate only reported that nothing is exposed yet
        (None, Some(err)) => return Err(classify_provider_error(err, kind)),
        (None, None) => return Err(SigninError::IdentifierMissing),
    };

    debug!(%kind, identifier = %identifier, "wallet connected");
    info!(%kind, "wallet connected");
    Ok(ConnectResult::new(identifier, handle.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::wallet::MockWalletProvider;
    use crate::wallet::mock::CONNECT_CALL;
    use std::sync::Arc;

    fn handle_for(provider: &Arc<dyn WalletProvider>) -> ProviderHandle {
        ProviderHandle::new("test", provider)
    }

    #[tokio::test]
    async fn test_primary_success_skips_alternate() {
        let mock = Arc::new(MockWalletProvider::new(WalletKind::Ethereum, Some("0xabc")));
        let provider: Arc<dyn WalletProvider> = mock.clone();

        let result = connect(&handle_for(&provider)).await.unwrap();
        assert_eq!(result.identifier(), "0xabc");
        assert_eq!(mock.calls(), vec!["eth_requestAccounts".to_string()]);
    }

    #[tokio::test]
    async fn test_alternate_runs_after_primary_error() {
        let mock = Arc::new(MockWalletProvider::new(WalletKind::Solana, Some("So1")));
        mock.push_response(CONNECT_CALL, Err(ProviderError::new(Some(-32603), "boom")));
        let provider: Arc<dyn WalletProvider> = mock.clone();

        let result = connect(&handle_for(&provider)).await.unwrap();
        assert_eq!(result.identifier(), "So1");
        assert_eq!(
            mock.calls(),
            vec![CONNECT_CALL.to_string(), "connect".to_string()]
        );
    }

    #[tokio::test]
    async fn test_total_failure_reports_alternate_error() {
        let mock = Arc::new(MockWalletProvider::new(WalletKind::Solana, Some("So1")));
        mock.push_response(CONNECT_CALL, Err(ProviderError::new(Some(-32603), "first")));
        mock.push_response("connect", Err(ProviderError::user_rejected()));
        let provider: Arc<dyn WalletProvider> = mock.clone();

        let err = connect(&handle_for(&provider)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UserCancelled);

        let mock = Arc::new(MockWalletProvider::new(WalletKind::Solana, Some("So1")));
        mock.push_response(CONNECT_CALL, Err(ProviderError::user_rejected()));
        mock.push_response("connect", Err(ProviderError::new(Some(-32603), "second")));
        let provider: Arc<dyn WalletProvider> = mock.clone();

        match connect(&handle_for(&provider)).await.unwrap_err() {
            SigninError::Wallet { message, .. } => assert_eq!(message, "second"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_connected_without_identifier() {
        let mock = Arc::new(MockWalletProvider::new(WalletKind::Ethereum, None));
        let provider: Arc<dyn WalletProvider> = mock.clone();

        let err = connect(&handle_for(&provider)).await.unwrap_err();
        assert!(matches!(err, SigninError::IdentifierMissing));
    }

    #[tokio::test]
    async fn test_declined_prompt_with_empty_accounts_is_cancellation() {
        let mock = Arc::new(MockWalletProvider::new(WalletKind::Ethereum, None));
        mock.push_response("eth_requestAccounts", Err(ProviderError::user_rejected()));
        mock.push_response("eth_accounts", Ok(json!([])));
        let provider: Arc<dyn WalletProvider> = mock.clone();

        let err = connect(&handle_for(&provider)).await.unwrap_err();
        assert!(err.is_user_cancelled());
        assert_eq!(
            mock.calls(),
            vec!["eth_requestAccounts".to_string(), "eth_accounts".to_string()]
        );
    }

    #[test]
    fn test_identifier_shapes() {
        assert_eq!(identifier_from(&json!(["0x1", "0x2"])).as_deref(), Some("0x1"));
        assert_eq!(identifier_from(&json!({"publicKey": "So1"})).as_deref(), Some("So1"));
        assert_eq!(identifier_from(&json!([])), None);
        assert_eq!(identifier_from(&Value::Null), None);
    }
}
