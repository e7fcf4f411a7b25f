/*
[INPUT]:  Flow results and auth-service JSON payloads
[OUTPUT]: Connect results, signed statements, sessions and user records
[POS]:    Data layer - flow artifacts and service models
[UPDATE]: When the service schema or flow artifacts change
*/

use base64::{Engine as _, prelude::BASE64_STANDARD};
use serde::{Deserialize, Serialize};

use crate::types::WalletKind;
use crate::wallet::ProviderHandle;

/// Outcome of a successful account request
#[derive(Debug, Clone)]
pub struct ConnectResult {
    identifier: String,
    raw_handle: ProviderHandle,
}

impl ConnectResult {
    pub(crate) fn new(identifier: String, raw_handle: ProviderHandle) -> Self {
        Self {
            identifier,
            raw_handle,
        }
    }

    /// Chain address the wallet granted access to, never empty
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn handle(&self) -> &ProviderHandle {
        &self.raw_handle
    }

    pub fn kind(&self) -> WalletKind {
        self.raw_handle.kind()
    }
}

/// A statement signed by the wallet, consumed once by the auth bridge
#[derive(Debug)]
pub struct SignedStatement {
    kind: WalletKind,
    message: String,
    signature: Vec<u8>,
    identifier: String,
}

impl SignedStatement {
    pub(crate) fn new(
        kind: WalletKind,
        message: String,
        signature: Vec<u8>,
        identifier: String,
    ) -> Self {
        Self {
            kind,
            message,
            signature,
            identifier,
        }
    }

    pub fn kind(&self) -> WalletKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Signature in the encoding the auth service expects
    ///
    /// Ethereum: `0x`-prefixed hex. Solana: standard base64.
    pub fn encoded_signature(&self) -> String {
        match self.kind {
            WalletKind::Ethereum => format!("0x{}", hex::encode(&self.signature)),
            WalletKind::Solana => BASE64_STANDARD.encode(&self.signature),
        }
    }

    /// Turn the statement into the request body, consuming it
    pub fn into_credentials(self) -> Web3Credentials {
        Web3Credentials {
            chain: self.kind,
            signature: self.encoded_signature(),
            message: self.message,
        }
    }
}

/// Body of the web3 token grant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Web3Credentials {
    pub chain: WalletKind,
    pub message: String,
    pub signature: String,
}

/// Process-wide authentication truth
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Authenticated {
        user_id: String,
        email: Option<String>,
        wallet_address: Option<String>,
    },
    Unauthenticated,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated { .. })
    }

    pub fn wallet_address(&self) -> Option<&str> {
        match self {
            SessionState::Authenticated { wallet_address, .. } => wallet_address.as_deref(),
            SessionState::Unauthenticated => None,
        }
    }
}

impl From<&UserProfile> for SessionState {
    fn from(user: &UserProfile) -> Self {
        SessionState::Authenticated {
            user_id: user.id.clone(),
            email: user.email.clone().filter(|email| !email.is_empty()),
            wallet_address: user.wallet_address(),
        }
    }
}

/// Session issued by the auth service
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Unix seconds
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

/// User record held by the auth service
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
    #[serde(default)]
    pub identities: Vec<Identity>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Identity {
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub identity_data: serde_json::Value,
}

impl UserProfile {
    /// Wallet address linked to this user, wherever the service put it
    pub fn wallet_address(&self) -> Option<String> {
        let from_metadata = self
            .user_metadata
            .get("wallet_address")
            .or_else(|| {
                self.user_metadata
                    .get("custom_claims")
                    .and_then(|claims| claims.get("address"))
            })
            .and_then(|value| value.as_str());

        from_metadata
            .or_else(|| {
                self.identities
                    .iter()
                    .find_map(|identity| identity.identity_data.get("address")?.as_str())
            })
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_from(json: serde_json::Value) -> UserProfile {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_wallet_address_lookup_order() {
        let user = user_from(serde_json::json!({
            "id": "u1",
            "user_metadata": {
                "wallet_address": "0xaaa",
                "custom_claims": {"address": "0xbbb"}
            }
        }));
        assert_eq!(user.wallet_address().as_deref(), Some("0xaaa"));

        let user = user_from(serde_json::json!({
            "id": "u1",
            "user_metadata": {"custom_claims": {"address": "0xbbb"}}
        }));
        assert_eq!(user.wallet_address().as_deref(), Some("0xbbb"));

        let user = user_from(serde_json::json!({
            "id": "u1",
            "identities": [{"provider": "web3", "identity_data": {"address": "So1ana"}}]
        }));
        assert_eq!(user.wallet_address().as_deref(), Some("So1ana"));

        let user = user_from(serde_json::json!({"id": "u1"}));
        assert_eq!(user.wallet_address(), None);
    }

    #[test]
    fn test_session_state_from_user_drops_empty_email() {
        let user = user_from(serde_json::json!({
            "id": "u1",
            "email": "",
            "user_metadata": {"wallet_address": "0xaaa"}
        }));
        assert_eq!(
            SessionState::from(&user),
            SessionState::Authenticated {
                user_id: "u1".to_string(),
                email: None,
                wallet_address: Some("0xaaa".to_string()),
            }
        );
    }

    #[test]
    fn test_session_deserializes_service_payload() {
        let session: Session = serde_json::from_value(serde_json::json!({
            "access_token": "jwt",
            "token_type": "bearer",
            "expires_in": 3600,
            "expires_at": 1_900_000_000,
            "refresh_token": "refresh",
            "user": {"id": "u1", "email": null}
        }))
        .unwrap();
        assert_eq!(session.access_token, "jwt");
        assert_eq!(session.user.unwrap().id, "u1");
    }
}
