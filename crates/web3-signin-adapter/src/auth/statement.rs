/*
[INPUT]:  Connect result and statement template
[OUTPUT]: Fresh sign-in message signed by the wallet
[POS]:    Auth layer - challenge construction and signing
[UPDATE]: When message layout or signature encoding changes
*/

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;
use uuid::Uuid;

use crate::error::{Result, SigninError, classify_provider_error};
use crate::types::{ConnectResult, SignedStatement, WalletKind};

pub const DEFAULT_STATEMENT: &str = "I accept the Terms of Service";

/// Fixed parts of the sign-in message
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct StatementTemplate {
    pub domain: String,
    pub uri: String,
    pub statement: String,
    pub version: String,
    /// EIP-155 chain id, Ethereum only
    pub chain_id: u64,
}

impl Default for StatementTemplate {
    fn default() -> Self {
        Self {
            domain: "localhost".to_string(),
            uri: "http://localhost".to_string(),
            statement: DEFAULT_STATEMENT.to_string(),
            version: "1".to_string(),
            chain_id: 1,
        }
    }
}

impl StatementTemplate {
    /// Render the message for one attempt
    ///
    /// Ethereum follows the EIP-4361 layout; Solana uses the same layout
    /// without a chain id.
    pub fn render(
        &self,
        kind: WalletKind,
        identifier: &str,
        issued_at: DateTime<Utc>,
        nonce: &str,
    ) -> String {
        let issued_at = issued_at.to_rfc3339_opts(SecondsFormat::Millis, true);
        let mut message = format!(
            "{domain} wants you to sign in with your {kind} account:\n{identifier}\n\n{statement}\n\nURI: {uri}\nVersion: {version}\n",
            domain = self.domain,
            statement = self.statement,
            uri = self.uri,
            version = self.version,
        );
        if kind == WalletKind::Ethereum {
            message.push_str(&format!("Chain ID: {}\n", self.chain_id));
        }
        message.push_str(&format!("Nonce: {nonce}\nIssued At: {issued_at}"));
        message
    }
}

fn fresh_nonce() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Ask the connected wallet to sign a freshly built statement
pub async fn sign(connected: &ConnectResult, template: &StatementTemplate) -> Result<SignedStatement> {
    let kind = connected.kind();
    let identifier = connected.identifier();
    let provider = connected.handle().provider()?;

    let message = template.render(kind, identifier, Utc::now(), &fresh_nonce());
    debug!(%kind, "requesting statement signature");

    let signature = match kind {
        WalletKind::Ethereum => {
            let params = json!([format!("0x{}", hex::encode(message.as_bytes())), identifier]);
            let value = provider
                .request("personal_sign", params)
                .await
                .map_err(|err| classify_provider_error(err, kind))?;
            decode_hex_signature(&value)?
        }
        WalletKind::Solana => provider
            .sign_message(message.as_bytes())
            .await
            .map_err(|err| classify_provider_error(err, kind))?,
    };

    if signature.is_empty() {
        return Err(SigninError::Wallet {
            code: None,
            message: "wallet returned an empty signature".to_string(),
        });
    }

    Ok(SignedStatement::new(
        kind,
        message,
        signature,
        identifier.to_string(),
    ))
}

fn decode_hex_signature(value: &Value) -> Result<Vec<u8>> {
    let text = value.as_str().ok_or_else(|| SigninError::Wallet {
        code: None,
        message: format!("unexpected signature value: {value}"),
    })?;
    let body = text.strip_prefix("0x").unwrap_or(text);
    hex::decode(body).map_err(|e| SigninError::Wallet {
        code: None,
        message: format!("invalid signature encoding: {e}"),
    })
}

fn same_identifier(kind: WalletKind, left: &str, right: &str) -> bool {
    match kind {
        // checksummed and lowercase forms name the same account
        WalletKind::Ethereum => left.trim().eq_ignore_ascii_case(right.trim()),
        WalletKind::Solana => left.trim() == right.trim(),
    }
}

/// Check a statement still belongs to the account connected in this flow
///
/// Fails if the statement names another address, or if the wallet has
/// switched accounts since connecting.
pub fn verify_identifier(statement: &SignedStatement, connected: &ConnectResult) -> Result<()> {
    let kind = connected.kind();
    let expected = connected.identifier();

    if !same_identifier(kind, statement.identifier(), expected) {
        return Err(SigninError::IdentifierMismatch {
            expected: expected.to_string(),
            actual: statement.identifier().to_string(),
        });
    }

    if let Some(current) = connected.handle().public_identifier() {
        if !same_identifier(kind, &current, expected) {
            return Err(SigninError::IdentifierMismatch {
                expected: expected.to_string(),
                actual: current,
            });
        }
    }

    Ok(())
}
