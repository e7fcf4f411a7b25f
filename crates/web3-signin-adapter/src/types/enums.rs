/*
[INPUT]:  Wallet kind names from config, CLI flags and service payloads
[OUTPUT]: Typed enums with serialization support
[POS]:    Data layer - enum definitions
[UPDATE]: When adding wallet kinds or integration shapes
*/

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Supported wallet families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletKind {
    Ethereum,
    Solana,
}

impl WalletKind {
    pub const ALL: [WalletKind; 2] = [WalletKind::Ethereum, WalletKind::Solana];

    /// Chain name as the auth service expects it
    pub fn as_str(&self) -> &'static str {
        match self {
            WalletKind::Ethereum => "ethereum",
            WalletKind::Solana => "solana",
        }
    }

    /// Browser extension a user needs for this kind
    pub fn extension_name(&self) -> &'static str {
        match self {
            WalletKind::Ethereum => "MetaMask",
            WalletKind::Solana => "Phantom",
        }
    }

    /// Host namespaces a provider of this kind may be injected under,
    /// highest precedence first.
    pub fn namespaces(&self) -> &'static [&'static str] {
        match self {
            WalletKind::Ethereum => &["ethereum"],
            WalletKind::Solana => &["phantom.solana", "solana"],
        }
    }
}

impl fmt::Display for WalletKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletKind::Ethereum => f.write_str("Ethereum"),
            WalletKind::Solana => f.write_str("Solana"),
        }
    }
}

impl FromStr for WalletKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ethereum" | "eth" | "evm" => Ok(WalletKind::Ethereum),
            "solana" | "sol" => Ok(WalletKind::Solana),
            other => Err(format!("unknown wallet kind: {other}")),
        }
    }
}

/// How credentials reach the auth service
///
/// `Signed`: the flow signs a statement itself and submits it.
/// `Delegated`: the provider handle is handed to the auth bridge, which
/// drives connect and sign on its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationShape {
    #[default]
    Signed,
    Delegated,
}
