/*
[INPUT]:  Raw wallet-provider errors and auth-service error bodies
[OUTPUT]: Structured sign-in errors, error kinds and user-facing messages
[POS]:    Error handling layer - the only place error text is inspected
[UPDATE]: When adding error sources or new wallet/service error codes
*/

use thiserror::Error;

use crate::types::WalletKind;

/// EIP-1193 "user rejected the request"
pub const USER_REJECTED_CODE: i64 = 4001;
/// EIP-1193 "the requested account/method has not been authorized"
pub const UNAUTHORIZED_CODE: i64 = 4100;
/// EIP-1193 "the provider does not support the requested method"
pub const UNSUPPORTED_METHOD_CODE: i64 = 4200;

/// Error raised by an injected wallet provider, as reported by the wallet
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ProviderError {
    pub code: Option<i64>,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: Option<i64>, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// The error a wallet returns when the user closes or declines the popup
    pub fn user_rejected() -> Self {
        Self::new(Some(USER_REJECTED_CODE), "User rejected the request.")
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(Some(UNAUTHORIZED_CODE), message)
    }

    pub fn unsupported(method: &str) -> Self {
        Self::new(
            Some(UNSUPPORTED_METHOD_CODE),
            format!("The requested method is not supported: {method}"),
        )
    }
}

/// Error returned by the external authentication service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ServiceError {
    pub status: Option<u16>,
    pub code: Option<String>,
    pub message: String,
}

const NO_SESSION_CODES: &[&str] = &[
    "session_not_found",
    "session_expired",
    "no_authorization",
    "bad_jwt",
];

impl ServiceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            code: None,
            message: message.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// The error the service adapter reports when there is no session to act on
    pub fn no_session() -> Self {
        Self::new("Auth session missing!")
            .with_status(401)
            .with_code("session_not_found")
    }

    /// Whether this error just means "nobody is signed in"
    pub fn is_no_session(&self) -> bool {
        if let Some(code) = self.code.as_deref() {
            if NO_SESSION_CODES.contains(&code) {
                return true;
            }
        }
        if self.status == Some(401) {
            return true;
        }
        let message = self.message.to_ascii_lowercase();
        message.contains("session missing") || message.contains("session not found")
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("request timed out: {err}")
        } else {
            format!("HTTP request failed: {err}")
        };
        let service_error = Self::new(message);
        match err.status() {
            Some(status) => service_error.with_status(status.as_u16()),
            None => service_error,
        }
    }
}

/// Main error type for the sign-in flow
#[derive(Error, Debug)]
pub enum SigninError {
    /// No wallet of this kind appeared in the host before the deadline
    #[error("{kind} wallet not available")]
    NotFound { kind: WalletKind },

    /// The user declined the wallet popup
    #[error("Request cancelled by user")]
    UserCancelled,

    /// The wallet or the service refused the credentials
    #[error("Wallet rejected the request: {0}")]
    WalletRejected(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Wallet reported a successful connect without an address
    #[error("Wallet connected but did not report an address")]
    IdentifierMissing,

    #[error("Signed address {actual} does not match connected address {expected}")]
    IdentifierMismatch { expected: String, actual: String },

    #[error("{actual} credentials cannot complete a {expected} sign-in")]
    KindMismatch {
        expected: WalletKind,
        actual: WalletKind,
    },

    #[error("A {0} sign-in is already in progress")]
    FlowInProgress(WalletKind),

    /// Any other wallet failure
    #[error("Wallet error: {message}")]
    Wallet { code: Option<i64>, message: String },

    /// Opaque failure from the auth service
    #[error("Auth service error: {message}")]
    Service {
        status: Option<u16>,
        code: Option<String>,
        message: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Coarse classification used by the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    UserCancelled,
    WalletRejected,
    Timeout,
    IdentifierMissing,
    Service,
    Config,
    Generic,
}

impl SigninError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SigninError::NotFound { .. } => ErrorKind::NotFound,
            SigninError::UserCancelled => ErrorKind::UserCancelled,
            SigninError::WalletRejected(_) => ErrorKind::WalletRejected,
            SigninError::Timeout(_) => ErrorKind::Timeout,
            SigninError::IdentifierMissing | SigninError::IdentifierMismatch { .. } => {
                ErrorKind::IdentifierMissing
            }
            SigninError::Service { .. } => ErrorKind::Service,
            SigninError::Config(_) | SigninError::UrlParse(_) => ErrorKind::Config,
            SigninError::KindMismatch { .. }
            | SigninError::FlowInProgress(_)
            | SigninError::Wallet { .. } => ErrorKind::Generic,
        }
    }

    pub fn is_user_cancelled(&self) -> bool {
        matches!(self, SigninError::UserCancelled)
    }

    /// Text shown in the error banner
    pub fn user_message(&self) -> String {
        match self {
            SigninError::NotFound { kind } => format!(
                "{kind} wallet not available. Please install the {} extension.",
                kind.extension_name()
            ),
            SigninError::UserCancelled => "Sign-in cancelled by user".to_string(),
            SigninError::Timeout(_) => "The request timed out, please try again".to_string(),
            other => other.to_string(),
        }
    }
}

/// Result type alias for sign-in operations
pub type Result<T> = std::result::Result<T, SigninError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MessageClass {
    Cancelled,
    TimedOut,
    Missing,
    Refused,
}

fn match_message(message: &str) -> Option<MessageClass> {
    let message = message.to_ascii_lowercase();
    if message.contains("rejected") || message.contains("canceled") || message.contains("cancelled")
    {
        Some(MessageClass::Cancelled)
    } else if message.contains("timeout") || message.contains("timed out") {
        Some(MessageClass::TimedOut)
    } else if message.contains("not found") || message.contains("not installed") {
        Some(MessageClass::Missing)
    } else if message.contains("denied")
        || message.contains("unauthorized")
        || message.contains("invalid signature")
    {
        Some(MessageClass::Refused)
    } else {
        None
    }
}

/// Map a wallet provider error onto the sign-in taxonomy
pub fn classify_provider_error(err: ProviderError, kind: WalletKind) -> SigninError {
    if err.code == Some(USER_REJECTED_CODE) {
        return SigninError::UserCancelled;
    }
    match match_message(&err.message) {
        Some(MessageClass::Cancelled) => SigninError::UserCancelled,
        Some(MessageClass::TimedOut) => SigninError::Timeout(err.message),
        Some(MessageClass::Missing) => SigninError::NotFound { kind },
        Some(MessageClass::Refused) => SigninError::WalletRejected(err.message),
        None if err.code == Some(UNAUTHORIZED_CODE) => SigninError::WalletRejected(err.message),
        None => SigninError::Wallet {
            code: err.code,
            message: err.message,
        },
    }
}

/// Map an auth-service error onto the sign-in taxonomy
///
/// `kind` is the wallet involved, when the call was part of a wallet flow.
pub fn classify_service_error(err: ServiceError, kind: Option<WalletKind>) -> SigninError {
    match (match_message(&err.message), kind) {
        (Some(MessageClass::Cancelled), _) => SigninError::UserCancelled,
        (Some(MessageClass::TimedOut), _) => SigninError::Timeout(err.message),
        (Some(MessageClass::Missing), Some(kind)) => SigninError::NotFound { kind },
        (Some(MessageClass::Refused), Some(_)) => SigninError::WalletRejected(err.message),
        _ => SigninError::Service {
            status: err.status,
            code: err.code,
            message: err.message,
        },
    }
}
