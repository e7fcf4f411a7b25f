/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public web3 sign-in crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod types;
pub mod ui;
pub mod wallet;

// Re-export commonly used types from auth
pub use auth::{
    AuthBridge,
    AuthService,
    Credentials,
    HostEnvironment,
    InjectedHost,
    LocateOptions,
    SessionObserver,
    SigninContext,
    StatementTemplate,
};

pub use config::SigninConfig;

pub use error::{ErrorKind, ProviderError, Result, ServiceError, SigninError};

// Re-export commonly used types from http
pub use http::{ClientConfig, HttpAuthService, SessionSlot};

// Re-export all types
pub use types::*;

pub use ui::{Control, ErrorBanner, ProfileView, RecordingReflector, UiEvent, UiReflector};

// Re-export commonly used types from wallet
pub use wallet::{
    ApprovalPolicy,
    ConnectOptions,
    LocalEthereumWallet,
    LocalSolanaWallet,
    MockWalletProvider,
    ProviderEvent,
    ProviderHandle,
    WalletProvider,
};
