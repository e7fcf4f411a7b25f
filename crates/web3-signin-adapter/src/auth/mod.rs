/*
[INPUT]:  Host environment, wallet providers and the auth service
[OUTPUT]: Located wallets, signed statements, sessions and flow errors
[POS]:    Auth layer - wallet sign-in flow
[UPDATE]: When flow steps or their contracts change
*/

pub mod bridge;
pub mod context;
pub mod locator;
pub mod negotiator;
pub mod service;
pub mod session;
pub mod statement;

pub use bridge::{AuthBridge, Credentials};
pub use context::SigninContext;
pub use locator::{HostEnvironment, InjectedHost, LocateOptions, locate};
pub use negotiator::{ConnectAttempt, connect};
pub use service::AuthService;
pub use session::SessionObserver;
pub use statement::{StatementTemplate, sign, verify_identifier};
