/*
[INPUT]:  Service URL, API key and HTTP client configuration
[OUTPUT]: AuthService implementation over the hosted REST API
[POS]:    HTTP layer - auth service communication
[UPDATE]: When adding endpoints or changing client behavior
*/

pub mod client;
pub mod session_slot;

pub use client::{ClientConfig, HttpAuthService};
pub use session_slot::{SessionSlot, StoredSession};
