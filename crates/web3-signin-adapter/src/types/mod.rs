/*
[INPUT]:  Wallet kinds, service payload schemas and serde requirements
[OUTPUT]: Typed Rust models shared across the sign-in flow
[POS]:    Data layer - type definitions
[UPDATE]: When the service schema changes or new flow artifacts are added
*/

pub mod enums;
pub mod models;

pub use enums::*;
pub use models::*;
