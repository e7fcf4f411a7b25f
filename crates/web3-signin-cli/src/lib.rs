/*
[INPUT]:  CLI modules
[OUTPUT]: Command implementations and terminal UI for the sign-in runner
[POS]:    CLI crate root - module wiring
[UPDATE]: When adding commands or output surfaces
*/

pub mod commands;
pub mod terminal;

pub use commands::{RejectStage, load_config, local_wallet};
pub use terminal::TerminalReflector;
