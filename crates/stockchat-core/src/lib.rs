// Shared types for the stockchat workspace: configuration, the ticker
// symbol, and the message types exchanged between the app orchestrator and
// the terminal UI.

pub mod config;
pub mod protocol;
pub mod ticker;
