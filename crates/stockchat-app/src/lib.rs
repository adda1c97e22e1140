// Client-side logic: the research API client, the ticker workflow, the
// streaming chat session and the orchestrator that ties them to the UI.

pub mod api;
pub mod app;
pub mod chat;
pub mod decoder;
pub mod workflow;
