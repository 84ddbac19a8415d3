// ABOUTME: Root library module for the AI Guide service.
// ABOUTME: Exposes the HTTP server and re-exports the orchestration and runtime crates.

pub mod server;

// Re-export platform-agnostic modules from guide-core
pub use guide_core::config;
pub use guide_core::metrics;
pub use guide_core::orchestrator;
pub use guide_core::queue;
pub use guide_core::session;
pub use guide_core::store;

pub use guide_core::{
    ChatRequest, GuideReply, GuideService, MessageStore, ReplyOutcome, StoredMessage,
};

// Re-export guide-agent runtime types
pub use guide_agent::backends;
pub use guide_agent::{AgentRuntime, Citation, RuntimeRegistry};
