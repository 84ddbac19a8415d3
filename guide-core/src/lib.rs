// ABOUTME: Chat orchestration for the AI Guide.
// ABOUTME: Wraps stream consumption with session keys, fallbacks, persistence, and notifications.

pub mod config;
pub mod metrics;
pub mod orchestrator;
pub mod queue;
pub mod session;
pub mod store;
pub mod traits;

pub use orchestrator::{
    ChatRequest, GuideReply, GuideService, ReplyOutcome, APOLOGY_REPLY, GREETING_REPLY,
};
pub use traits::{MessageStore, NewMessage, NotificationJob, NotificationQueue, StoredMessage};

// Re-export guide-agent types
pub use guide_agent::{AgentRuntime, Citation, RuntimeRegistry};
