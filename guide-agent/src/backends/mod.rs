// ABOUTME: Agent runtime implementations (scripted, process, replay).
// ABOUTME: Each backend implements the AgentRuntime trait.

pub mod process;
pub mod replay;
pub mod scripted;
