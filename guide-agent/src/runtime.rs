// ABOUTME: AgentRuntime trait that every agent backend implements.
// ABOUTME: A runtime turns one prompt into an ordered stream of StreamEvents.

use crate::error::{StreamError, StreamInitiationError};
use crate::event::StreamEvent;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

/// Ordered events of one streaming call; an `Err` item means the stream broke
pub type EventStream = BoxStream<'static, Result<StreamEvent, StreamError>>;

/// Everything a runtime needs to start one streaming reply
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvokeRequest {
    /// Identifier of the remote agent
    pub agent_id: String,
    /// Alias (deployment) of the remote agent
    pub agent_alias_id: String,
    /// Sanitized session key; the runtime keeps cross-turn memory under it
    pub session_id: String,
    /// The user's message
    pub input_text: String,
    /// Ask the runtime to include trace events in the stream
    #[serde(default)]
    pub enable_trace: bool,
}

impl InvokeRequest {
    pub fn new(session_id: impl Into<String>, input_text: impl Into<String>) -> Self {
        Self {
            agent_id: String::new(),
            agent_alias_id: String::new(),
            session_id: session_id.into(),
            input_text: input_text.into(),
            enable_trace: false,
        }
    }

    pub fn with_agent(mut self, agent_id: impl Into<String>, alias_id: impl Into<String>) -> Self {
        self.agent_id = agent_id.into();
        self.agent_alias_id = alias_id.into();
        self
    }
}

/// Core trait that all agent runtimes implement.
///
/// `invoke` resolves once the streaming call is established. Failing to
/// establish it is the only error reported through the future; anything that
/// goes wrong afterwards arrives as an `Err` item on the stream.
pub trait AgentRuntime: Send + Sync {
    /// Runtime name for logging and metrics
    fn name(&self) -> &'static str;

    /// Start a streaming reply for the given request
    fn invoke<'a>(
        &'a self,
        request: &'a InvokeRequest,
    ) -> BoxFuture<'a, Result<EventStream, StreamInitiationError>>;
}
