// ABOUTME: GuideService turns one chat message into one user-facing reply.
// ABOUTME: Never surfaces raw runtime errors; degrades to a greeting, fallback, or apology.

use crate::config::Config;
use crate::metrics;
use crate::session::resolve_session_id;
use crate::traits::{MessageStore, NewMessage, NotificationJob, NotificationQueue};
use guide_agent::{
    consume, finalize, AgentRuntime, Citation, ConsumeError, FinalReply, InvokeRequest,
    StreamError, StreamInitiationError,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Returned for an empty message, before any runtime call
pub const GREETING_REPLY: &str = "Hi! I'm the AI Guide. Ask me about your courses, learning plans, or anything else I can help you find.";

/// Returned whenever the reply could not be produced
pub const APOLOGY_REPLY: &str =
    "Sorry, I encountered an error while processing your request. Please try again later.";

const PREVIEW_CHARS: usize = 120;

/// One inbound chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRequest {
    pub user_id: String,
    pub conversation_id: String,
    pub message: String,
    /// Caller-supplied session id; derived from user and conversation when absent
    #[serde(default)]
    pub session_id: Option<String>,
}

impl ChatRequest {
    pub fn new(
        user_id: impl Into<String>,
        conversation_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            conversation_id: conversation_id.into(),
            message: message.into(),
            session_id: None,
        }
    }
}

/// How the reply text was produced
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReplyOutcome {
    /// The agent's answer
    Answered,
    /// The agent produced no usable text
    Fallback,
    /// The message was empty
    Greeting,
    /// The runtime failed or timed out
    Apology,
    /// The caller abandoned the request
    Cancelled,
}

impl ReplyOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Answered => "answered",
            Self::Fallback => "fallback",
            Self::Greeting => "greeting",
            Self::Apology => "apology",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ReplyOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the caller gets back for one chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GuideReply {
    pub text: String,
    pub outcome: ReplyOutcome,
    pub citations: Vec<Citation>,
    pub session_id: String,
    /// Id of the persisted reply, when persistence succeeded
    pub message_id: Option<i64>,
}

/// Settings the service needs from configuration
#[derive(Debug, Clone)]
pub struct GuideSettings {
    pub agent_id: String,
    pub agent_alias_id: String,
    pub enable_trace: bool,
    pub sender_name: String,
    pub timeout: Option<Duration>,
}

impl Default for GuideSettings {
    fn default() -> Self {
        Self {
            agent_id: String::new(),
            agent_alias_id: String::new(),
            enable_trace: false,
            sender_name: "AI Guide".to_string(),
            timeout: None,
        }
    }
}

impl From<&Config> for GuideSettings {
    fn from(config: &Config) -> Self {
        Self {
            agent_id: config.agent.agent_id.clone(),
            agent_alias_id: config.agent.agent_alias_id.clone(),
            enable_trace: config.agent.enable_trace,
            sender_name: config.guide.sender_name.clone(),
            timeout: config.guide.timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Why a reply could not be generated
#[derive(Debug)]
enum GenerateError {
    Initiation(StreamInitiationError),
    /// The stream broke before yielding a single event
    Failed(StreamError),
    Cancelled,
    TimedOut(Duration),
}

/// Result of a successful generation
struct Generated {
    reply: FinalReply,
    citations: Vec<Citation>,
}

pub struct GuideService {
    runtime: Arc<dyn AgentRuntime>,
    store: Arc<dyn MessageStore>,
    queue: Option<Arc<dyn NotificationQueue>>,
    settings: GuideSettings,
}

impl GuideService {
    pub fn new(
        runtime: Arc<dyn AgentRuntime>,
        store: Arc<dyn MessageStore>,
        settings: GuideSettings,
    ) -> Self {
        Self {
            runtime,
            store,
            queue: None,
            settings,
        }
    }

    /// Enqueue a notification job for every persisted reply
    pub fn with_queue(mut self, queue: Arc<dyn NotificationQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn runtime_name(&self) -> &'static str {
        self.runtime.name()
    }

    pub fn store(&self) -> &Arc<dyn MessageStore> {
        &self.store
    }

    /// Produce the reply for one chat message.
    ///
    /// Always returns a reply; runtime failures become `APOLOGY_REPLY` and are
    /// logged in full. Cancelling the token stops reading the agent stream.
    pub async fn respond(&self, request: ChatRequest, cancel: CancellationToken) -> GuideReply {
        let session_id = resolve_session_id(
            request.session_id.as_deref(),
            &request.user_id,
            &request.conversation_id,
        );
        let message = request.message.trim();

        if message.is_empty() {
            tracing::debug!(conversation_id = %request.conversation_id, "Empty message, sending greeting");
            return self.finish(
                ReplyOutcome::Greeting,
                GREETING_REPLY.to_string(),
                Vec::new(),
                session_id,
                None,
            );
        }

        tracing::info!(
            user_id = %request.user_id,
            conversation_id = %request.conversation_id,
            session_id = %session_id,
            runtime = self.runtime.name(),
            message_len = message.len(),
            "Guide request received"
        );

        if let Err(e) = self
            .store
            .save_message(&NewMessage::new(&request.conversation_id, &request.user_id, message))
            .await
        {
            tracing::error!(error = %e, conversation_id = %request.conversation_id, "Failed to persist user message");
            metrics::record_error("store");
        }

        let invoke = InvokeRequest {
            agent_id: self.settings.agent_id.clone(),
            agent_alias_id: self.settings.agent_alias_id.clone(),
            session_id: session_id.clone(),
            input_text: message.to_string(),
            enable_trace: self.settings.enable_trace,
        };

        let started = Instant::now();
        let result = match self.settings.timeout {
            Some(limit) => tokio::time::timeout(limit, self.generate(&invoke, &cancel))
                .await
                .unwrap_or(Err(GenerateError::TimedOut(limit))),
            None => self.generate(&invoke, &cancel).await,
        };
        metrics::record_stream_duration(started.elapsed());

        let (outcome, text, citations) = match result {
            Ok(Generated { reply, citations }) => {
                let outcome = if reply.is_fallback() {
                    tracing::info!(kind = ?reply.kind, session_id = %session_id, "Agent produced no usable text");
                    ReplyOutcome::Fallback
                } else {
                    ReplyOutcome::Answered
                };
                metrics::record_citations(citations.len());
                (outcome, reply.text, citations)
            }
            Err(GenerateError::Cancelled) => {
                tracing::info!(session_id = %session_id, "Guide request cancelled by caller");
                return self.finish(
                    ReplyOutcome::Cancelled,
                    APOLOGY_REPLY.to_string(),
                    Vec::new(),
                    session_id,
                    None,
                );
            }
            Err(GenerateError::Initiation(e)) => {
                tracing::error!(
                    error = %e,
                    error_message = %e.message,
                    code = ?e.code,
                    status = ?e.status,
                    request_id = ?e.request_id,
                    detail = ?e,
                    session_id = %session_id,
                    "Agent stream failed to start"
                );
                metrics::record_error("stream_initiation");
                (ReplyOutcome::Apology, APOLOGY_REPLY.to_string(), Vec::new())
            }
            Err(GenerateError::Failed(e)) => {
                tracing::error!(error = %e, session_id = %session_id, "Agent stream failed before any event");
                metrics::record_error("stream_failed");
                (ReplyOutcome::Apology, APOLOGY_REPLY.to_string(), Vec::new())
            }
            Err(GenerateError::TimedOut(limit)) => {
                tracing::error!(timeout_secs = limit.as_secs(), session_id = %session_id, "Agent reply timed out");
                metrics::record_error("timeout");
                (ReplyOutcome::Apology, APOLOGY_REPLY.to_string(), Vec::new())
            }
        };

        let message_id = self.deliver(&request, &text, &citations).await;
        self.finish(outcome, text, citations, session_id, message_id)
    }

    async fn generate(
        &self,
        invoke: &InvokeRequest,
        cancel: &CancellationToken,
    ) -> Result<Generated, GenerateError> {
        let stream = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(GenerateError::Cancelled),
            started = self.runtime.invoke(invoke) => started.map_err(GenerateError::Initiation)?,
        };

        let accumulated = consume(stream, cancel).await.map_err(|e| match e {
            ConsumeError::Cancelled => GenerateError::Cancelled,
        })?;

        if accumulated.events_seen == 0 {
            if let Some(e) = accumulated.interrupted {
                return Err(GenerateError::Failed(e));
            }
        }

        if let Some(ref interruption) = accumulated.interrupted {
            metrics::record_error("stream_interrupted");
            tracing::warn!(
                error = %interruption,
                fragments = accumulated.fragments.len(),
                "Using partial reply from interrupted stream"
            );
        }

        Ok(Generated {
            reply: finalize(&accumulated),
            citations: accumulated.citations,
        })
    }

    /// Persist the reply and enqueue its notification; failures are logged only
    async fn deliver(
        &self,
        request: &ChatRequest,
        text: &str,
        citations: &[Citation],
    ) -> Option<i64> {
        let reply = NewMessage::new(&request.conversation_id, &self.settings.sender_name, text)
            .with_citations(citations.to_vec());

        let message_id = match self.store.save_message(&reply).await {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(error = %e, conversation_id = %request.conversation_id, "Failed to persist guide reply");
                metrics::record_error("store");
                return None;
            }
        };

        if let Some(ref queue) = self.queue {
            let job = NotificationJob {
                conversation_id: request.conversation_id.clone(),
                message_id,
                recipient: request.user_id.clone(),
                preview: text.chars().take(PREVIEW_CHARS).collect(),
            };
            if let Err(e) = queue.enqueue(job).await {
                tracing::error!(error = %e, message_id, "Failed to enqueue reply notification");
                metrics::record_error("notification");
            }
        }

        Some(message_id)
    }

    fn finish(
        &self,
        outcome: ReplyOutcome,
        text: String,
        citations: Vec<Citation>,
        session_id: String,
        message_id: Option<i64>,
    ) -> GuideReply {
        metrics::record_reply(outcome.as_str());
        GuideReply {
            text,
            outcome,
            citations,
            session_id,
            message_id,
        }
    }
}
