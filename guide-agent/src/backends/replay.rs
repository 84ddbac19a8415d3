// ABOUTME: Replay runtime - plays back recorded agent streams from a JSON transcript.
// ABOUTME: Enables offline demos and deterministic tests against captured wire events.

use crate::error::{StreamError, StreamInitiationError};
use crate::runtime::{AgentRuntime, EventStream, InvokeRequest};
use crate::wire;
use anyhow::{Context, Result};
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// One recorded prompt and the wire events the runtime streamed back
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub prompt: String,
    /// Wire-format events, in delivery order
    pub events: Vec<Value>,
    /// If set, the stream breaks with this transport error after the events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interrupted: Option<String>,
}

/// Replays recorded interactions; each one is served at most once
pub struct ReplayRuntime {
    transcript: Arc<Mutex<VecDeque<Interaction>>>,
}

#[derive(Debug, Deserialize)]
struct ReplayConfig {
    transcript: PathBuf,
}

impl ReplayRuntime {
    /// Create a replay runtime from a transcript
    pub fn from_transcript(transcript: Vec<Interaction>) -> Self {
        Self {
            transcript: Arc::new(Mutex::new(transcript.into())),
        }
    }

    /// Load a transcript from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read transcript: {}", path.display()))?;
        let transcript: Vec<Interaction> = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse transcript: {}", path.display()))?;
        tracing::debug!(path = %path.display(), interactions = transcript.len(), "Loaded transcript");
        Ok(Self::from_transcript(transcript))
    }

    /// Prompts still available for replay
    pub fn prompts(&self) -> Vec<String> {
        self.transcript
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|i| i.prompt.clone())
            .collect()
    }

    /// Factory function for the registry
    pub fn factory() -> crate::registry::RuntimeFactory {
        Box::new(|config| {
            let cfg: ReplayConfig = serde_json::from_value(config.clone())?;
            Ok(Arc::new(ReplayRuntime::from_file(&cfg.transcript)?))
        })
    }
}

impl AgentRuntime for ReplayRuntime {
    fn name(&self) -> &'static str {
        "replay"
    }

    fn invoke<'a>(
        &'a self,
        request: &'a InvokeRequest,
    ) -> BoxFuture<'a, Result<EventStream, StreamInitiationError>> {
        Box::pin(async move {
            let interaction = {
                let mut t = self.transcript.lock().unwrap_or_else(|e| e.into_inner());
                t.iter()
                    .position(|i| i.prompt == request.input_text)
                    .and_then(|idx| t.remove(idx))
            };

            let Some(interaction) = interaction else {
                return Err(StreamInitiationError::new(format!(
                    "no recorded interaction for prompt: {}",
                    request.input_text
                ))
                .with_code("ReplayMiss")
                .with_status(404));
            };

            let events = interaction
                .events
                .into_iter()
                .map(|value| Ok(wire::event_from_value(value)));
            let tail = interaction
                .interrupted
                .map(|message| Err(StreamError::Transport(message)));

            Ok(stream::iter(events.chain(tail)).boxed())
        })
    }
}
