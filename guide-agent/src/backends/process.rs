// ABOUTME: Process runtime - spawns an agent bridge command and reads JSONL wire events from stdout.
// ABOUTME: Spawn failures are initiation errors; a non-zero exit ends the stream with an error.

use crate::error::{StreamError, StreamInitiationError};
use crate::runtime::{AgentRuntime, EventStream, InvokeRequest};
use crate::wire;
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command as ProcessCommand};

/// Configuration for the process runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessConfig {
    /// Bridge command to run (receives the prompt as its last argument)
    pub command: String,
    /// Arguments placed before the prompt
    #[serde(default)]
    pub args: Vec<String>,
    /// Working directory for the command
    pub working_dir: Option<PathBuf>,
    /// Extra environment variables
    #[serde(default)]
    pub env: HashMap<String, String>,
}

pub struct ProcessRuntime {
    config: ProcessConfig,
}

impl ProcessRuntime {
    pub fn new(config: ProcessConfig) -> Self {
        Self { config }
    }

    /// Factory function for the registry
    pub fn factory() -> crate::registry::RuntimeFactory {
        Box::new(|config| {
            let cfg: ProcessConfig = serde_json::from_value(config.clone())?;
            Ok(Arc::new(ProcessRuntime::new(cfg)))
        })
    }

    fn spawn(&self, request: &InvokeRequest) -> Result<Child, StreamInitiationError> {
        let mut cmd = ProcessCommand::new(&self.config.command);
        cmd.args(&self.config.args)
            .arg(&request.input_text)
            .envs(&self.config.env)
            .env("GUIDE_AGENT_ID", &request.agent_id)
            .env("GUIDE_AGENT_ALIAS_ID", &request.agent_alias_id)
            .env("GUIDE_SESSION_ID", &request.session_id)
            .env("GUIDE_ENABLE_TRACE", request.enable_trace.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(ref dir) = self.config.working_dir {
            cmd.current_dir(dir);
        }

        tracing::debug!(
            command = %self.config.command,
            args = ?self.config.args,
            session_id = %request.session_id,
            "Spawning agent bridge"
        );

        cmd.spawn().map_err(|e| {
            StreamInitiationError::new(format!(
                "failed to spawn '{}': {}",
                self.config.command, e
            ))
            .with_code("SpawnFailed")
        })
    }
}

impl AgentRuntime for ProcessRuntime {
    fn name(&self) -> &'static str {
        "process"
    }

    fn invoke<'a>(
        &'a self,
        request: &'a InvokeRequest,
    ) -> BoxFuture<'a, Result<EventStream, StreamInitiationError>> {
        Box::pin(async move {
            let mut child = self.spawn(request)?;

            let stdout = child.stdout.take().ok_or_else(|| {
                StreamInitiationError::new("failed to capture bridge stdout").with_code("SpawnFailed")
            })?;

            if let Some(stderr) = child.stderr.take() {
                tokio::spawn(async move {
                    let mut lines = BufReader::new(stderr).lines();
                    while let Ok(Some(line)) = lines.next_line().await {
                        if !line.is_empty() {
                            tracing::warn!(stderr = %line, "Agent bridge stderr");
                        }
                    }
                });
            }

            let state = BridgeOutput {
                lines: BufReader::new(stdout).lines(),
                child,
            };

            Ok(stream::unfold(Some(state), next_event).boxed())
        })
    }
}

/// Stdout reader plus the child that owns it; dropping this kills the child
struct BridgeOutput {
    lines: Lines<BufReader<ChildStdout>>,
    child: Child,
}

type Step = Option<(Result<crate::StreamEvent, StreamError>, Option<BridgeOutput>)>;

async fn next_event(state: Option<BridgeOutput>) -> Step {
    let mut state = state?;

    loop {
        match state.lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                match wire::parse_line(&line) {
                    Ok(event) => return Some((Ok(event), Some(state))),
                    Err(e) => {
                        tracing::warn!(error = %e, "Skipping unparseable bridge output line");
                    }
                }
            }
            Ok(None) => {
                return match state.child.wait().await {
                    Ok(status) if status.success() => None,
                    Ok(status) => Some((Err(StreamError::Exited(status.code())), None)),
                    Err(e) => Some((Err(StreamError::Transport(e.to_string())), None)),
                };
            }
            Err(e) => return Some((Err(StreamError::Transport(e.to_string())), None)),
        }
    }
}
