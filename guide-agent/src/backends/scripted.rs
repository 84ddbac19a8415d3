// ABOUTME: Scripted runtime for testing - replays pre-configured event sequences per prompt.
// ABOUTME: Allows deterministic tests of stream consumption without a remote agent service.
//!
//! # Example
//!
//! ```no_run
//! use guide_agent::backends::scripted::ScriptedRuntime;
//! use guide_agent::{AgentRuntime, InvokeRequest, StreamEvent};
//!
//! # async fn example() {
//! let runtime = ScriptedRuntime::new()
//!     .on_prompt("hello").respond_text("Hi there!")
//!     .on_prompt("policy").respond_with(vec![
//!         StreamEvent::chunk_text("Annual leave is "),
//!         StreamEvent::chunk_text("25 days."),
//!     ]);
//!
//! let request = InvokeRequest::new("session-1", "hello");
//! let stream = runtime.invoke(&request).await.unwrap();
//! # }
//! ```

use crate::error::{StreamError, StreamInitiationError};
use crate::event::StreamEvent;
use crate::runtime::{AgentRuntime, EventStream, InvokeRequest};
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Scripted runtime for tests and demos.
///
/// Clones share the same script and invocation log, so a test can keep one
/// clone for assertions after handing another to the code under test.
#[derive(Clone, Default)]
pub struct ScriptedRuntime {
    expectations: Arc<Mutex<VecDeque<Expectation>>>,
    invocations: Arc<Mutex<Vec<InvokeRequest>>>,
}

struct Expectation {
    pattern: String,
    script: Script,
}

enum Script {
    Events(Vec<StreamEvent>),
    Interrupt {
        events: Vec<StreamEvent>,
        error: StreamError,
    },
    FailToStart(StreamInitiationError),
}

impl ScriptedRuntime {
    /// Create a runtime with no expectations
    pub fn new() -> Self {
        Self::default()
    }

    /// Set up an expectation for a prompt containing the given pattern
    pub fn on_prompt(self, pattern: &str) -> ExpectationBuilder {
        ExpectationBuilder {
            runtime: self,
            pattern: pattern.to_string(),
        }
    }

    /// Requests received so far, in order
    pub fn invocations(&self) -> Vec<InvokeRequest> {
        self.invocations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of expectations not yet consumed
    pub fn pending(&self) -> usize {
        self.expectations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Factory function for the registry
    pub fn factory() -> crate::registry::RuntimeFactory {
        Box::new(|_config| Ok(Arc::new(ScriptedRuntime::new())))
    }

    fn take_script(&self, text: &str) -> Option<Script> {
        let mut exp = self.expectations.lock().unwrap_or_else(|e| e.into_inner());
        // Front of the queue first so in-order prompts stay deterministic,
        // then the first later expectation that matches.
        match exp.front() {
            Some(front) if text.contains(&front.pattern) => exp.pop_front().map(|e| e.script),
            Some(_) => exp
                .iter()
                .position(|e| text.contains(&e.pattern))
                .and_then(|i| exp.remove(i))
                .map(|e| e.script),
            None => None,
        }
    }
}

impl AgentRuntime for ScriptedRuntime {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn invoke<'a>(
        &'a self,
        request: &'a InvokeRequest,
    ) -> BoxFuture<'a, Result<EventStream, StreamInitiationError>> {
        Box::pin(async move {
            self.invocations
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(request.clone());

            let stream: EventStream = match self.take_script(&request.input_text) {
                Some(Script::Events(events)) => stream::iter(events.into_iter().map(Ok)).boxed(),
                Some(Script::Interrupt { events, error }) => stream::iter(events.into_iter().map(Ok))
                    .chain(stream::once(async move { Err(error) }))
                    .boxed(),
                Some(Script::FailToStart(error)) => return Err(error),
                None => {
                    let text = format!("Scripted: no expectation for '{}'", request.input_text);
                    stream::iter(vec![Ok(StreamEvent::OutputText { text })]).boxed()
                }
            };

            Ok(stream)
        })
    }
}

/// Builder for setting up expectations with a fluent API
pub struct ExpectationBuilder {
    runtime: ScriptedRuntime,
    pattern: String,
}

impl ExpectationBuilder {
    fn push(self, script: Script) -> ScriptedRuntime {
        self.runtime
            .expectations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Expectation {
                pattern: self.pattern,
                script,
            });
        self.runtime
    }

    /// Respond with a list of events
    pub fn respond_with(self, events: Vec<StreamEvent>) -> ScriptedRuntime {
        self.push(Script::Events(events))
    }

    /// Respond with a single output-text event
    pub fn respond_text(self, text: &str) -> ScriptedRuntime {
        self.respond_with(vec![StreamEvent::OutputText {
            text: text.to_string(),
        }])
    }

    /// Respond with the given events, then break the stream with an error
    pub fn interrupt_after(self, events: Vec<StreamEvent>, error: StreamError) -> ScriptedRuntime {
        self.push(Script::Interrupt { events, error })
    }

    /// Fail before any stream is established
    pub fn fail_to_start(self, error: StreamInitiationError) -> ScriptedRuntime {
        self.push(Script::FailToStart(error))
    }
}
