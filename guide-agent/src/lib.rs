// ABOUTME: Agent runtime abstraction for the AI Guide.
// ABOUTME: Decodes streamed agent events, accumulates text and citations, and finalizes replies.

pub mod accumulator;
pub mod config;
pub mod error;
pub mod event;
pub mod finalizer;
pub mod registry;
pub mod runtime;
pub mod wire;

pub mod backends;

pub use accumulator::{consume, AccumulatedReply};
pub use error::{CitationParseError, ConsumeError, StreamError, StreamInitiationError};
pub use event::{Citation, DecodedEvent, StreamEvent};
pub use finalizer::{finalize, FinalReply, FinalReplyKind, FALLBACK_REPLY};
pub use registry::RuntimeRegistry;
pub use runtime::{AgentRuntime, EventStream, InvokeRequest};
