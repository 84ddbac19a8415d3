// ABOUTME: Event types received from the agent runtime while a reply streams in.
// ABOUTME: Each event decodes into an optional text fragment plus optional citations.

use crate::error::CitationParseError;
use crate::wire;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Events emitted by an agent runtime during one streaming call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum StreamEvent {
    /// Direct text output
    OutputText {
        text: String,
    },

    /// Encoded chunk of the reply, optionally with attribution metadata
    Chunk {
        /// Raw bytes as delivered by the runtime (UTF-8 text when well-formed)
        bytes: Vec<u8>,
        /// Attribution payload, kept raw so a malformed one stays local to this event
        attribution: Option<Value>,
    },

    /// Any event shape the consumer does not understand
    Unknown {
        /// Name of the event shape (e.g. "trace", "returnControl")
        kind: String,
    },
}

/// Structured pointer from part of the answer back to its source
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Citation {
    /// Quoted text from the generated response this citation supports
    pub text: Option<String>,
    /// Location of the retrieved reference (URI or URL)
    pub source: Option<String>,
}

/// What a single event contributes to the reply
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedEvent {
    /// Non-empty text fragment, if the event produced one
    pub fragment: Option<String>,
    /// Citation batch, present only when the event carried attribution
    pub citations: Option<Result<Vec<Citation>, CitationParseError>>,
}

impl StreamEvent {
    /// Convenience constructor for a text chunk event without attribution
    pub fn chunk_text(text: &str) -> Self {
        StreamEvent::Chunk {
            bytes: text.as_bytes().to_vec(),
            attribution: None,
        }
    }

    /// Decode this event into its contribution to the reply.
    ///
    /// Empty text and undecodable bytes contribute no fragment. Unknown events
    /// contribute nothing at all.
    pub fn decode(&self) -> DecodedEvent {
        match self {
            StreamEvent::OutputText { text } => DecodedEvent {
                fragment: non_empty(text.clone()),
                citations: None,
            },
            StreamEvent::Chunk { bytes, attribution } => {
                let fragment = match std::str::from_utf8(bytes) {
                    Ok(text) => non_empty(text.to_string()),
                    Err(e) => {
                        tracing::debug!(error = %e, len = bytes.len(), "Chunk bytes are not valid UTF-8");
                        None
                    }
                };
                DecodedEvent {
                    fragment,
                    citations: attribution.as_ref().map(wire::extract_citations),
                }
            }
            StreamEvent::Unknown { .. } => DecodedEvent::default(),
        }
    }
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
