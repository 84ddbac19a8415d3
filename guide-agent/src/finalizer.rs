// ABOUTME: Turns an AccumulatedReply into the single string shown to the user.
// ABOUTME: Collapses newline-bearing whitespace runs, trims, and substitutes a fallback when empty.

use crate::accumulator::AccumulatedReply;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Shown whenever the agent produced no usable text
pub const FALLBACK_REPLY: &str = "I'm not entirely sure how to respond to that.";

static NEWLINE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\n\s*").expect("newline pattern is valid"));

/// How the final reply text was chosen
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinalReplyKind {
    /// The agent's own text
    Answer,
    /// The stream produced no text at all
    NoOutput,
    /// The stream produced text, but only whitespace
    WhitespaceOnly,
}

/// User-facing reply text plus how it was chosen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalReply {
    pub text: String,
    pub kind: FinalReplyKind,
}

impl FinalReply {
    pub fn is_fallback(&self) -> bool {
        self.kind != FinalReplyKind::Answer
    }
}

/// Collapse every whitespace run containing a newline to one space, then trim
pub fn normalize_whitespace(text: &str) -> String {
    NEWLINE_RUN.replace_all(text, " ").trim().to_string()
}

/// Produce the final reply. Both empty outcomes share the fallback text.
pub fn finalize(reply: &AccumulatedReply) -> FinalReply {
    let text = normalize_whitespace(&reply.text());

    if !text.is_empty() {
        return FinalReply {
            text,
            kind: FinalReplyKind::Answer,
        };
    }

    let kind = if reply.saw_any_output {
        FinalReplyKind::WhitespaceOnly
    } else {
        FinalReplyKind::NoOutput
    };

    FinalReply {
        text: FALLBACK_REPLY.to_string(),
        kind,
    }
}
