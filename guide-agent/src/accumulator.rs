// ABOUTME: Stream consumer that folds agent events into an AccumulatedReply.
// ABOUTME: Visits each event once, in order; citation failures and mid-stream breaks stay local.

use crate::error::{ConsumeError, StreamError};
use crate::event::{Citation, StreamEvent};
use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

/// Reply text and citations collected from one streaming call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccumulatedReply {
    /// Text fragments in arrival order
    pub fragments: Vec<String>,
    /// Citations in arrival order
    pub citations: Vec<Citation>,
    /// True once any non-empty fragment was appended (even whitespace)
    pub saw_any_output: bool,
    /// Number of events visited, including unknown ones
    pub events_seen: usize,
    /// Set when the stream broke before it ended normally
    pub interrupted: Option<StreamError>,
}

impl AccumulatedReply {
    /// Fold a single event into the reply
    pub fn absorb(&mut self, event: &StreamEvent) {
        let index = self.events_seen;
        self.events_seen += 1;

        let decoded = event.decode();

        if let Some(fragment) = decoded.fragment {
            self.fragments.push(fragment);
            self.saw_any_output = true;
        }

        match decoded.citations {
            Some(Ok(batch)) => self.citations.extend(batch),
            Some(Err(e)) => {
                tracing::warn!(error = %e, event_index = index, "Skipping malformed citation attribution");
            }
            None => {}
        }

        if let StreamEvent::Unknown { kind } = event {
            tracing::trace!(kind = %kind, event_index = index, "Ignoring unrecognised stream event");
        }
    }

    /// Fragments concatenated in order with no separator
    pub fn text(&self) -> String {
        self.fragments.concat()
    }
}

/// Consume an event stream to completion.
///
/// A stream error ends consumption early: the reply collected so far is
/// returned with `interrupted` set. Cancelling the token drops the stream
/// (releasing the underlying connection) and returns `ConsumeError::Cancelled`.
pub async fn consume<S>(
    mut stream: S,
    cancel: &CancellationToken,
) -> Result<AccumulatedReply, ConsumeError>
where
    S: Stream<Item = Result<StreamEvent, StreamError>> + Unpin,
{
    let mut reply = AccumulatedReply::default();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!(events_seen = reply.events_seen, "Stream consumption cancelled");
                return Err(ConsumeError::Cancelled);
            }
            next = stream.next() => next,
        };

        match next {
            Some(Ok(event)) => reply.absorb(&event),
            Some(Err(e)) => {
                tracing::warn!(
                    error = %e,
                    events_seen = reply.events_seen,
                    fragments = reply.fragments.len(),
                    "Agent stream interrupted, keeping partial reply"
                );
                reply.interrupted = Some(e);
                break;
            }
            None => break,
        }
    }

    tracing::debug!(
        events_seen = reply.events_seen,
        fragments = reply.fragments.len(),
        citations = reply.citations.len(),
        saw_any_output = reply.saw_any_output,
        "Agent stream consumed"
    );

    Ok(reply)
}
