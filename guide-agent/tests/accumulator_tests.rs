// ABOUTME: Tests for stream consumption and reply finalization end to end.
// ABOUTME: Covers ordering, fallback selection, whitespace collapsing, citations, and interruption.

use futures::stream;
use guide_agent::{
    consume, finalize, Citation, FinalReplyKind, StreamError, StreamEvent, FALLBACK_REPLY,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;

fn text(t: &str) -> StreamEvent {
    StreamEvent::OutputText {
        text: t.to_string(),
    }
}

async fn consume_events(events: Vec<StreamEvent>) -> guide_agent::AccumulatedReply {
    let cancel = CancellationToken::new();
    consume(stream::iter(events.into_iter().map(Ok)), &cancel)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_output_text_events_concatenate_in_order() {
    let reply = consume_events(vec![text("Your "), text("manager "), text("approves leave.")]).await;

    assert_eq!(reply.fragments, vec!["Your ", "manager ", "approves leave."]);
    assert!(reply.saw_any_output);
    assert_eq!(finalize(&reply).text, "Your manager approves leave.");
}

#[tokio::test]
async fn test_only_empty_chunks_yield_fallback() {
    let reply = consume_events(vec![
        StreamEvent::Chunk {
            bytes: vec![],
            attribution: None,
        },
        StreamEvent::chunk_text(""),
    ])
    .await;

    assert!(!reply.saw_any_output);
    let final_reply = finalize(&reply);
    assert_eq!(final_reply.text, FALLBACK_REPLY);
    assert_eq!(final_reply.kind, FinalReplyKind::NoOutput);
}

#[tokio::test]
async fn test_empty_then_non_empty_text() {
    let reply = consume_events(vec![text(""), text("  Course starts Monday.  ")]).await;

    assert!(reply.saw_any_output);
    assert_eq!(finalize(&reply).text, "Course starts Monday.");
}

#[tokio::test]
async fn test_newline_followed_by_spaces_collapses() {
    let reply = consume_events(vec![StreamEvent::chunk_text("Hello\n   world")]).await;
    assert_eq!(finalize(&reply).text, "Hello world");
}

#[tokio::test]
async fn test_whitespace_only_output_uses_fallback() {
    let reply = consume_events(vec![text(" \n "), StreamEvent::chunk_text("\t")]).await;

    assert!(reply.saw_any_output);
    let final_reply = finalize(&reply);
    assert_eq!(final_reply.text, FALLBACK_REPLY);
    assert_eq!(final_reply.kind, FinalReplyKind::WhitespaceOnly);
}

#[tokio::test]
async fn test_citation_without_references_and_later_events_unaffected() {
    let reply = consume_events(vec![
        StreamEvent::Chunk {
            bytes: b"Mandatory training ".to_vec(),
            attribution: Some(json!({
                "citations": [
                    {"generatedResponsePart": {"textResponsePart": {"text": "Mandatory training"}}},
                    {}
                ]
            })),
        },
        StreamEvent::chunk_text("is due in March."),
    ])
    .await;

    assert_eq!(
        reply.citations,
        vec![
            Citation {
                text: Some("Mandatory training".to_string()),
                source: None,
            },
            Citation {
                text: None,
                source: None,
            },
        ]
    );
    assert_eq!(finalize(&reply).text, "Mandatory training is due in March.");
}

#[tokio::test]
async fn test_malformed_attribution_does_not_drop_text() {
    let reply = consume_events(vec![
        StreamEvent::Chunk {
            bytes: b"First. ".to_vec(),
            attribution: Some(json!({"citations": {"not": "a list"}})),
        },
        StreamEvent::Chunk {
            bytes: b"Second.".to_vec(),
            attribution: Some(json!({
                "citations": [{
                    "retrievedReferences": [
                        {"location": {"s3Location": {"uri": "s3://kb/handbook.pdf"}}}
                    ]
                }]
            })),
        },
    ])
    .await;

    assert_eq!(reply.fragments, vec!["First. ", "Second."]);
    assert_eq!(reply.citations.len(), 1);
    assert_eq!(reply.citations[0].source.as_deref(), Some("s3://kb/handbook.pdf"));
}

#[tokio::test]
async fn test_citation_order_follows_event_order() {
    let cite = |src: &str| {
        json!({"citations": [{"retrievedReferences": [{"location": {"webLocation": {"url": src}}}]}]})
    };
    let reply = consume_events(vec![
        StreamEvent::Chunk {
            bytes: b"a".to_vec(),
            attribution: Some(cite("https://one")),
        },
        StreamEvent::Unknown {
            kind: "trace".to_string(),
        },
        StreamEvent::Chunk {
            bytes: b"b".to_vec(),
            attribution: Some(cite("https://two")),
        },
    ])
    .await;

    let sources: Vec<_> = reply
        .citations
        .iter()
        .map(|c| c.source.clone().unwrap())
        .collect();
    assert_eq!(sources, vec!["https://one", "https://two"]);
    assert_eq!(reply.events_seen, 3);
}

#[tokio::test]
async fn test_interrupted_stream_keeps_partial_reply() {
    let cancel = CancellationToken::new();
    let events = vec![
        Ok(text("Partial answer")),
        Err(StreamError::Transport("connection reset".to_string())),
        Ok(text(" never seen")),
    ];

    let reply = consume(stream::iter(events), &cancel).await.unwrap();

    assert_eq!(reply.fragments, vec!["Partial answer"]);
    assert_eq!(
        reply.interrupted,
        Some(StreamError::Transport("connection reset".to_string()))
    );
    assert_eq!(finalize(&reply).text, "Partial answer");
}

#[tokio::test]
async fn test_reprocessing_same_events_is_deterministic() {
    let events = vec![
        StreamEvent::Chunk {
            bytes: b"Line one\n".to_vec(),
            attribution: Some(json!({"citations": [
                {"generatedResponsePart": {"textResponsePart": {"text": "one"}}}
            ]})),
        },
        text("  line two"),
    ];

    let first = consume_events(events.clone()).await;
    let second = consume_events(events).await;

    assert_eq!(first, second);
    assert_eq!(finalize(&first), finalize(&second));
    assert_eq!(finalize(&first).text, "Line one line two");
}

#[tokio::test]
async fn test_bad_citation_entry_keeps_sibling_citations() {
    let reply = consume_events(vec![StreamEvent::Chunk {
        bytes: b"See the policy.".to_vec(),
        attribution: Some(json!({"citations": [
            {
                "generatedResponsePart": {"textResponsePart": {"text": "the policy"}},
                "retrievedReferences": [{"location": {"s3Location": {"uri": "s3://kb/policy.pdf"}}}]
            },
            {
                "generatedResponsePart": {"textResponsePart": {"text": 7}},
                "retrievedReferences": {"unexpected": "object"}
            }
        ]})),
    }])
    .await;

    assert_eq!(
        reply.citations,
        vec![
            Citation {
                text: Some("the policy".to_string()),
                source: Some("s3://kb/policy.pdf".to_string()),
            },
            Citation {
                text: None,
                source: None,
            },
        ]
    );
    assert_eq!(finalize(&reply).text, "See the policy.");
}
