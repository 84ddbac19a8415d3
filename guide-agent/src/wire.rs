// ABOUTME: JSON wire format of agent runtime events (outputText and chunk shapes).
// ABOUTME: Converts wire JSON into StreamEvents and extracts citations from attribution payloads.

use crate::error::{json_kind, CitationParseError, StreamError};
use crate::event::{Citation, StreamEvent};
use base64::Engine as _;
use serde::Deserialize;
use serde_json::{json, Map, Value};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireOutputText {
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireChunk {
    /// Base64-encoded payload
    bytes: Option<String>,
    attribution: Option<Value>,
}

/// Location keys of a retrieved reference, in preference order
const LOCATION_POINTERS: [&str; 5] = [
    "/s3Location/uri",
    "/webLocation/url",
    "/confluenceLocation/url",
    "/sharePointLocation/url",
    "/salesforceLocation/url",
];

fn reference_source(reference: &Value) -> Option<String> {
    let location = reference.get("location")?;
    LOCATION_POINTERS
        .iter()
        .find_map(|pointer| location.pointer(pointer).and_then(Value::as_str))
        .map(str::to_string)
}

/// One citation entry; absent or wrong-typed fields become `None`
fn citation_from_entry(entry: &Value) -> Citation {
    let text = entry
        .pointer("/generatedResponsePart/textResponsePart/text")
        .and_then(Value::as_str)
        .map(str::to_string);
    let source = entry
        .get("retrievedReferences")
        .and_then(Value::as_array)
        .and_then(|references| references.iter().find_map(reference_source));
    Citation { text, source }
}

/// Parse one line of a JSONL event transport
pub fn parse_line(line: &str) -> Result<StreamEvent, StreamError> {
    let value: Value = serde_json::from_str(line.trim())
        .map_err(|e| StreamError::Malformed(format!("invalid JSON event: {}", e)))?;
    Ok(event_from_value(value))
}

/// Convert a wire JSON object into a StreamEvent.
///
/// Shapes other than `outputText` and `chunk` become `StreamEvent::Unknown`,
/// as do known shapes whose fields have the wrong types.
pub fn event_from_value(value: Value) -> StreamEvent {
    let Value::Object(mut map) = value else {
        return StreamEvent::Unknown {
            kind: json_kind(&value).to_string(),
        };
    };

    if let Some(output) = map.remove("outputText") {
        return match serde_json::from_value::<WireOutputText>(output) {
            Ok(output) => StreamEvent::OutputText {
                text: output.text.unwrap_or_default(),
            },
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed outputText event");
                StreamEvent::Unknown {
                    kind: "outputText".to_string(),
                }
            }
        };
    }

    if let Some(chunk) = map.remove("chunk") {
        return match serde_json::from_value::<WireChunk>(chunk) {
            Ok(chunk) => StreamEvent::Chunk {
                bytes: chunk.bytes.as_deref().map(decode_bytes).unwrap_or_default(),
                attribution: chunk.attribution,
            },
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed chunk event");
                StreamEvent::Unknown {
                    kind: "chunk".to_string(),
                }
            }
        };
    }

    StreamEvent::Unknown {
        kind: first_key(&map),
    }
}

/// Convert a StreamEvent back into its wire JSON shape
pub fn event_to_value(event: &StreamEvent) -> Value {
    match event {
        StreamEvent::OutputText { text } => json!({ "outputText": { "text": text } }),
        StreamEvent::Chunk { bytes, attribution } => {
            let mut chunk = Map::new();
            chunk.insert(
                "bytes".to_string(),
                Value::String(base64::engine::general_purpose::STANDARD.encode(bytes)),
            );
            if let Some(attribution) = attribution {
                chunk.insert("attribution".to_string(), attribution.clone());
            }
            json!({ "chunk": chunk })
        }
        StreamEvent::Unknown { kind } => json!({ kind.as_str(): {} }),
    }
}

/// Extract citations from an attribution payload.
///
/// A missing or null `citations` list is an empty batch. Every entry yields
/// one citation, with missing or wrong-typed nested fields as `None`. Only a
/// malformed attribution object or citations list is an error.
pub fn extract_citations(attribution: &Value) -> Result<Vec<Citation>, CitationParseError> {
    let map = match attribution {
        Value::Object(map) => map,
        Value::Null => return Ok(Vec::new()),
        other => return Err(CitationParseError::InvalidAttribution(json_kind(other))),
    };

    match map.get("citations") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(entries)) => Ok(entries.iter().map(citation_from_entry).collect()),
        Some(other) => Err(CitationParseError::NotAnArray(json_kind(other))),
    }
}

fn decode_bytes(encoded: &str) -> Vec<u8> {
    match base64::engine::general_purpose::STANDARD.decode(encoded) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "Chunk bytes are not valid base64, treating as empty");
            Vec::new()
        }
    }
}

fn first_key(map: &Map<String, Value>) -> String {
    map.keys()
        .next()
        .cloned()
        .unwrap_or_else(|| "empty".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(text: &str) -> String {
        base64::engine::general_purpose::STANDARD.encode(text)
    }

    #[test]
    fn test_parse_output_text_line() {
        let event = parse_line(r#"{"outputText": {"text": "Hello"}}"#).unwrap();
        assert_eq!(
            event,
            StreamEvent::OutputText {
                text: "Hello".to_string()
            }
        );
    }

    #[test]
    fn test_parse_chunk_decodes_base64() {
        let line = format!(r#"{{"chunk": {{"bytes": "{}"}}}}"#, encode("Hi there"));
        let event = parse_line(&line).unwrap();
        assert_eq!(event, StreamEvent::chunk_text("Hi there"));
    }

    #[test]
    fn test_output_text_without_text_field_is_empty() {
        let event = event_from_value(json!({"outputText": {}}));
        assert_eq!(
            event,
            StreamEvent::OutputText {
                text: String::new()
            }
        );
    }

    #[test]
    fn test_bad_base64_yields_empty_bytes() {
        let event = event_from_value(json!({"chunk": {"bytes": "!!not base64!!"}}));
        assert_eq!(
            event,
            StreamEvent::Chunk {
                bytes: vec![],
                attribution: None
            }
        );
    }

    #[test]
    fn test_unrecognised_shape_is_unknown() {
        let event = event_from_value(json!({"trace": {"orchestrationTrace": {}}}));
        assert_eq!(
            event,
            StreamEvent::Unknown {
                kind: "trace".to_string()
            }
        );
    }

    #[test]
    fn test_non_json_line_is_malformed() {
        assert!(matches!(
            parse_line("not json"),
            Err(StreamError::Malformed(_))
        ));
    }

    #[test]
    fn test_citation_with_text_and_s3_source() {
        let attribution = json!({
            "citations": [{
                "generatedResponsePart": {"textResponsePart": {"text": "Leave policy"}},
                "retrievedReferences": [
                    {"location": {"s3Location": {"uri": "s3://kb/policies/leave.pdf"}}}
                ]
            }]
        });
        let citations = extract_citations(&attribution).unwrap();
        assert_eq!(
            citations,
            vec![Citation {
                text: Some("Leave policy".to_string()),
                source: Some("s3://kb/policies/leave.pdf".to_string()),
            }]
        );
    }

    #[test]
    fn test_citation_missing_references_has_no_source() {
        let attribution = json!({
            "citations": [{
                "generatedResponsePart": {"textResponsePart": {"text": "Quoted"}}
            }]
        });
        let citations = extract_citations(&attribution).unwrap();
        assert_eq!(citations[0].source, None);
        assert_eq!(citations[0].text.as_deref(), Some("Quoted"));
    }

    #[test]
    fn test_citation_source_falls_back_to_web_location() {
        let attribution = json!({
            "citations": [{
                "retrievedReferences": [
                    {"content": {"text": "no location here"}},
                    {"location": {"webLocation": {"url": "https://intranet/handbook"}}}
                ]
            }]
        });
        let citations = extract_citations(&attribution).unwrap();
        assert_eq!(
            citations,
            vec![Citation {
                text: None,
                source: Some("https://intranet/handbook".to_string()),
            }]
        );
    }

    #[test]
    fn test_attribution_without_citations_is_empty() {
        assert_eq!(extract_citations(&json!({})).unwrap(), vec![]);
        assert_eq!(extract_citations(&json!({"citations": null})).unwrap(), vec![]);
    }

    #[test]
    fn test_malformed_attribution_is_an_error() {
        assert_eq!(
            extract_citations(&json!({"citations": "oops"})),
            Err(CitationParseError::NotAnArray("string"))
        );
        assert_eq!(
            extract_citations(&json!("oops")),
            Err(CitationParseError::InvalidAttribution("string"))
        );
        assert_eq!(
            extract_citations(&json!({"citations": [42]})),
            Ok(vec![Citation::default()])
        );
    }

    #[test]
    fn test_event_to_value_matches_wire_shape() {
        let value = event_to_value(&StreamEvent::chunk_text("abc"));
        assert_eq!(value, json!({"chunk": {"bytes": encode("abc")}}));
        assert_eq!(event_from_value(value), StreamEvent::chunk_text("abc"));
    }
}
