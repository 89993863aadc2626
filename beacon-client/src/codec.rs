//! JSON document codec for pending events
//!
//! Both the collector request body and the cache slot use the same shape:
//!
//! ```json
//! {"events":[{"type":"levelStart","data":"level:3"}]}
//! ```
//!
//! An empty set encodes as `{}`. Decoding is lenient about everything except
//! the input being JSON at all.

use serde::Serialize;
use serde_json::Value;

use crate::error::{CodecError, CodecResult};
use crate::event::Event;

const EVENTS_KEY: &str = "events";

#[derive(Serialize)]
struct EncodedDocument<'a> {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    events: Vec<&'a Event>,
}

/// Encode events into a document
pub fn encode<'a, I>(events: I) -> CodecResult<Vec<u8>>
where
    I: IntoIterator<Item = &'a Event>,
{
    let document = EncodedDocument {
        events: events.into_iter().collect(),
    };
    serde_json::to_vec(&document).map_err(CodecError::Encode)
}

/// Decode a document into events
///
/// A missing `events` key, a non-array `events` value or a non-object
/// top level all decode to zero events.
pub fn decode(bytes: &[u8]) -> CodecResult<Vec<Event>> {
    let document: Value = serde_json::from_slice(bytes).map_err(CodecError::MalformedDocument)?;

    let entries = match document.get(EVENTS_KEY) {
        Some(Value::Array(entries)) => entries,
        _ => return Ok(Vec::new()),
    };

    let mut events = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry {
            Value::Object(fields) => events.push(Event {
                event_type: field_text(fields.get("type")),
                data: field_text(fields.get("data")),
            }),
            other => {
                tracing::warn!("Skipping non-object cache entry: {}", other);
            }
        }
    }

    Ok(events)
}

fn field_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_encodes_without_events_key() {
        let bytes = encode(&Vec::<Event>::new()).unwrap();
        assert_eq!(bytes, b"{}");
    }

    #[test]
    fn test_encode_uses_type_and_data_keys() {
        let events = vec![Event::new("levelStart", "level:3")];
        let bytes = encode(&events).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"events":[{"type":"levelStart","data":"level:3"}]}"#
        );
    }

    #[test]
    fn test_scalar_fields_decode_as_text() {
        let events = decode(br#"{"events":[{"type":"score","data":42}]}"#).unwrap();
        assert_eq!(events, vec![Event::new("score", "42")]);
    }

    #[test]
    fn test_missing_fields_decode_as_empty() {
        let events = decode(br#"{"events":[{"type":"ping"},{"data":null}]}"#).unwrap();
        assert_eq!(events, vec![Event::new("ping", ""), Event::new("", "")]);
    }

    #[test]
    fn test_non_object_entries_are_skipped() {
        let events = decode(br#"{"events":[1,"x",{"type":"a","data":"b"}]}"#).unwrap();
        assert_eq!(events, vec![Event::new("a", "b")]);
    }

    #[test]
    fn test_non_object_top_level_is_empty() {
        assert!(decode(b"[1,2,3]").unwrap().is_empty());
        assert!(decode(b"\"events\"").unwrap().is_empty());
    }

    #[test]
    fn test_garbage_is_malformed() {
        let err = decode(b"{\"events\": [").unwrap_err();
        assert!(matches!(err, CodecError::MalformedDocument(_)));
    }
}
