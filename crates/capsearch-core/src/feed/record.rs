//! Record decoding
//!
//! Each feed line is a self-describing JSON value. Two protocol generations
//! exist: older feeds send untyped service records, newer ones add a `type`
//! discriminator and `link` records. A missing `type` means `"service"`.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use thiserror::Error;

use super::types::{AnnouncedItem, ContentFlags, ItemKey, LinkEntry, ResultRecord};

/// Message used when a v2-style feed sends `"error": true`
const UNSPECIFIED_ERROR: &str = "The server reported an error for this source.";

/// Per-record decode failure. Never fatal for the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
    #[error("unknown record type `{0}`")]
    UnknownType(String),
    #[error("malformed {kind} record: {reason}")]
    Malformed { kind: &'static str, reason: String },
    #[error("unrecognized record shape: {0}")]
    UnrecognizedShape(&'static str),
}

/// Result record for one source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRecord {
    pub key: ItemKey,
    pub result: ResultRecord,
}

/// Link record for one source (newer protocol only)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRecord {
    pub key: ItemKey,
    pub link: LinkEntry,
}

/// The closed set of records the feed can carry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireRecord {
    /// `null`: end of the generation phase
    Sentinel,
    /// Source key -> display title, in feed order
    Announcement(Vec<AnnouncedItem>),
    Service(ServiceRecord),
    Link(LinkRecord),
}

impl WireRecord {
    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            WireRecord::Sentinel => "sentinel",
            WireRecord::Announcement(_) => "preparation",
            WireRecord::Service(_) => "service",
            WireRecord::Link(_) => "link",
        }
    }
}

#[derive(Deserialize)]
struct ServiceWire {
    classname: String,
    #[serde(default, deserialize_with = "null_as_false")]
    archived: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    metaonly: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    comments: bool,
    #[serde(default, deserialize_with = "string_or_none")]
    available: Option<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    note: Option<String>,
    #[serde(default, deserialize_with = "lenient_error")]
    error: Option<String>,
}

#[derive(Deserialize)]
struct LinkWire {
    classname: String,
    url: String,
    title: String,
    #[serde(default, deserialize_with = "string_or_none")]
    note: Option<String>,
    #[serde(default)]
    contains: Option<std::collections::BTreeMap<String, bool>>,
}

fn null_as_false<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(d)?.unwrap_or(false))
}

/// Keeps strings only; older feeds sent `false` where a URL was expected
fn string_or_none<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

/// API v3 sends the message or null, API v2 sent a boolean
fn lenient_error<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        Value::Bool(true) => Some(UNSPECIFIED_ERROR.to_string()),
        _ => None,
    })
}

/// Decode one feed line into a typed record
pub fn decode_record(line: &str) -> Result<WireRecord, DecodeError> {
    decode_value(parse_line(line)?)
}

/// Decode the first record of a feed. Any object whose values are all
/// strings is the source list, even when one of its keys is `classname`.
pub fn decode_preparation_record(line: &str) -> Result<WireRecord, DecodeError> {
    match parse_line(line)? {
        Value::Object(map) if map.values().all(Value::is_string) => decode_announcement(map),
        other => decode_value(other),
    }
}

fn parse_line(line: &str) -> Result<Value, DecodeError> {
    serde_json::from_str(line).map_err(|e| DecodeError::InvalidJson(e.to_string()))
}

fn decode_value(value: Value) -> Result<WireRecord, DecodeError> {
    match value {
        Value::Null => Ok(WireRecord::Sentinel),
        Value::Object(map) => decode_object(map),
        Value::Bool(_) => Err(DecodeError::UnrecognizedShape("boolean")),
        Value::Number(_) => Err(DecodeError::UnrecognizedShape("number")),
        Value::String(_) => Err(DecodeError::UnrecognizedShape("string")),
        Value::Array(_) => Err(DecodeError::UnrecognizedShape("array")),
    }
}

fn decode_object(map: Map<String, Value>) -> Result<WireRecord, DecodeError> {
    if !matches!(map.get("classname"), Some(Value::String(_))) {
        return decode_announcement(map);
    }

    let kind = match map.get("type") {
        None | Some(Value::Null) => "service".to_string(),
        Some(Value::String(t)) => t.clone(),
        Some(_) => {
            return Err(DecodeError::Malformed {
                kind: "generation",
                reason: "`type` is not a string".to_string(),
            })
        }
    };

    match kind.as_str() {
        "service" => decode_service(map),
        "link" => decode_link(map),
        other => Err(DecodeError::UnknownType(other.to_string())),
    }
}

fn decode_announcement(map: Map<String, Value>) -> Result<WireRecord, DecodeError> {
    let mut items = Vec::with_capacity(map.len());
    for (key, value) in map {
        match value {
            Value::String(title) => items.push(AnnouncedItem {
                key: ItemKey::new(key),
                title,
            }),
            _ => {
                return Err(DecodeError::UnrecognizedShape(
                    "object without classname and with non-string values",
                ))
            }
        }
    }
    Ok(WireRecord::Announcement(items))
}

fn decode_service(map: Map<String, Value>) -> Result<WireRecord, DecodeError> {
    let wire: ServiceWire =
        serde_json::from_value(Value::Object(map)).map_err(|e| DecodeError::Malformed {
            kind: "service",
            reason: e.to_string(),
        })?;

    Ok(WireRecord::Service(ServiceRecord {
        key: ItemKey::new(wire.classname),
        result: ResultRecord {
            archived: wire.archived,
            metaonly: wire.metaonly,
            comments: wire.comments,
            note: wire.note.unwrap_or_default(),
            error: wire.error,
            available: wire.available,
            links: Vec::new(),
            synthetic: false,
        },
    }))
}

fn decode_link(map: Map<String, Value>) -> Result<WireRecord, DecodeError> {
    let wire: LinkWire =
        serde_json::from_value(Value::Object(map)).map_err(|e| DecodeError::Malformed {
            kind: "link",
            reason: e.to_string(),
        })?;

    Ok(WireRecord::Link(LinkRecord {
        key: ItemKey::new(wire.classname),
        link: LinkEntry {
            url: wire.url,
            title: wire.title,
            note: wire.note,
            contains: ContentFlags::from(wire.contains.unwrap_or_default()),
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel() {
        assert_eq!(decode_record("null"), Ok(WireRecord::Sentinel));
        assert_eq!(decode_record("  null \r"), Ok(WireRecord::Sentinel));
    }

    #[test]
    fn test_announcement_keeps_order() {
        let record = decode_record(r#"{"youtube":"YouTube","wayback":"Wayback Machine","ghost":"GhostArchive"}"#)
            .unwrap();
        let WireRecord::Announcement(items) = record else {
            panic!("expected announcement, got {:?}", record);
        };
        let keys: Vec<_> = items.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, vec!["youtube", "wayback", "ghost"]);
        assert_eq!(items[1].title, "Wayback Machine");
    }

    #[test]
    fn test_service_record_typed() {
        let line = r#"{"classname":"svc1","type":"service","archived":true,"metaonly":false,"comments":true,"available":"http://x","note":"ok","error":null}"#;
        let WireRecord::Service(record) = decode_record(line).unwrap() else {
            panic!("expected service record");
        };
        assert_eq!(record.key, ItemKey::from("svc1"));
        assert!(record.result.archived);
        assert!(record.result.comments);
        assert_eq!(record.result.available.as_deref(), Some("http://x"));
        assert_eq!(record.result.note, "ok");
        assert_eq!(record.result.error, None);
        assert!(!record.result.synthetic);
    }

    #[test]
    fn test_missing_type_defaults_to_service() {
        let line = r#"{"classname":"Filmot","archived":false,"metaonly":true,"comments":false,"available":false,"note":"","error":null}"#;
        let WireRecord::Service(record) = decode_record(line).unwrap() else {
            panic!("expected service record");
        };
        assert!(record.result.metaonly);
        // `false` where a URL belongs is treated as absent
        assert_eq!(record.result.available, None);
    }

    #[test]
    fn test_missing_fields_default() {
        let WireRecord::Service(record) = decode_record(r#"{"classname":"x"}"#).unwrap() else {
            panic!("expected service record");
        };
        assert_eq!(record.result, ResultRecord::default());
    }

    #[test]
    fn test_legacy_boolean_error() {
        let WireRecord::Service(record) =
            decode_record(r#"{"classname":"x","archived":false,"error":true}"#).unwrap()
        else {
            panic!("expected service record");
        };
        assert_eq!(record.result.error.as_deref(), Some(UNSPECIFIED_ERROR));

        let WireRecord::Service(record) =
            decode_record(r#"{"classname":"x","error":false}"#).unwrap()
        else {
            panic!("expected service record");
        };
        assert_eq!(record.result.error, None);
    }

    #[test]
    fn test_link_record() {
        let line = r#"{"classname":"YouTube","type":"link","url":"https://youtu.be/x","title":"Watch page","note":null,"contains":{"video":true,"thumbnail":false}}"#;
        let WireRecord::Link(record) = decode_record(line).unwrap() else {
            panic!("expected link record");
        };
        assert_eq!(record.key.as_str(), "YouTube");
        assert_eq!(record.link.title, "Watch page");
        assert_eq!(record.link.note, None);
        assert!(record.link.contains.has("video"));
        assert!(!record.link.contains.has("thumbnail"));
    }

    #[test]
    fn test_link_without_url_is_malformed() {
        let err = decode_record(r#"{"classname":"a","type":"link","title":"t"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { kind: "link", .. }));
    }

    #[test]
    fn test_unknown_type() {
        assert_eq!(
            decode_record(r#"{"classname":"a","type":"banner"}"#),
            Err(DecodeError::UnknownType("banner".to_string()))
        );
    }

    #[test]
    fn test_preparation_record_with_classname_key() {
        let line = r#"{"classname":"Class Name Service","yt":"YouTube"}"#;
        assert!(matches!(decode_record(line), Ok(WireRecord::Service(_))));

        let WireRecord::Announcement(items) = decode_preparation_record(line).unwrap() else {
            panic!("expected announcement");
        };
        let keys: Vec<_> = items.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, vec!["classname", "yt"]);
        assert_eq!(items[0].title, "Class Name Service");
    }

    #[test]
    fn test_preparation_decoding_falls_back() {
        assert_eq!(decode_preparation_record("null"), Ok(WireRecord::Sentinel));
        assert!(matches!(
            decode_preparation_record(r#"{"classname":"yt","archived":true}"#),
            Ok(WireRecord::Service(_))
        ));
        assert!(matches!(
            decode_preparation_record("[]"),
            Err(DecodeError::UnrecognizedShape("array"))
        ));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            decode_record("{not json"),
            Err(DecodeError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_unrecognized_shapes() {
        assert!(matches!(
            decode_record("[1,2]"),
            Err(DecodeError::UnrecognizedShape("array"))
        ));
        assert!(matches!(
            decode_record("42"),
            Err(DecodeError::UnrecognizedShape("number"))
        ));
        assert!(matches!(
            decode_record(r#"{"a":1}"#),
            Err(DecodeError::UnrecognizedShape(_))
        ));
    }
}
