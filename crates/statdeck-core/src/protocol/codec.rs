//! Line codec for StatDeck messages.
//!
//! Wire format: one JSON object per line, UTF-8, terminated by `\n`.
//!
//! ```text
//! {"type":"stats","data":{...},"timestamp":1700000000000}\n
//! ```
//!
//! [`encode_message`] produces a complete line including the terminator.
//! [`decode_message`] accepts a single line *without* the terminator; the
//! streaming side (splitting a byte stream into lines) lives in
//! [`crate::protocol::framing`].

use std::fmt;

use serde::de::{DeserializeOwned, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use serde_json::value::RawValue;
use thiserror::Error;

use crate::domain::layout::LayoutDocument;
use crate::protocol::messages::{Extras, Message, MessageKind, Payload, StatusReport, TileAction};

/// Errors raised while decoding one line.
///
/// A decode error is always isolated to the offending line; the stream it
/// came from stays usable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The line is not a JSON object (syntax error, wrong top-level type, or
    /// invalid UTF-8).
    #[error("malformed line: {0}")]
    Malformed(String),

    /// The object has no string `"type"` field.
    #[error("message has no \"type\" field")]
    MissingType,

    /// The `"type"` value is not part of the protocol.
    #[error("unknown message type: {0:?}")]
    UnknownType(String),

    /// A field required by this message type is absent or null.
    #[error("{kind} message is missing field {field:?}")]
    MissingField {
        kind: MessageKind,
        field: &'static str,
    },

    /// A field is present but holds an unusable value.
    #[error("{kind} message has invalid field {field:?}")]
    InvalidField {
        kind: MessageKind,
        field: &'static str,
    },

    /// The line exceeded the decoder's size cap and was discarded.
    #[error("line exceeds {limit} bytes and was discarded")]
    LineTooLong { limit: usize },
}

/// Errors raised while encoding a message.
///
/// Every [`Message`] built through this crate's constructors is encodable;
/// this only surfaces if a payload's JSON text was corrupted in memory.
#[derive(Debug, Error)]
#[error("failed to encode message: {0}")]
pub struct EncodeError(#[from] serde_json::Error);

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes a [`Message`] as one JSON line terminated by `\n`.
///
/// Opaque payloads (`layout`, `data`) are written out exactly as they were
/// received.
///
/// # Errors
///
/// Returns [`EncodeError`] if serialization fails.
///
/// # Examples
///
/// ```rust
/// use statdeck_core::protocol::{decode_message, encode_message, Message};
///
/// let bytes = encode_message(&Message::GetLayout).unwrap();
/// assert_eq!(bytes, b"{\"type\":\"get_layout\"}\n");
/// let decoded = decode_message(&bytes[..bytes.len() - 1]).unwrap();
/// assert_eq!(decoded, Message::GetLayout);
/// ```
pub fn encode_message(msg: &Message) -> Result<Vec<u8>, EncodeError> {
    let mut buf = serde_json::to_vec(msg)?;
    buf.push(b'\n');
    Ok(buf)
}

/// Decodes one line (without its trailing `\n`) into a [`Message`].
///
/// Only `type` is read up front.  The fields a message type defines are then
/// parsed by name.  Any other field is kept in [`Extras`] for `config`,
/// `stats` and `action`, ignored for the remaining request/response types,
/// and `status` keeps every field as-is.
///
/// # Errors
///
/// Returns [`DecodeError`] when the line is not a JSON object, names an
/// unknown type, or lacks a required field.
pub fn decode_message(line: &[u8]) -> Result<Message, DecodeError> {
    // A derived struct visitor would also accept a JSON array positionally.
    if line.iter().find(|b| !b.is_ascii_whitespace()) != Some(&b'{') {
        return Err(DecodeError::Malformed("expected a JSON object".to_string()));
    }

    let mut fields: RawFields =
        serde_json::from_slice(line).map_err(|e| DecodeError::Malformed(e.to_string()))?;

    let type_name: String = fields
        .take("type")
        .and_then(|raw| serde_json::from_str(raw.get()).ok())
        .ok_or(DecodeError::MissingType)?;
    let kind = MessageKind::try_from(type_name.as_str())
        .map_err(|()| DecodeError::UnknownType(type_name.clone()))?;

    let msg = match kind {
        MessageKind::Config => Message::Config {
            layout: LayoutDocument::from_raw(fields.raw(kind, "layout")?),
            extra: fields.into_extras(),
        },
        MessageKind::LayoutData => Message::LayoutData {
            layout: LayoutDocument::from_raw(fields.raw(kind, "layout")?),
        },
        MessageKind::Stats => Message::Stats {
            data: Payload::from_raw(fields.raw(kind, "data")?),
            timestamp: timestamp(kind, fields.typed(kind, "timestamp")?)?,
            extra: fields.into_extras(),
        },
        MessageKind::Action => Message::Action(TileAction {
            tile_id: required(kind, "tile_id", fields.typed(kind, "tile_id")?)?,
            action_type: required(kind, "action_type", fields.typed(kind, "action_type")?)?,
            timestamp: timestamp(kind, fields.typed(kind, "timestamp")?)?,
            extra: fields.into_extras(),
        }),
        MessageKind::ConfigAck => Message::ConfigAck {
            success: required(kind, "success", fields.typed(kind, "success")?)?,
            error: fields.typed(kind, "error")?,
        },
        MessageKind::Status => {
            let fields: serde_json::Map<String, serde_json::Value> =
                serde_json::from_slice(line).map_err(|e| DecodeError::Malformed(e.to_string()))?;
            Message::Status(StatusReport::from_fields(fields))
        }
        MessageKind::GetLayout => Message::GetLayout,
        MessageKind::PcDisconnected => Message::PcDisconnected,
        MessageKind::ConfigRequest => Message::ConfigRequest,
        MessageKind::GetStatus => Message::GetStatus,
        MessageKind::UpdateTuning => Message::UpdateTuning {
            stats_rate_ms: fields.typed(kind, "stats_rate_ms")?,
        },
        MessageKind::TuningAck => Message::TuningAck {
            success: required(kind, "success", fields.typed(kind, "success")?)?,
            stats_rate_ms: fields.typed(kind, "stats_rate_ms")?,
        },
    };
    Ok(msg)
}

// ── Private helpers ───────────────────────────────────────────────────────────

/// Every top-level field of a line as raw JSON, in arrival order.
///
/// A hand-written visitor keeps `RawValue` out of serde's buffered content,
/// which cannot carry it.  A repeated key keeps its last value.
struct RawFields(Vec<(String, Box<RawValue>)>);

impl RawFields {
    fn take(&mut self, name: &str) -> Option<Box<RawValue>> {
        let pos = self.0.iter().position(|(key, _)| key == name)?;
        Some(self.0.remove(pos).1)
    }

    /// A required opaque field.  `null` counts as absent.
    fn raw(&mut self, kind: MessageKind, field: &'static str) -> Result<Box<RawValue>, DecodeError> {
        match self.take(field) {
            Some(raw) if raw.get() != "null" => Ok(raw),
            _ => Err(DecodeError::MissingField { kind, field }),
        }
    }

    /// A typed field.  Absent and `null` both give `None`; a value of the
    /// wrong shape is an [`DecodeError::InvalidField`].
    fn typed<T: DeserializeOwned>(
        &mut self,
        kind: MessageKind,
        field: &'static str,
    ) -> Result<Option<T>, DecodeError> {
        match self.take(field) {
            Some(raw) => serde_json::from_str::<Option<T>>(raw.get())
                .map_err(|_| DecodeError::InvalidField { kind, field }),
            None => Ok(None),
        }
    }

    fn into_extras(self) -> Extras {
        let mut extras = Extras::new();
        for (key, raw) in self.0 {
            extras.insert(key, Payload::from_raw(raw));
        }
        extras
    }
}

impl<'de> Deserialize<'de> for RawFields {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldsVisitor;

        impl<'de> Visitor<'de> for FieldsVisitor {
            type Value = RawFields;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<RawFields, A::Error> {
                let mut fields: Vec<(String, Box<RawValue>)> = Vec::new();
                while let Some((key, value)) = map.next_entry::<String, Box<RawValue>>()? {
                    match fields.iter_mut().find(|(k, _)| *k == key) {
                        Some((_, slot)) => *slot = value,
                        None => fields.push((key, value)),
                    }
                }
                Ok(RawFields(fields))
            }
        }

        deserializer.deserialize_map(FieldsVisitor)
    }
}

fn required<T>(kind: MessageKind, field: &'static str, value: Option<T>) -> Result<T, DecodeError> {
    value.ok_or(DecodeError::MissingField { kind, field })
}

/// Accepts any non-negative JSON number; fractional milliseconds are
/// truncated.
fn timestamp(kind: MessageKind, value: Option<serde_json::Number>) -> Result<u64, DecodeError> {
    let number = required(kind, "timestamp", value)?;
    if let Some(ms) = number.as_u64() {
        return Ok(ms);
    }
    match number.as_f64() {
        Some(ms) if ms.is_finite() && ms >= 0.0 => Ok(ms as u64),
        _ => Err(DecodeError::InvalidField {
            kind,
            field: "timestamp",
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
