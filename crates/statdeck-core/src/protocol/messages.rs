//! All StatDeck wire message types.
//!
//! Every link carries one JSON object per line.  The `"type"` field selects
//! the variant; the remaining fields are the payload.  Payload fields that
//! the link layer does not interpret (`layout`, `data`, status fields) are
//! kept as raw JSON text so forwarding never rewrites them.
//!
//! `config`, `stats` and `action` travel across more than one hop, so any
//! field their type does not define is kept in an [`Extras`] list and
//! written back out after the defined ones.

use std::fmt;

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Error as _, Serialize, SerializeMap, Serializer};
use serde_json::value::RawValue;

use crate::domain::layout::LayoutDocument;

// ── Message kinds ─────────────────────────────────────────────────────────────

/// The `"type"` discriminant of every message defined by the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Config,
    Stats,
    Action,
    GetLayout,
    LayoutData,
    ConfigAck,
    PcDisconnected,
    Status,
    ConfigRequest,
    GetStatus,
    UpdateTuning,
    TuningAck,
}

impl MessageKind {
    /// The wire spelling of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Config => "config",
            MessageKind::Stats => "stats",
            MessageKind::Action => "action",
            MessageKind::GetLayout => "get_layout",
            MessageKind::LayoutData => "layout_data",
            MessageKind::ConfigAck => "config_ack",
            MessageKind::PcDisconnected => "pc_disconnected",
            MessageKind::Status => "status",
            MessageKind::ConfigRequest => "config_request",
            MessageKind::GetStatus => "get_status",
            MessageKind::UpdateTuning => "update_tuning",
            MessageKind::TuningAck => "tuning_ack",
        }
    }

    /// The response kind that answers a request of this kind, if this kind
    /// is a request at all.
    ///
    /// Correlation is keyed by kind, not by a per-request id, so these pairs
    /// fully define which inbound message completes which outstanding request.
    pub fn expected_response(self) -> Option<MessageKind> {
        match self {
            MessageKind::GetLayout => Some(MessageKind::LayoutData),
            MessageKind::Config => Some(MessageKind::ConfigAck),
            MessageKind::GetStatus => Some(MessageKind::Status),
            MessageKind::UpdateTuning => Some(MessageKind::TuningAck),
            _ => None,
        }
    }
}

impl TryFrom<&str> for MessageKind {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, ()> {
        match value {
            "config" => Ok(MessageKind::Config),
            "stats" => Ok(MessageKind::Stats),
            "action" => Ok(MessageKind::Action),
            "get_layout" => Ok(MessageKind::GetLayout),
            "layout_data" => Ok(MessageKind::LayoutData),
            "config_ack" => Ok(MessageKind::ConfigAck),
            "pc_disconnected" => Ok(MessageKind::PcDisconnected),
            "status" => Ok(MessageKind::Status),
            "config_request" => Ok(MessageKind::ConfigRequest),
            "get_status" => Ok(MessageKind::GetStatus),
            "update_tuning" => Ok(MessageKind::UpdateTuning),
            "tuning_ack" => Ok(MessageKind::TuningAck),
            _ => Err(()),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Opaque payloads ───────────────────────────────────────────────────────────

/// A JSON value carried verbatim.
///
/// The text is validated once when the payload is created or decoded and is
/// then re-emitted byte-for-byte on encode.  Two payloads are equal when
/// their JSON text is identical.
#[derive(Clone, PartialEq, Eq)]
pub struct Payload {
    json: String,
}

impl Payload {
    /// Wraps JSON text after checking that it is well-formed.
    ///
    /// JSON only allows line breaks as whitespace, so any `\n` or `\r` in
    /// `text` is replaced by a space to keep the payload on one wire line.
    /// All other bytes are kept.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` parse error if `text` is not a single valid
    /// JSON value.
    pub fn from_json(text: impl Into<String>) -> Result<Self, serde_json::Error> {
        let mut json = text.into();
        serde_json::from_str::<&RawValue>(&json)?;
        if json.contains(['\n', '\r']) {
            json = json.replace(['\n', '\r'], " ");
        }
        Ok(Self { json })
    }

    /// Serializes any value into a payload.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if `value` cannot be represented as
    /// JSON (for example a map with non-string keys).
    pub fn from_value<T: serde::Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            json: serde_json::to_string(value)?,
        })
    }

    /// An empty JSON object, `{}`.
    pub fn empty_object() -> Self {
        Self::from_static("{}")
    }

    /// Literal JSON written in this crate's source.
    pub(crate) fn from_static(json: &'static str) -> Self {
        Self {
            json: json.to_string(),
        }
    }

    /// Already-validated text produced by this crate's own decoders.
    pub(crate) fn from_raw(raw: Box<RawValue>) -> Self {
        Self {
            json: String::from(raw.get()),
        }
    }

    /// The JSON text exactly as it will appear on the wire.
    pub fn as_json(&self) -> &str {
        &self.json
    }

    /// Parses the payload into a typed value.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the JSON does not match `T`.
    pub fn parse<'a, T: serde::Deserialize<'a>>(&'a self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.json)
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Layouts can be megabytes of base64 icons; keep debug output short.
        const PREVIEW: usize = 64;
        if self.json.len() <= PREVIEW {
            write!(f, "Payload({})", self.json)
        } else {
            let mut cut = PREVIEW;
            while !self.json.is_char_boundary(cut) {
                cut -= 1;
            }
            write!(f, "Payload({}… {} bytes)", &self.json[..cut], self.json.len())
        }
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let raw: &RawValue = serde_json::from_str(&self.json).map_err(S::Error::custom)?;
        raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Box::<RawValue>::deserialize(deserializer)?;
        Ok(Self::from_raw(raw))
    }
}

// ── Undefined fields ──────────────────────────────────────────────────────────

/// Fields a message carried beyond the ones its type defines, in arrival
/// order, each kept as raw JSON.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Extras {
    fields: Vec<(String, Payload)>,
}

impl Extras {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.  A key that is already present is replaced in
    /// place.
    pub fn with(mut self, key: impl Into<String>, value: Payload) -> Self {
        self.insert(key.into(), value);
        self
    }

    pub fn insert(&mut self, key: String, value: Payload) {
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Payload> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Payload)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn serialize_into<M: SerializeMap>(&self, map: &mut M) -> Result<(), M::Error> {
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        Ok(())
    }
}

// ── Action payloads ───────────────────────────────────────────────────────────

/// How a tile was touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Tap,
    LongPress,
}

impl ActionType {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionType::Tap => "tap",
            ActionType::LongPress => "long_press",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A discrete input event raised by the Display Frontend.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TileAction {
    /// Id of the tile that was touched.
    pub tile_id: String,
    /// Gesture classification.
    pub action_type: ActionType,
    /// Epoch milliseconds at which the action was raised.
    pub timestamp: u64,
    /// Fields the sender added beyond the three above.
    #[serde(skip)]
    pub extra: Extras,
}

// ── Status payload ────────────────────────────────────────────────────────────

/// Free-form diagnostic fields carried by a `status` message.
///
/// All fields other than `type` are preserved in their original order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatusReport {
    fields: serde_json::Map<String, serde_json::Value>,
}

impl StatusReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field setter.
    pub fn with(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.fields
    }

    pub(crate) fn from_fields(fields: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            fields: fields.into_iter().filter(|(key, _)| key != "type").collect(),
        }
    }
}

// ── Top-level message enum ────────────────────────────────────────────────────

/// One line on any StatDeck link.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// A full layout push.
    Config {
        layout: LayoutDocument,
        extra: Extras,
    },
    /// One telemetry sample.
    Stats {
        data: Payload,
        timestamp: u64,
        extra: Extras,
    },
    /// A tap or long press on a tile.
    Action(TileAction),
    /// Request for the layout currently held by the peer.
    GetLayout,
    /// Response to [`Message::GetLayout`].
    LayoutData { layout: LayoutDocument },
    /// Response to [`Message::Config`].
    ConfigAck { success: bool, error: Option<String> },
    /// The telemetry source upstream of the display host was lost.
    PcDisconnected,
    /// Diagnostic report; fields are implementation-defined.
    Status(StatusReport),
    /// The display host has no layout and asks the relay for one.
    ConfigRequest,
    /// Request for a [`Message::Status`] report.
    GetStatus,
    /// Runtime tuning for the relay.  An absent rate means the default.
    UpdateTuning { stats_rate_ms: Option<u64> },
    /// Response to [`Message::UpdateTuning`] carrying the rate now in effect.
    TuningAck {
        success: bool,
        stats_rate_ms: Option<u64>,
    },
}

impl Message {
    /// Returns the [`MessageKind`] discriminant for this message.
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Config { .. } => MessageKind::Config,
            Message::Stats { .. } => MessageKind::Stats,
            Message::Action(_) => MessageKind::Action,
            Message::GetLayout => MessageKind::GetLayout,
            Message::LayoutData { .. } => MessageKind::LayoutData,
            Message::ConfigAck { .. } => MessageKind::ConfigAck,
            Message::PcDisconnected => MessageKind::PcDisconnected,
            Message::Status(_) => MessageKind::Status,
            Message::ConfigRequest => MessageKind::ConfigRequest,
            Message::GetStatus => MessageKind::GetStatus,
            Message::UpdateTuning { .. } => MessageKind::UpdateTuning,
            Message::TuningAck { .. } => MessageKind::TuningAck,
        }
    }

    /// A layout push with no extra fields.
    pub fn config(layout: LayoutDocument) -> Self {
        Message::Config {
            layout,
            extra: Extras::new(),
        }
    }

    /// A telemetry sample with no extra fields.
    pub fn stats(data: Payload, timestamp: u64) -> Self {
        Message::Stats {
            data,
            timestamp,
            extra: Extras::new(),
        }
    }

    /// Convenience constructor for an action stamped with `timestamp`.
    pub fn action(tile_id: impl Into<String>, action_type: ActionType, timestamp: u64) -> Self {
        Message::Action(TileAction {
            tile_id: tile_id.into(),
            action_type,
            timestamp,
            extra: Extras::new(),
        })
    }
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", self.kind().as_str())?;
        match self {
            Message::Config { layout, extra } => {
                map.serialize_entry("layout", layout)?;
                extra.serialize_into(&mut map)?;
            }
            Message::LayoutData { layout } => {
                map.serialize_entry("layout", layout)?;
            }
            Message::Stats {
                data,
                timestamp,
                extra,
            } => {
                map.serialize_entry("data", data)?;
                map.serialize_entry("timestamp", timestamp)?;
                extra.serialize_into(&mut map)?;
            }
            Message::Action(action) => {
                map.serialize_entry("tile_id", &action.tile_id)?;
                map.serialize_entry("action_type", &action.action_type)?;
                map.serialize_entry("timestamp", &action.timestamp)?;
                action.extra.serialize_into(&mut map)?;
            }
            Message::ConfigAck { success, error } => {
                map.serialize_entry("success", success)?;
                if let Some(error) = error {
                    map.serialize_entry("error", error)?;
                }
            }
            Message::Status(report) => {
                for (key, value) in &report.fields {
                    map.serialize_entry(key, value)?;
                }
            }
            Message::UpdateTuning { stats_rate_ms } => {
                if let Some(rate) = stats_rate_ms {
                    map.serialize_entry("stats_rate_ms", rate)?;
                }
            }
            Message::TuningAck {
                success,
                stats_rate_ms,
            } => {
                map.serialize_entry("success", success)?;
                if let Some(rate) = stats_rate_ms {
                    map.serialize_entry("stats_rate_ms", rate)?;
                }
            }
            Message::GetLayout
            | Message::PcDisconnected
            | Message::ConfigRequest
            | Message::GetStatus => {}
        }
        map.end()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_kind_wire_names_round_trip() {
        let kinds = [
            MessageKind::Config,
            MessageKind::Stats,
            MessageKind::Action,
            MessageKind::GetLayout,
            MessageKind::LayoutData,
            MessageKind::ConfigAck,
            MessageKind::PcDisconnected,
            MessageKind::Status,
            MessageKind::ConfigRequest,
            MessageKind::GetStatus,
            MessageKind::UpdateTuning,
            MessageKind::TuningAck,
        ];
        for kind in kinds {
            assert_eq!(MessageKind::try_from(kind.as_str()), Ok(kind));
        }
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        assert_eq!(MessageKind::try_from("layout_response"), Err(()));
    }

    #[test]
    fn test_expected_response_pairs() {
        assert_eq!(
            MessageKind::GetLayout.expected_response(),
            Some(MessageKind::LayoutData)
        );
        assert_eq!(
            MessageKind::Config.expected_response(),
            Some(MessageKind::ConfigAck)
        );
        assert_eq!(
            MessageKind::GetStatus.expected_response(),
            Some(MessageKind::Status)
        );
        assert_eq!(
            MessageKind::UpdateTuning.expected_response(),
            Some(MessageKind::TuningAck)
        );
        assert_eq!(MessageKind::Stats.expected_response(), None);
        assert_eq!(MessageKind::Action.expected_response(), None);
    }

    #[test]
    fn test_payload_rejects_invalid_json() {
        assert!(Payload::from_json("{not json").is_err());
    }

    #[test]
    fn test_payload_keeps_text_verbatim() {
        // Whitespace and key order must survive untouched.
        let text = r#"{ "b": 1,  "a": [1.50, 2] }"#;
        let payload = Payload::from_json(text).unwrap();
        assert_eq!(payload.as_json(), text);
    }

    #[test]
    fn test_payload_line_breaks_become_spaces() {
        let payload = Payload::from_json("{\n  \"a\": \"x\\ny\"\r\n}").unwrap();
        assert_eq!(payload.as_json(), "{   \"a\": \"x\\ny\"  }");
        assert_eq!(payload.parse::<serde_json::Value>().unwrap()["a"], "x\ny");
    }

    #[test]
    fn test_payload_debug_is_truncated_for_large_values() {
        let big = format!("\"{}\"", "x".repeat(1000));
        let payload = Payload::from_json(big).unwrap();
        let rendered = format!("{payload:?}");
        assert!(rendered.len() < 120, "debug output too long: {rendered}");
        assert!(rendered.contains("1002 bytes"));
    }

    #[test]
    fn test_action_serializes_with_snake_case_type() {
        let msg = Message::action("btn-1", ActionType::LongPress, 42);
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(
            json,
            r#"{"type":"action","tile_id":"btn-1","action_type":"long_press","timestamp":42}"#
        );
    }

    #[test]
    fn test_config_ack_omits_absent_error() {
        let msg = Message::ConfigAck {
            success: true,
            error: None,
        };
        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            r#"{"type":"config_ack","success":true}"#
        );
    }

    #[test]
    fn test_status_fields_follow_type() {
        let msg = Message::Status(
            StatusReport::new()
                .with("serial_connected", true)
                .with("layout_tiles", 4),
        );
        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            r#"{"type":"status","serial_connected":true,"layout_tiles":4}"#
        );
    }

    #[test]
    fn test_stats_data_is_emitted_verbatim() {
        let data = Payload::from_json(r#"{"cpu": {"usage": 12.50}}"#).unwrap();
        let msg = Message::stats(data, 7);
        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            r#"{"type":"stats","data":{"cpu": {"usage": 12.50}},"timestamp":7}"#
        );
    }

    #[test]
    fn test_extras_follow_defined_fields() {
        // Arrange
        let mut msg = Message::action("fan", ActionType::Tap, 3);
        if let Message::Action(action) = &mut msg {
            action.extra = Extras::new()
                .with("page", Payload::from_json("2").unwrap())
                .with("source", Payload::from_json(r#""touch""#).unwrap());
        }

        // Act
        let json = serde_json::to_string(&msg).unwrap();

        // Assert
        assert_eq!(
            json,
            r#"{"type":"action","tile_id":"fan","action_type":"tap","timestamp":3,"page":2,"source":"touch"}"#
        );
    }

    #[test]
    fn test_extras_insert_replaces_existing_key() {
        let extras = Extras::new()
            .with("seq", Payload::from_json("1").unwrap())
            .with("seq", Payload::from_json("2").unwrap());
        assert_eq!(extras.len(), 1);
        assert_eq!(extras.get("seq").unwrap().as_json(), "2");
    }
}
