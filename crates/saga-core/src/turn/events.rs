//! Turn event types for streaming to a client.
//!
//! This module defines the outbound notification contract. The wire shape
//! is `{type, ...}` where `type` is `turn:start`, `turn:delta`, `turn:end`,
//! or a `panel:<name>` tag defined by individual tool handlers. The colon
//! in the tag rules out a plain serde-derived tag, so the wire format is
//! implemented by hand.

use serde::de::Error as DeError;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use tokio::sync::mpsc;

/// Events emitted while processing one turn.
///
/// Events are immutable and accumulate in a single ordered sequence per
/// stream parse.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    /// The model has started responding.
    TurnStart { message_id: String },
    /// One incremental text fragment (never the accumulated total).
    TurnDelta { message_id: String, content: String },
    /// The response is complete, with final token counts.
    TurnEnd {
        message_id: String,
        input_tokens: u64,
        output_tokens: u64,
    },
    /// UI notification queued by a tool handler (`panel:<name>` on the wire).
    Panel { name: String, data: Value },
}

impl TurnEvent {
    pub fn panel(name: impl Into<String>, data: Value) -> Self {
        TurnEvent::Panel {
            name: name.into(),
            data,
        }
    }

    /// The wire `type` tag for this event.
    pub fn wire_type(&self) -> String {
        match self {
            TurnEvent::TurnStart { .. } => "turn:start".to_string(),
            TurnEvent::TurnDelta { .. } => "turn:delta".to_string(),
            TurnEvent::TurnEnd { .. } => "turn:end".to_string(),
            TurnEvent::Panel { name, .. } => format!("panel:{name}"),
        }
    }
}

impl Serialize for TurnEvent {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            TurnEvent::TurnStart { message_id } => {
                let mut state = serializer.serialize_struct("TurnEvent", 2)?;
                state.serialize_field("type", "turn:start")?;
                state.serialize_field("message_id", message_id)?;
                state.end()
            }
            TurnEvent::TurnDelta {
                message_id,
                content,
            } => {
                let mut state = serializer.serialize_struct("TurnEvent", 3)?;
                state.serialize_field("type", "turn:delta")?;
                state.serialize_field("message_id", message_id)?;
                state.serialize_field("content", content)?;
                state.end()
            }
            TurnEvent::TurnEnd {
                message_id,
                input_tokens,
                output_tokens,
            } => {
                let mut state = serializer.serialize_struct("TurnEvent", 4)?;
                state.serialize_field("type", "turn:end")?;
                state.serialize_field("message_id", message_id)?;
                state.serialize_field("input_tokens", input_tokens)?;
                state.serialize_field("output_tokens", output_tokens)?;
                state.end()
            }
            TurnEvent::Panel { name, data } => {
                let mut state = serializer.serialize_struct("TurnEvent", 2)?;
                state.serialize_field("type", &format!("panel:{name}"))?;
                state.serialize_field("data", data)?;
                state.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for TurnEvent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        let tag = raw
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| D::Error::custom("missing event type"))?;

        let message_id = || {
            raw.get("message_id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        match tag {
            "turn:start" => Ok(TurnEvent::TurnStart {
                message_id: message_id(),
            }),
            "turn:delta" => Ok(TurnEvent::TurnDelta {
                message_id: message_id(),
                content: raw
                    .get("content")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            }),
            "turn:end" => Ok(TurnEvent::TurnEnd {
                message_id: message_id(),
                input_tokens: raw
                    .get("input_tokens")
                    .and_then(Value::as_u64)
                    .unwrap_or_default(),
                output_tokens: raw
                    .get("output_tokens")
                    .and_then(Value::as_u64)
                    .unwrap_or_default(),
            }),
            other => match other.strip_prefix("panel:") {
                Some(name) => Ok(TurnEvent::Panel {
                    name: name.to_string(),
                    data: raw.get("data").cloned().unwrap_or(Value::Null),
                }),
                None => Err(D::Error::custom(format!("unknown event type: {other}"))),
            },
        }
    }
}

/// Channel-based event sender (async, bounded).
pub type TurnEventTx = mpsc::Sender<TurnEvent>;

/// Channel-based event receiver (async, bounded).
pub type TurnEventRx = mpsc::Receiver<TurnEvent>;

/// Default channel capacity for event streams.
///
/// Set high enough (128) to accommodate best-effort delta sends without
/// blocking.
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 128;

/// Creates a bounded event channel with the default capacity.
pub fn create_event_channel() -> (TurnEventTx, TurnEventRx) {
    mpsc::channel(DEFAULT_EVENT_CHANNEL_CAPACITY)
}

/// Event sender wrapper that provides best-effort and reliable send modes.
///
/// Use `send_delta()` for high-volume events (`turn:delta`) that can be
/// dropped if the consumer is slow. Use `send_important()` for events that
/// must be delivered (`turn:start`, `turn:end`, `panel:*`).
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: TurnEventTx,
}

impl EventSender {
    pub fn new(tx: TurnEventTx) -> Self {
        Self { tx }
    }

    /// Best-effort send: never awaits, drops if the channel is full.
    pub fn send_delta(&self, ev: TurnEvent) {
        let _ = self.tx.try_send(ev);
    }

    /// Reliable send: awaits delivery.
    pub async fn send_important(&self, ev: TurnEvent) {
        let _ = self.tx.send(ev).await;
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_turn_events_serialize_with_colon_tags() {
        let start = TurnEvent::TurnStart {
            message_id: "msg_1".to_string(),
        };
        let encoded = serde_json::to_value(&start).unwrap();
        assert_eq!(
            encoded,
            json!({"type": "turn:start", "message_id": "msg_1"})
        );

        let end = TurnEvent::TurnEnd {
            message_id: "msg_1".to_string(),
            input_tokens: 12,
            output_tokens: 34,
        };
        let encoded = serde_json::to_value(&end).unwrap();
        assert_eq!(encoded["type"], "turn:end");
        assert_eq!(encoded["output_tokens"], 34);
    }

    #[test]
    fn test_panel_events_carry_dynamic_tags() {
        let event = TurnEvent::panel("scene-added", json!({"arc_id": "a1"}));
        assert_eq!(event.wire_type(), "panel:scene-added");

        let encoded = serde_json::to_value(&event).unwrap();
        assert_eq!(
            encoded,
            json!({"type": "panel:scene-added", "data": {"arc_id": "a1"}})
        );

        let decoded: TurnEvent = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn test_turn_delta_roundtrip() {
        let event = TurnEvent::TurnDelta {
            message_id: "msg_2".to_string(),
            content: "The monastery ".to_string(),
        };
        let encoded = serde_json::to_string(&event).unwrap();
        let decoded: TurnEvent = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn test_unknown_tag_fails_to_decode() {
        let result: Result<TurnEvent, _> =
            serde_json::from_value(json!({"type": "metrics:tick"}));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_send_delta_is_best_effort() {
        let (tx, _rx) = mpsc::channel(1);
        let sender = EventSender::new(tx);

        // Must not block even though the channel is tiny.
        for i in 0..100 {
            sender.send_delta(TurnEvent::TurnDelta {
                message_id: "msg".to_string(),
                content: format!("chunk {i}"),
            });
        }
    }
}
