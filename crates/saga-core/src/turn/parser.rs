//! Stream parser: protocol events in, one [`ParsedStream`] out.
//!
//! The parser consumes a bounded sequence of [`ProtocolEvent`]s exactly
//! once, in order, accumulating per-block state that lives only for the
//! duration of the parse. It never fails: malformed tool JSON falls back to
//! a `{"_raw": ...}` input, and events referencing unknown block indices or
//! carrying unknown tags are ignored.

use std::collections::BTreeMap;

use futures_util::{Stream, StreamExt};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::provider::shared::{BlockDelta, ContentBlockKind, ProtocolEvent};
use crate::turn::events::{EventSender, TurnEvent};

/// A finalized tool invocation collected from the stream.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedToolUse {
    pub id: String,
    pub name: String,
    pub input: Value,
}

/// Everything one stream parse produced. Pure function of the input stream.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedStream {
    pub message_id: String,
    pub model: String,
    pub stop_reason: Option<String>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Text blocks concatenated in ascending block-index order.
    pub full_text: String,
    /// Ordered event sequence, `turn:start` first and `turn:end` last.
    pub events: Vec<TurnEvent>,
    pub tool_uses: Vec<CollectedToolUse>,
}

impl ParsedStream {
    /// Whether the model asked for tool execution this turn.
    pub fn needs_tool_execution(&self) -> bool {
        !self.tool_uses.is_empty()
    }
}

/// Transient per-parse state for one content block.
#[derive(Debug)]
enum BlockState {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        partial_json: String,
    },
}

/// Incremental stream parser.
///
/// Feed events with [`StreamParser::handle_event`], then call
/// [`StreamParser::finish`] once the input sequence ends. [`parse_stream`]
/// wraps both for callers that hold a complete stream.
#[derive(Debug, Default)]
pub struct StreamParser {
    message_id: String,
    model: String,
    stop_reason: Option<String>,
    input_tokens: u64,
    output_tokens: u64,
    blocks: BTreeMap<usize, BlockState>,
    events: Vec<TurnEvent>,
    tool_uses: Vec<CollectedToolUse>,
    sink: Option<EventSender>,
}

impl StreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mirrors every produced event into `sink` as it happens, so a host
    /// can forward deltas to a client while the parse is still running.
    pub fn with_sink(sink: EventSender) -> Self {
        Self {
            sink: Some(sink),
            ..Self::default()
        }
    }

    /// Applies one protocol event.
    pub async fn handle_event(&mut self, event: ProtocolEvent) {
        match event {
            ProtocolEvent::MessageStart { message } => {
                self.message_id = message.id;
                self.model = message.model;
                self.input_tokens = message.usage.input_tokens;
                self.emit_important(TurnEvent::TurnStart {
                    message_id: self.message_id.clone(),
                })
                .await;
            }
            ProtocolEvent::ContentBlockStart {
                index,
                content_block,
            } => match content_block.kind() {
                ContentBlockKind::Text => {
                    self.blocks.insert(
                        index,
                        BlockState::Text {
                            text: String::new(),
                        },
                    );
                }
                ContentBlockKind::ToolUse => {
                    self.blocks.insert(
                        index,
                        BlockState::ToolUse {
                            id: content_block.id.unwrap_or_default(),
                            name: content_block.name.unwrap_or_default(),
                            partial_json: String::new(),
                        },
                    );
                }
                ContentBlockKind::Other => {
                    debug!(index, kind = %content_block.kind, "ignoring content block");
                }
            },
            ProtocolEvent::ContentBlockDelta { index, delta } => {
                self.handle_block_delta(index, delta).await;
            }
            ProtocolEvent::ContentBlockStop { index } => self.close_block(index),
            ProtocolEvent::MessageDelta { delta, usage } => {
                if delta.stop_reason.is_some() {
                    self.stop_reason = delta.stop_reason;
                }
                // A missing usage field keeps the last known count.
                if let Some(usage) = usage {
                    self.output_tokens = usage.output_tokens;
                }
            }
            // message_stop is advisory; the stream's end terminates iteration.
            ProtocolEvent::MessageStop | ProtocolEvent::Ping | ProtocolEvent::Unknown => {}
            ProtocolEvent::Error { error } => {
                warn!(error_type = %error.error_type, message = %error.message, "provider error event");
            }
        }
    }

    async fn handle_block_delta(&mut self, index: usize, delta: BlockDelta) {
        // Deltas for unregistered indices are dropped: defensive against
        // out-of-order or malformed streams.
        let Some(block) = self.blocks.get_mut(&index) else {
            debug!(index, "delta for unknown block index");
            return;
        };
        match (block, delta) {
            (BlockState::Text { text }, BlockDelta::TextDelta { text: fragment }) => {
                text.push_str(&fragment);
                let event = TurnEvent::TurnDelta {
                    message_id: self.message_id.clone(),
                    content: fragment,
                };
                self.events.push(event.clone());
                if let Some(sink) = &self.sink {
                    sink.send_delta(event);
                }
            }
            (
                BlockState::ToolUse { partial_json, .. },
                BlockDelta::InputJsonDelta {
                    partial_json: fragment,
                },
            ) => {
                // Tool progress is not streamed to the client.
                partial_json.push_str(&fragment);
            }
            _ => {}
        }
    }

    fn close_block(&mut self, index: usize) {
        // Text blocks stay registered for full_text assembly; only tool_use
        // blocks finalize on close.
        let Some(BlockState::ToolUse { .. }) = self.blocks.get(&index) else {
            return;
        };
        let Some(BlockState::ToolUse {
            id,
            name,
            partial_json,
        }) = self.blocks.remove(&index)
        else {
            return;
        };
        let input = serde_json::from_str(&partial_json).unwrap_or_else(|err| {
            warn!(tool = %name, %err, "tool input was not valid JSON; keeping raw");
            json!({ "_raw": partial_json })
        });
        self.tool_uses.push(CollectedToolUse { id, name, input });
    }

    /// Finalizes the parse after the input sequence has ended.
    pub async fn finish(mut self) -> ParsedStream {
        let mut full_text = String::new();
        for block in self.blocks.values() {
            if let BlockState::Text { text } = block {
                full_text.push_str(text);
            }
        }

        let end = TurnEvent::TurnEnd {
            message_id: self.message_id.clone(),
            input_tokens: self.input_tokens,
            output_tokens: self.output_tokens,
        };
        self.events.push(end.clone());
        if let Some(sink) = &self.sink {
            sink.send_important(end).await;
        }

        ParsedStream {
            message_id: self.message_id,
            model: self.model,
            stop_reason: self.stop_reason,
            input_tokens: self.input_tokens,
            output_tokens: self.output_tokens,
            full_text,
            events: self.events,
            tool_uses: self.tool_uses,
        }
    }

    async fn emit_important(&mut self, event: TurnEvent) {
        self.events.push(event.clone());
        if let Some(sink) = &self.sink {
            sink.send_important(event).await;
        }
    }
}

/// Consumes a complete event stream into a [`ParsedStream`].
///
/// Iteration ends when the underlying sequence ends; `message_stop` is
/// advisory only. The caller is responsible for bounding stream lifetime.
pub async fn parse_stream<S>(stream: S) -> ParsedStream
where
    S: Stream<Item = ProtocolEvent>,
{
    let mut parser = StreamParser::new();
    let mut stream = std::pin::pin!(stream);
    while let Some(event) = stream.next().await {
        parser.handle_event(event).await;
    }
    parser.finish().await
}
