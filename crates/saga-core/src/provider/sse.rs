//! SSE transport adapter: raw byte stream to [`ProtocolEvent`]s.

use std::pin::Pin;

use eventsource_stream::{EventStream, Eventsource};
use futures_util::Stream;

use crate::provider::shared::{ProtocolEvent, ProviderError, ProviderErrorKind, ProviderResult};

/// SSE parser that converts a byte stream into [`ProtocolEvent`]s.
pub struct SseParser<S> {
    inner: EventStream<S>,
}

impl<S> SseParser<S> {
    pub fn new(stream: S) -> Self
    where
        S: Eventsource,
    {
        Self {
            inner: stream.eventsource(),
        }
    }
}

impl<S, E> Stream for SseParser<S>
where
    S: Stream<Item = std::result::Result<bytes::Bytes, E>> + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    type Item = ProviderResult<ProtocolEvent>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        use std::task::Poll;

        match Pin::new(&mut self.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(event))) => Poll::Ready(Some(decode_sse_data(&event.data))),
            Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(ProviderError::new(
                ProviderErrorKind::Transport,
                format!("SSE stream error: {e}"),
            )))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Decodes one SSE data payload into a protocol event.
///
/// The payload's own `type` field governs; the SSE `event:` name is
/// redundant on this protocol and ignored. An empty payload and a payload
/// with an unrecognized tag both map to [`ProtocolEvent::Unknown`]; only a
/// frame that fails to decode as JSON at all is a parse error.
///
/// # Errors
/// Returns an error if the payload is not valid JSON.
pub fn decode_sse_data(data: &str) -> ProviderResult<ProtocolEvent> {
    if data.trim().is_empty() {
        return Ok(ProtocolEvent::Unknown);
    }
    serde_json::from_str(data).map_err(|err| {
        ProviderError::new(
            ProviderErrorKind::Parse,
            format!("Failed to decode stream event: {err}"),
        )
    })
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;

    use super::*;
    use crate::provider::shared::BlockDelta;

    /// SSE fixture simulating a typical streaming text response.
    const SSE_TEXT_RESPONSE: &str = r#"event: message_start
data: {"type":"message_start","message":{"id":"msg_123","model":"vendor-large","usage":{"input_tokens":10,"output_tokens":1}}}

event: content_block_start
data: {"type":"content_block_start","index":0,"content_block":{"type":"text","text":""}}

event: ping
data: {"type":"ping"}

event: content_block_delta
data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"The "}}

event: content_block_delta
data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"monastery "}}

event: content_block_delta
data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"looms."}}

event: content_block_stop
data: {"type":"content_block_stop","index":0}

event: message_delta
data: {"type":"message_delta","delta":{"stop_reason":"end_turn"},"usage":{"output_tokens":5}}

event: message_stop
data: {"type":"message_stop"}

"#;

    /// SSE fixture simulating a tool-use streaming response.
    const SSE_TOOL_USE_RESPONSE: &str = r#"event: message_start
data: {"type":"message_start","message":{"id":"msg_456","model":"vendor-large","usage":{"input_tokens":20,"output_tokens":1}}}

event: content_block_start
data: {"type":"content_block_start","index":0,"content_block":{"type":"tool_use","id":"toolu_abc123","name":"update_section"}}

event: content_block_delta
data: {"type":"content_block_delta","index":0,"delta":{"type":"input_json_delta","partial_json":"{\""}}

event: content_block_delta
data: {"type":"content_block_delta","index":0,"delta":{"type":"input_json_delta","partial_json":"key\": \"tone\", \"value\": \"grim\"}"}}

event: content_block_stop
data: {"type":"content_block_stop","index":0}

event: message_delta
data: {"type":"message_delta","delta":{"stop_reason":"tool_use"},"usage":{"output_tokens":25}}

event: message_stop
data: {"type":"message_stop"}

"#;

    /// Helper to create a mock byte stream from a string.
    fn mock_byte_stream(
        data: &str,
    ) -> impl Stream<Item = std::result::Result<bytes::Bytes, std::io::Error>> {
        let chunks: Vec<_> = data
            .as_bytes()
            .chunks(50) // Simulate chunked delivery
            .map(|c| Ok(bytes::Bytes::copy_from_slice(c)))
            .collect();
        futures_util::stream::iter(chunks)
    }

    async fn collect_events(data: &str) -> Vec<ProtocolEvent> {
        let mut parser = SseParser::new(mock_byte_stream(data));
        let mut events = Vec::new();
        while let Some(result) = parser.next().await {
            events.push(result.expect("valid event"));
        }
        events
    }

    #[tokio::test]
    async fn test_sse_parser_text_response() {
        let events = collect_events(SSE_TEXT_RESPONSE).await;
        assert_eq!(events.len(), 9);

        assert!(matches!(
            &events[0],
            ProtocolEvent::MessageStart { message } if message.model == "vendor-large"
        ));
        assert!(matches!(
            &events[1],
            ProtocolEvent::ContentBlockStart { index: 0, content_block }
                if content_block.kind == "text"
        ));
        assert_eq!(events[2], ProtocolEvent::Ping);
        assert_eq!(
            events[3],
            ProtocolEvent::ContentBlockDelta {
                index: 0,
                delta: BlockDelta::TextDelta {
                    text: "The ".to_string()
                }
            }
        );
        assert_eq!(events[6], ProtocolEvent::ContentBlockStop { index: 0 });
        assert!(matches!(
            &events[7],
            ProtocolEvent::MessageDelta { delta, usage: Some(usage) }
                if delta.stop_reason.as_deref() == Some("end_turn")
                    && usage.output_tokens == 5
        ));
        assert_eq!(events[8], ProtocolEvent::MessageStop);
    }

    #[tokio::test]
    async fn test_sse_parser_tool_use_response() {
        let events = collect_events(SSE_TOOL_USE_RESPONSE).await;
        assert_eq!(events.len(), 7);

        assert!(matches!(
            &events[1],
            ProtocolEvent::ContentBlockStart { index: 0, content_block }
                if content_block.kind == "tool_use"
                    && content_block.id.as_deref() == Some("toolu_abc123")
                    && content_block.name.as_deref() == Some("update_section")
        ));
        assert_eq!(
            events[2],
            ProtocolEvent::ContentBlockDelta {
                index: 0,
                delta: BlockDelta::InputJsonDelta {
                    partial_json: "{\"".to_string()
                }
            }
        );
        assert!(matches!(
            &events[5],
            ProtocolEvent::MessageDelta { delta, .. }
                if delta.stop_reason.as_deref() == Some("tool_use")
        ));
    }

    #[tokio::test]
    async fn test_sse_parser_unknown_event_is_not_an_error() {
        let data = "event: block_annotation\ndata: {\"type\":\"block_annotation\",\"index\":0}\n\n";
        let events = collect_events(data).await;
        assert_eq!(events, vec![ProtocolEvent::Unknown]);
    }

    #[tokio::test]
    async fn test_sse_parser_invalid_json_is_a_parse_error() {
        let data = "event: message_start\ndata: {not json\n\n";
        let mut parser = SseParser::new(mock_byte_stream(data));
        let result = parser.next().await.unwrap();
        let err = result.unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Parse);
    }

    #[tokio::test]
    async fn test_sse_parser_handles_chunks_split_mid_event() {
        let data = "event: ping\ndata: {\"type\":\"ping\"}\n\nevent: message_stop\ndata: {\"type\":\"message_stop\"}\n\n";
        let chunks: Vec<std::result::Result<bytes::Bytes, std::io::Error>> = data
            .as_bytes()
            .chunks(7) // Very small chunks
            .map(|c| Ok(bytes::Bytes::copy_from_slice(c)))
            .collect();
        let mut parser = SseParser::new(futures_util::stream::iter(chunks));

        let mut events = Vec::new();
        while let Some(result) = parser.next().await {
            events.push(result.expect("valid event"));
        }
        assert_eq!(events, vec![ProtocolEvent::Ping, ProtocolEvent::MessageStop]);
    }
}
