//! Wire-protocol types shared across stream consumers.
//!
//! The inbound protocol is decoded exactly once, at this boundary, into a
//! closed tagged union. Downstream code matches variants instead of poking
//! at untyped JSON. Unknown event tags and unknown block kinds decode to
//! explicit catch-all variants so a newer vendor protocol never breaks the
//! parser.

use std::fmt;

use serde::Deserialize;

/// Token usage reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

/// Message envelope carried by `message_start`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MessageStart {
    pub id: String,
    pub model: String,
    #[serde(default)]
    pub usage: Usage,
}

/// Kinds of content block the parser tracks.
///
/// Anything else is carried as [`ContentBlockKind::Other`] and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentBlockKind {
    Text,
    ToolUse,
    Other,
}

impl ContentBlockKind {
    pub fn from_wire(value: &str) -> Self {
        match value {
            "text" => ContentBlockKind::Text,
            "tool_use" => ContentBlockKind::ToolUse,
            _ => ContentBlockKind::Other,
        }
    }
}

/// Header of a content block as announced by `content_block_start`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContentBlockHeader {
    #[serde(rename = "type")]
    pub kind: String,
    /// Tool-use id, present for `tool_use` blocks.
    #[serde(default)]
    pub id: Option<String>,
    /// Tool name, present for `tool_use` blocks.
    #[serde(default)]
    pub name: Option<String>,
}

impl ContentBlockHeader {
    pub fn kind(&self) -> ContentBlockKind {
        ContentBlockKind::from_wire(&self.kind)
    }
}

/// Incremental payload within a content block.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockDelta {
    TextDelta { text: String },
    InputJsonDelta { partial_json: String },
    /// Delta kinds this core does not consume (e.g. thinking).
    #[serde(other)]
    Unknown,
}

/// Body of a `message_delta` event.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MessageDeltaBody {
    #[serde(default)]
    pub stop_reason: Option<String>,
}

/// API-level error payload from an `error` event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiErrorBody {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}

/// One inbound protocol event, decoded from the vendor stream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProtocolEvent {
    MessageStart {
        message: MessageStart,
    },
    ContentBlockStart {
        index: usize,
        content_block: ContentBlockHeader,
    },
    ContentBlockDelta {
        index: usize,
        delta: BlockDelta,
    },
    ContentBlockStop {
        index: usize,
    },
    MessageDelta {
        delta: MessageDeltaBody,
        #[serde(default)]
        usage: Option<Usage>,
    },
    MessageStop,
    Ping,
    Error {
        error: ApiErrorBody,
    },
    /// Forward-compatible catch-all for tags this core does not know.
    #[serde(other)]
    Unknown,
}

/// Categories of provider errors for consistent handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// The transport failed mid-stream.
    Transport,
    /// A frame could not be decoded.
    Parse,
    /// The provider reported an API-level error event.
    ApiError,
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderErrorKind::Transport => write!(f, "transport"),
            ProviderErrorKind::Parse => write!(f, "parse"),
            ProviderErrorKind::ApiError => write!(f, "api_error"),
        }
    }
}

/// Structured error from the provider layer.
#[derive(Debug, Clone)]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn api_error(error_type: &str, message: &str) -> Self {
        Self::new(
            ProviderErrorKind::ApiError,
            format!("{error_type}: {message}"),
        )
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ProviderError {}

/// Result type for provider operations.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;
