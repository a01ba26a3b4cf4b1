//! Vendor streaming protocol: wire-event types and SSE transport adapter.

pub mod shared;
pub mod sse;

pub use shared::{
    BlockDelta, ContentBlockHeader, ContentBlockKind, ProtocolEvent, ProviderError,
    ProviderErrorKind, ProviderResult, Usage,
};
pub use sse::SseParser;
