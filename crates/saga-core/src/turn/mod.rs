//! Turn processing: stream parsing, events, and per-turn orchestration.

pub mod engine;
pub mod events;
pub mod parser;

pub use engine::{TurnOptions, TurnOutcome, run_turn};
pub use events::{EventSender, TurnEvent, TurnEventRx, TurnEventTx, create_event_channel};
pub use parser::{CollectedToolUse, ParsedStream, StreamParser, parse_stream};
