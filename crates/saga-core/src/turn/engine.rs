//! Per-turn orchestration.
//!
//! One turn: serialize the document into model context, consume the
//! provider's event stream, then execute any collected tool calls against
//! the document. The engine never owns the document across turns and never
//! persists it; the host saves through its [`crate::store::AdventureStore`]
//! after the turn returns.

use anyhow::Result;
use futures_util::{Stream, StreamExt};
use tracing::debug;

use crate::config::Config;
use crate::context::{SerializeOptions, SerializedContext, serialize};
use crate::prompts::render_stage_prompt;
use crate::provider::shared::{ProtocolEvent, ProviderResult};
use crate::tools::{ToolContext, ToolDispatcher, ToolResult};
use crate::turn::events::{EventSender, TurnEvent};
use crate::turn::parser::{ParsedStream, StreamParser};

/// Per-turn options supplied by the host.
#[derive(Debug, Clone, Default)]
pub struct TurnOptions {
    /// Scene the author is currently editing, if any.
    pub active_section_id: Option<String>,
    /// Live event sink forwarded to the client while the turn runs.
    pub sink: Option<EventSender>,
}

/// Everything one turn produced. The host appends `tool_results` to the
/// conversation and persists the (already mutated) document.
#[derive(Debug)]
pub struct TurnOutcome {
    /// Context text that was serialized for this turn's model call.
    pub context: SerializedContext,
    /// Stage system prompt wrapping that context.
    pub system_prompt: String,
    pub parsed: ParsedStream,
    pub tool_results: Vec<ToolResult>,
    /// Panel events drained from the dispatch, in emission order.
    pub panel_events: Vec<TurnEvent>,
}

/// Runs one turn over an already-open provider stream.
///
/// Tool calls are dispatched strictly sequentially after the stream
/// completes, so history pushes and document mutations within the batch are
/// totally ordered. A transport or decode failure aborts the turn; tool
/// failures do not (they become `is_error` results).
///
/// # Errors
/// Returns an error if the provider stream fails mid-turn.
pub async fn run_turn<S>(
    stream: S,
    dispatcher: &ToolDispatcher,
    ctx: &ToolContext,
    config: &Config,
    options: &TurnOptions,
) -> Result<TurnOutcome>
where
    S: Stream<Item = ProviderResult<ProtocolEvent>>,
{
    let (context, system_prompt) = {
        let document = ctx.document.lock().await;
        let stage = document.stage;
        let context = serialize(
            &document,
            stage,
            &SerializeOptions {
                active_section_id: options.active_section_id.as_deref(),
                max_characters: config.context.max_characters,
            },
        );
        let system_prompt = render_stage_prompt(stage, &context.text)?;
        (context, system_prompt)
    };
    debug!(
        characters = context.character_count,
        tiers = ?context.tiers_included,
        "serialized turn context"
    );

    let mut parser = match &options.sink {
        Some(sink) => StreamParser::with_sink(sink.clone()),
        None => StreamParser::new(),
    };
    let mut stream = std::pin::pin!(stream);
    while let Some(event) = stream.next().await {
        parser.handle_event(event?).await;
    }
    let parsed = parser.finish().await;

    let (tool_results, panel_events) = if parsed.needs_tool_execution() {
        let outcome = dispatcher.dispatch(&parsed.tool_uses, ctx).await;
        let panel_events = ctx.panels.drain();
        if let Some(sink) = &options.sink {
            for event in &panel_events {
                sink.send_important(event.clone()).await;
            }
        }
        (outcome.tool_results, panel_events)
    } else {
        (Vec::new(), Vec::new())
    };

    Ok(TurnOutcome {
        context,
        system_prompt,
        parsed,
        tool_results,
        panel_events,
    })
}
