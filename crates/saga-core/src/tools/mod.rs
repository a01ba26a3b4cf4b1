//! Tool system: registry, sequential dispatch, and authoring tools.
//!
//! Tool handlers mutate the adventure document in response to model tool
//! calls. Dispatch is strictly sequential so that history pushes and
//! document mutations from one batch are totally ordered; a failing call
//! never aborts its siblings.

pub mod add_scene;
pub mod advance_stage;
pub mod set_scene_status;
pub mod undo_section;
pub mod update_scene_section;
pub mod update_section;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::warn;

use crate::document::AdventureState;
use crate::history::VersionHistoryStore;
use crate::turn::events::TurnEvent;
use crate::turn::parser::CollectedToolUse;

/// Tool definition advertised to the model.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// What a handler returns: a result value and an error flag.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub result: Value,
    pub is_error: bool,
}

impl ToolOutcome {
    pub fn ok(result: Value) -> Self {
        Self {
            result,
            is_error: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            result: Value::String(message.into()),
            is_error: true,
        }
    }
}

/// One entry of a dispatch result, preserving input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_use_id: String,
    pub content: String,
    /// Present on the wire only when true.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_error: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Buffer for `panel:*` events queued by handlers during a dispatch.
///
/// One sink exists per dispatch context, never module-global, so concurrent
/// sessions cannot cross-contaminate. `drain` snapshots and clears in one
/// step: two drains in a row never double-deliver.
#[derive(Debug, Clone, Default)]
pub struct PanelSink {
    pending: Arc<StdMutex<Vec<TurnEvent>>>,
}

impl PanelSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, name: impl Into<String>, data: Value) {
        self.lock().push(TurnEvent::panel(name, data));
    }

    pub fn drain(&self) -> Vec<TurnEvent> {
        std::mem::take(&mut *self.lock())
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<TurnEvent>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Shared context handed to every handler in a dispatch.
///
/// Handlers run sequentially; the mutexes exist because handler futures
/// must be `'static`, not because calls race.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub document: Arc<Mutex<AdventureState>>,
    pub history: Arc<Mutex<VersionHistoryStore>>,
    pub panels: PanelSink,
    /// Optional per-handler timeout.
    pub timeout: Option<Duration>,
}

impl ToolContext {
    pub fn new(document: AdventureState) -> Self {
        Self {
            document: Arc::new(Mutex::new(document)),
            history: Arc::new(Mutex::new(VersionHistoryStore::new())),
            panels: PanelSink::new(),
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Async tool handler function.
pub type ToolFuture = Pin<Box<dyn Future<Output = Result<ToolOutcome>> + Send>>;
pub type ToolHandler = Arc<dyn Fn(&Value, &ToolContext) -> ToolFuture + Send + Sync>;

/// Result of dispatching one batch of collected tool calls.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub tool_results: Vec<ToolResult>,
}

/// Registry mapping tool names to handlers, plus dispatch.
#[derive(Clone, Default)]
pub struct ToolDispatcher {
    definitions: Vec<ToolDefinition>,
    handlers: HashMap<String, ToolHandler>,
}

impl std::fmt::Debug for ToolDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDispatcher")
            .field("definitions", &self.definitions)
            .field("handlers_len", &self.handlers.len())
            .finish()
    }
}

impl ToolDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatcher with every built-in authoring tool registered.
    pub fn builtins() -> Self {
        let mut dispatcher = Self::new();
        dispatcher.register_authoring_tools();
        dispatcher
    }

    /// Registers a handler. A later registration for the same name replaces
    /// the earlier one; stages re-register their tool sets this way.
    pub fn register(&mut self, definition: ToolDefinition, handler: ToolHandler) {
        let name_lower = definition.name.to_ascii_lowercase();
        if let Some(pos) = self
            .definitions
            .iter()
            .position(|t| t.name.eq_ignore_ascii_case(&definition.name))
        {
            self.definitions.remove(pos);
        }
        self.definitions.push(definition);
        self.handlers.insert(name_lower, handler);
    }

    /// Empties the registry. Used between stage transitions and in tests.
    pub fn clear(&mut self) {
        self.definitions.clear();
        self.handlers.clear();
    }

    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.definitions
            .iter()
            .map(|t| t.name.to_ascii_lowercase())
            .collect()
    }

    /// Executes every call in order, sequentially.
    ///
    /// Each call is isolated: a missing handler or a handler error becomes
    /// an `is_error` result for that call alone, and the batch continues.
    /// Output order matches input order.
    pub async fn dispatch(
        &self,
        calls: &[CollectedToolUse],
        ctx: &ToolContext,
    ) -> DispatchOutcome {
        let mut tool_results = Vec::with_capacity(calls.len());

        for call in calls {
            let result = match self.handlers.get(&call.name.to_ascii_lowercase()) {
                None => {
                    warn!(tool = %call.name, "no handler registered");
                    ToolResult {
                        tool_use_id: call.id.clone(),
                        content: format!("No handler registered for tool: {}", call.name),
                        is_error: true,
                    }
                }
                Some(handler) => match invoke_handler(handler, call, ctx).await {
                    Ok(outcome) => ToolResult {
                        tool_use_id: call.id.clone(),
                        content: render_content(&outcome.result),
                        is_error: outcome.is_error,
                    },
                    Err(err) => {
                        warn!(tool = %call.name, error = %err, "handler failed");
                        ToolResult {
                            tool_use_id: call.id.clone(),
                            content: format!("Tool {} failed: {err:#}", call.name),
                            is_error: true,
                        }
                    }
                },
            };
            tool_results.push(result);
        }

        DispatchOutcome { tool_results }
    }

    /// Registers the built-in authoring tool set.
    pub fn register_authoring_tools(&mut self) {
        self.register(
            update_section::definition(),
            Arc::new(|input, ctx| {
                let input = input.clone();
                let ctx = ctx.clone();
                Box::pin(async move { update_section::execute(&input, &ctx).await })
            }),
        );

        self.register(
            update_scene_section::definition(),
            Arc::new(|input, ctx| {
                let input = input.clone();
                let ctx = ctx.clone();
                Box::pin(async move { update_scene_section::execute(&input, &ctx).await })
            }),
        );

        self.register(
            add_scene::definition(),
            Arc::new(|input, ctx| {
                let input = input.clone();
                let ctx = ctx.clone();
                Box::pin(async move { add_scene::execute(&input, &ctx).await })
            }),
        );

        self.register(
            set_scene_status::definition(),
            Arc::new(|input, ctx| {
                let input = input.clone();
                let ctx = ctx.clone();
                Box::pin(async move { set_scene_status::execute(&input, &ctx).await })
            }),
        );

        self.register(
            undo_section::definition(),
            Arc::new(|input, ctx| {
                let input = input.clone();
                let ctx = ctx.clone();
                Box::pin(async move { undo_section::execute(&input, &ctx).await })
            }),
        );

        self.register(
            advance_stage::definition(),
            Arc::new(|input, ctx| {
                let input = input.clone();
                let ctx = ctx.clone();
                Box::pin(async move { advance_stage::execute(&input, &ctx).await })
            }),
        );
    }
}

/// Awaits one handler, applying the context timeout when configured.
async fn invoke_handler(
    handler: &ToolHandler,
    call: &CollectedToolUse,
    ctx: &ToolContext,
) -> Result<ToolOutcome> {
    let fut = handler(&call.input, ctx);
    match ctx.timeout {
        Some(timeout) => match tokio::time::timeout(timeout, fut).await {
            Ok(result) => result,
            Err(_) => Ok(ToolOutcome::error(format!(
                "Tool {} timed out after {} seconds",
                call.name,
                timeout.as_secs()
            ))),
        },
        None => fut.await,
    }
}

/// Renders a handler result for the model: strings pass through verbatim,
/// everything else is JSON-stringified.
fn render_content(result: &Value) -> String {
    match result {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
