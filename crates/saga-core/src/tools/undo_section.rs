//! Tool for reverting a section to its previous value.

use anyhow::Result;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{ToolContext, ToolDefinition, ToolOutcome};

/// Returns the tool definition for the `undo_section` tool.
pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "undo_section".to_string(),
        description: "Revert a section to its most recent previous value. The path is a \
            top-level key or 'scene:<arc_id>:<section>'."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Section path to revert"
                }
            },
            "required": ["path"],
            "additionalProperties": false
        }),
    }
}

#[derive(Debug, Deserialize)]
struct UndoSectionInput {
    path: String,
}

///
/// # Errors
/// Returns an error if the operation fails.
pub async fn execute(input: &Value, ctx: &ToolContext) -> Result<ToolOutcome> {
    let input: UndoSectionInput = match serde_json::from_value(input.clone()) {
        Ok(input) => input,
        Err(err) => return Ok(ToolOutcome::error(format!("Invalid input: {err}"))),
    };

    let mut document = ctx.document.lock().await;
    let outcome = ctx
        .history
        .lock()
        .await
        .apply_undo(&mut document, &input.path);

    if !outcome.success {
        return Ok(ToolOutcome::error(
            outcome
                .error
                .unwrap_or_else(|| "Undo failed".to_string()),
        ));
    }

    if outcome.restored {
        ctx.panels.push(
            "section-restored",
            json!({
                "path": input.path.clone(),
                "remaining_entries": outcome.remaining_entries,
            }),
        );
    }

    Ok(ToolOutcome::ok(json!({
        "path": input.path,
        "restored": outcome.restored,
        "remaining_entries": outcome.remaining_entries,
    })))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::document::AdventureState;
    use crate::tools::update_section;

    #[tokio::test]
    async fn test_undo_after_update_restores_previous_value() {
        let mut doc = AdventureState::default();
        doc.set_section("tone", json!("grim"));
        let ctx = ToolContext::new(doc);

        update_section::execute(&json!({"key": "tone", "value": "whimsical"}), &ctx)
            .await
            .unwrap();
        let outcome = execute(&json!({"path": "tone"}), &ctx).await.unwrap();

        assert!(!outcome.is_error);
        assert_eq!(
            ctx.document.lock().await.section("tone"),
            Some(&json!("grim"))
        );
        assert_eq!(ctx.panels.drain().len(), 1);
    }

    #[tokio::test]
    async fn test_undo_with_no_history_is_an_error_result() {
        let ctx = ToolContext::new(AdventureState::default());
        let outcome = execute(&json!({"path": "tone"}), &ctx).await.unwrap();
        assert!(outcome.is_error);
        assert!(ctx.panels.is_empty());
    }
}
