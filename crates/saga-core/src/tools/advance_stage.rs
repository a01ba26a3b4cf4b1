//! Tool for moving the document to another authoring stage.

use anyhow::Result;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{ToolContext, ToolDefinition, ToolOutcome};
use crate::document::Stage;

/// Returns the tool definition for the `advance_stage` tool.
pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "advance_stage".to_string(),
        description: "Move the adventure to another authoring stage \
            (premise, outline, scenes, review)."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "stage": {
                    "type": "string",
                    "enum": ["premise", "outline", "scenes", "review"],
                    "description": "Target stage"
                }
            },
            "required": ["stage"],
            "additionalProperties": false
        }),
    }
}

#[derive(Debug, Deserialize)]
struct AdvanceStageInput {
    stage: String,
}

///
/// # Errors
/// Returns an error if the operation fails.
pub async fn execute(input: &Value, ctx: &ToolContext) -> Result<ToolOutcome> {
    let input: AdvanceStageInput = match serde_json::from_value(input.clone()) {
        Ok(input) => input,
        Err(err) => return Ok(ToolOutcome::error(format!("Invalid input: {err}"))),
    };
    let Some(stage) = Stage::from_name(&input.stage) else {
        return Ok(ToolOutcome::error(format!(
            "Unknown stage: {}",
            input.stage
        )));
    };

    ctx.document.lock().await.stage = stage;
    ctx.panels
        .push("stage", json!({ "stage": stage.display_name() }));

    Ok(ToolOutcome::ok(json!({ "stage": stage.display_name() })))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::document::AdventureState;

    #[tokio::test]
    async fn test_advance_to_outline() {
        let ctx = ToolContext::new(AdventureState::default());
        let outcome = execute(&json!({"stage": "outline"}), &ctx).await.unwrap();
        assert!(!outcome.is_error);
        assert_eq!(ctx.document.lock().await.stage, Stage::Outline);
    }

    #[tokio::test]
    async fn test_unknown_stage_is_rejected() {
        let ctx = ToolContext::new(AdventureState::default());
        let outcome = execute(&json!({"stage": "epilogue"}), &ctx).await.unwrap();
        assert!(outcome.is_error);
        assert_eq!(ctx.document.lock().await.stage, Stage::Premise);
    }
}
