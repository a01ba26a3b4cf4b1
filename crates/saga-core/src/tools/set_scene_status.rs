//! Tool for moving a scene between draft and confirmed.

use anyhow::Result;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{ToolContext, ToolDefinition, ToolOutcome};
use crate::document::SceneStatus;

/// Returns the tool definition for the `set_scene_status` tool.
pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "set_scene_status".to_string(),
        description: "Mark a scene as draft or confirmed. Confirmed scenes appear in the \
            compressed outline context."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "arc_id": {
                    "type": "string",
                    "description": "Identifier of the scene"
                },
                "status": {
                    "type": "string",
                    "enum": ["draft", "confirmed"],
                    "description": "New status"
                }
            },
            "required": ["arc_id", "status"],
            "additionalProperties": false
        }),
    }
}

#[derive(Debug, Deserialize)]
struct SetSceneStatusInput {
    arc_id: String,
    status: String,
}

///
/// # Errors
/// Returns an error if the operation fails.
pub async fn execute(input: &Value, ctx: &ToolContext) -> Result<ToolOutcome> {
    let input: SetSceneStatusInput = match serde_json::from_value(input.clone()) {
        Ok(input) => input,
        Err(err) => return Ok(ToolOutcome::error(format!("Invalid input: {err}"))),
    };
    let Some(status) = SceneStatus::from_name(&input.status) else {
        return Ok(ToolOutcome::error(format!(
            "Unknown scene status: {}",
            input.status
        )));
    };

    let mut document = ctx.document.lock().await;
    let Some(scene) = document.scene_mut(&input.arc_id) else {
        return Ok(ToolOutcome::error(format!(
            "No scene with id: {}",
            input.arc_id
        )));
    };
    scene.status = status;

    ctx.panels.push(
        "scene-status",
        json!({ "arc_id": input.arc_id.clone(), "status": input.status.clone() }),
    );

    Ok(ToolOutcome::ok(json!({
        "arc_id": input.arc_id,
        "status": input.status,
    })))
}
