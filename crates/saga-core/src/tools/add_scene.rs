//! Tool for appending a new draft scene.

use anyhow::Result;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{ToolContext, ToolDefinition, ToolOutcome};
use crate::document::SceneState;

/// Returns the tool definition for the `add_scene` tool.
pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "add_scene".to_string(),
        description: "Append a new draft scene to the adventure and return its id.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "title": {
                    "type": "string",
                    "description": "Title of the new scene"
                }
            },
            "required": ["title"],
            "additionalProperties": false
        }),
    }
}

#[derive(Debug, Deserialize)]
struct AddSceneInput {
    title: String,
}

///
/// # Errors
/// Returns an error if the operation fails.
pub async fn execute(input: &Value, ctx: &ToolContext) -> Result<ToolOutcome> {
    let input: AddSceneInput = match serde_json::from_value(input.clone()) {
        Ok(input) => input,
        Err(err) => return Ok(ToolOutcome::error(format!("Invalid input: {err}"))),
    };
    if input.title.trim().is_empty() {
        return Ok(ToolOutcome::error("Scene title must not be empty"));
    }

    let scene = SceneState::new(input.title.trim());
    let arc_id = scene.id.clone();
    let title = scene.title.clone();
    ctx.document.lock().await.scenes.push(scene);

    ctx.panels.push(
        "scene-added",
        json!({ "arc_id": arc_id.clone(), "title": title.clone() }),
    );

    Ok(ToolOutcome::ok(json!({ "arc_id": arc_id, "title": title })))
}
