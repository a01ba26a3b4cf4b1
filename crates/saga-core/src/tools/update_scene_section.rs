//! Tool for overwriting one named section of one scene.

use anyhow::Result;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{ToolContext, ToolDefinition, ToolOutcome};
use crate::history::SectionPath;

/// Returns the tool definition for the `update_scene_section` tool.
pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "update_scene_section".to_string(),
        description: "Overwrite a named section of one scene (e.g. summary, location, \
            encounters). The previous value is kept in undo history."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "arc_id": {
                    "type": "string",
                    "description": "Identifier of the scene to edit"
                },
                "section": {
                    "type": "string",
                    "description": "Scene section name to overwrite"
                },
                "value": {
                    "description": "New value for the section"
                },
                "description": {
                    "type": "string",
                    "description": "Optional note describing the change"
                }
            },
            "required": ["arc_id", "section", "value"],
            "additionalProperties": false
        }),
    }
}

#[derive(Debug, Deserialize)]
struct UpdateSceneSectionInput {
    arc_id: String,
    section: String,
    value: Value,
    #[serde(default)]
    description: Option<String>,
}

///
/// # Errors
/// Returns an error if the operation fails.
pub async fn execute(input: &Value, ctx: &ToolContext) -> Result<ToolOutcome> {
    let input: UpdateSceneSectionInput = match serde_json::from_value(input.clone()) {
        Ok(input) => input,
        Err(err) => return Ok(ToolOutcome::error(format!("Invalid input: {err}"))),
    };

    let mut document = ctx.document.lock().await;
    let Some(scene) = document.scene_mut(&input.arc_id) else {
        return Ok(ToolOutcome::error(format!(
            "No scene with id: {}",
            input.arc_id
        )));
    };

    let path = SectionPath::Scene {
        arc_id: input.arc_id.clone(),
        section: input.section.clone(),
    }
    .to_string();
    let previous = scene
        .section(&input.section)
        .cloned()
        .unwrap_or(Value::Null);

    ctx.history
        .lock()
        .await
        .push_version(&path, &previous, input.description);
    scene.set_section(input.section.clone(), input.value);

    Ok(ToolOutcome::ok(json!({
        "arc_id": input.arc_id,
        "section": input.section,
        "updated": true,
    })))
}
