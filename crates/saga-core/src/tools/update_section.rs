//! Tool for overwriting a top-level document section.
//!
//! Captures the prior value into version history before mutating, so the
//! change can be undone.

use anyhow::Result;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{ToolContext, ToolDefinition, ToolOutcome};

/// Returns the tool definition for the `update_section` tool.
pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "update_section".to_string(),
        description: "Overwrite a top-level adventure section (e.g. concept, setting, tone, \
            beats). The previous value is kept in undo history."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "key": {
                    "type": "string",
                    "description": "Top-level section key to overwrite"
                },
                "value": {
                    "description": "New value for the section"
                },
                "description": {
                    "type": "string",
                    "description": "Optional note describing the change"
                }
            },
            "required": ["key", "value"],
            "additionalProperties": false
        }),
    }
}

#[derive(Debug, Deserialize)]
struct UpdateSectionInput {
    key: String,
    value: Value,
    #[serde(default)]
    description: Option<String>,
}

///
/// # Errors
/// Returns an error if the operation fails.
pub async fn execute(input: &Value, ctx: &ToolContext) -> Result<ToolOutcome> {
    let input: UpdateSectionInput = match serde_json::from_value(input.clone()) {
        Ok(input) => input,
        Err(err) => return Ok(ToolOutcome::error(format!("Invalid input: {err}"))),
    };
    if input.key.trim().is_empty() {
        return Ok(ToolOutcome::error("Section key must not be empty"));
    }

    let mut document = ctx.document.lock().await;
    let previous = document
        .section(&input.key)
        .cloned()
        .unwrap_or(Value::Null);

    // History first: capture what is about to be overwritten.
    ctx.history
        .lock()
        .await
        .push_version(&input.key, &previous, input.description);
    document.set_section(input.key.clone(), input.value);

    Ok(ToolOutcome::ok(json!({
        "key": input.key,
        "updated": true,
    })))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::document::AdventureState;

    #[tokio::test]
    async fn test_update_pushes_history_before_overwriting() {
        let mut doc = AdventureState::default();
        doc.set_section("tone", json!("grim"));
        let ctx = ToolContext::new(doc);

        let outcome = execute(
            &json!({"key": "tone", "value": "whimsical", "description": "lighter"}),
            &ctx,
        )
        .await
        .unwrap();
        assert!(!outcome.is_error);

        let document = ctx.document.lock().await;
        assert_eq!(document.section("tone"), Some(&json!("whimsical")));

        let history = ctx.history.lock().await;
        assert_eq!(history.version_count("tone"), 1);
        assert_eq!(history.history("tone")[0].value, json!("grim"));
        assert_eq!(
            history.history("tone")[0].description.as_deref(),
            Some("lighter")
        );
    }

    #[tokio::test]
    async fn test_first_write_records_null_prior_value() {
        let ctx = ToolContext::new(AdventureState::default());
        execute(&json!({"key": "concept", "value": "heist"}), &ctx)
            .await
            .unwrap();

        let history = ctx.history.lock().await;
        assert_eq!(history.history("concept")[0].value, Value::Null);
    }

    #[tokio::test]
    async fn test_malformed_input_is_an_error_result() {
        let ctx = ToolContext::new(AdventureState::default());
        let outcome = execute(&json!({"value": "no key"}), &ctx).await.unwrap();
        assert!(outcome.is_error);
    }
}
