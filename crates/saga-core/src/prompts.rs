//! Stage prompt templates and assembly.

use anyhow::{Context as _, Result};
use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;

use crate::document::Stage;

/// Prompt template for the premise stage (`MiniJinja`).
pub const PREMISE_STAGE_TEMPLATE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/premise_stage.md"
));

/// Prompt template for the outline stage (`MiniJinja`).
pub const OUTLINE_STAGE_TEMPLATE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/outline_stage.md"
));

/// Prompt template for the scene-editing stage (`MiniJinja`).
pub const SCENES_STAGE_TEMPLATE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/scenes_stage.md"
));

/// Prompt template for the review stage (`MiniJinja`).
pub const REVIEW_STAGE_TEMPLATE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/review_stage.md"
));

/// Returns the raw template for a stage.
pub fn stage_template(stage: Stage) -> &'static str {
    match stage {
        Stage::Premise => PREMISE_STAGE_TEMPLATE,
        Stage::Outline => OUTLINE_STAGE_TEMPLATE,
        Stage::Scenes => SCENES_STAGE_TEMPLATE,
        Stage::Review => REVIEW_STAGE_TEMPLATE,
    }
}

#[derive(Debug, Serialize)]
struct StagePromptVars<'a> {
    stage: &'static str,
    context: &'a str,
}

/// Renders the system prompt for a stage around the serialized context.
///
/// # Errors
/// Returns an error if the template fails to render.
pub fn render_stage_prompt(stage: Stage, context_text: &str) -> Result<String> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.add_template("stage_prompt", stage_template(stage))
        .context("invalid stage prompt template")?;

    let rendered = env
        .get_template("stage_prompt")
        .context("stage prompt template missing")?
        .render(StagePromptVars {
            stage: stage.display_name(),
            context: context_text,
        })
        .context("failed to render stage prompt")?;

    Ok(rendered.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_stage_template_renders() {
        for stage in Stage::all() {
            let rendered = render_stage_prompt(*stage, "Concept: a heist").unwrap();
            assert!(rendered.contains("adventure-authoring assistant"));
            assert!(rendered.contains("Concept: a heist"));
        }
    }

    #[test]
    fn test_empty_context_omits_state_block() {
        let rendered = render_stage_prompt(Stage::Premise, "").unwrap();
        assert!(!rendered.contains("Current adventure state"));
    }
}
