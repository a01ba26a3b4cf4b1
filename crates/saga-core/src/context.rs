//! Context serializer: renders the document into a budget-capped text blob
//! for the next model call.
//!
//! The document is organized into three inclusion tiers:
//!
//! 1. **premise**: a short prose summary of the premise fields; included
//!    whenever any of them is populated.
//! 2. **active-scene**: a full rendering of the active scene; included
//!    only in the scene-editing stage when the caller names a scene that
//!    exists.
//! 3. **outline**: one line per beat plus a compressed brief per confirmed
//!    scene (excluding the active scene); included for the outline stage
//!    onward.
//!
//! Non-empty tiers are joined in tier order with a fixed separator and the
//! result is truncated to the character budget, prefix first.

use serde_json::Value;

use crate::document::{
    AdventureState, BEATS_KEY, PREMISE_KEYS, SUMMARY_SECTION, SceneState, SceneStatus, Stage,
    value_is_empty,
};

/// Default character budget for a serialized context.
pub const DEFAULT_MAX_CHARACTERS: usize = 12_000;

/// Maximum length of a compressed scene brief line.
const BRIEF_MAX_CHARACTERS: usize = 120;

/// Separator between tiers in the joined output.
const TIER_SEPARATOR: &str = "\n\n";

/// Tier labels reported in [`SerializedContext::tiers_included`].
pub const TIER_PREMISE: &str = "premise";
pub const TIER_ACTIVE_SCENE: &str = "active-scene";
pub const TIER_OUTLINE: &str = "outline";

/// Options for one serialization.
#[derive(Debug, Clone)]
pub struct SerializeOptions<'a> {
    /// Scene receiving the verbose Tier 2 treatment.
    pub active_section_id: Option<&'a str>,
    pub max_characters: usize,
}

impl Default for SerializeOptions<'_> {
    fn default() -> Self {
        Self {
            active_section_id: None,
            max_characters: DEFAULT_MAX_CHARACTERS,
        }
    }
}

/// The rendered context. Pure function of `(document, stage, options)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedContext {
    pub text: String,
    /// Character count of the final (possibly truncated) text.
    pub character_count: usize,
    pub tiers_included: Vec<String>,
}

/// Renders the document into tiered, budget-capped context text.
pub fn serialize(
    document: &AdventureState,
    stage: Stage,
    options: &SerializeOptions<'_>,
) -> SerializedContext {
    let active_scene = options
        .active_section_id
        .and_then(|id| document.scene(id));

    let mut parts: Vec<String> = Vec::new();
    let mut tiers_included: Vec<String> = Vec::new();

    if let Some(premise) = render_premise(document) {
        parts.push(premise);
        tiers_included.push(TIER_PREMISE.to_string());
    }

    if stage.is_scene_editing()
        && let Some(scene) = active_scene
        && let Some(rendered) = render_active_scene(scene)
    {
        parts.push(rendered);
        tiers_included.push(TIER_ACTIVE_SCENE.to_string());
    }

    if stage.includes_outline_context()
        && let Some(outline) = render_outline(document, options.active_section_id)
    {
        parts.push(outline);
        tiers_included.push(TIER_OUTLINE.to_string());
    }

    let text = truncate_with_ellipsis(&parts.join(TIER_SEPARATOR), options.max_characters);
    let character_count = text.chars().count();

    SerializedContext {
        text,
        character_count,
        tiers_included,
    }
}

/// Tier 1: prose summary of the premise fields.
fn render_premise(document: &AdventureState) -> Option<String> {
    let mut lines: Vec<String> = Vec::new();
    for key in PREMISE_KEYS {
        if let Some(text) = document.section_text(key)
            && !text.trim().is_empty()
        {
            lines.push(format!("{}: {}", capitalize(key), text.trim()));
        }
    }
    (!lines.is_empty()).then(|| format!("# Adventure premise\n{}", lines.join("\n")))
}

/// Tier 2: full verbose rendering of the active scene.
fn render_active_scene(scene: &SceneState) -> Option<String> {
    let mut out = format!("# Active scene: {} ({})", scene.title, scene.id);
    let mut any = false;
    for (name, value) in scene.populated_sections() {
        any = true;
        out.push_str(&format!("\n\n## {name}\n{}", render_value(value)));
    }
    any.then_some(out)
}

/// Tier 3: compressed beat outline plus confirmed-scene briefs.
///
/// The active scene is always excluded from the briefs so Tier 2 content is
/// never duplicated.
fn render_outline(document: &AdventureState, active_section_id: Option<&str>) -> Option<String> {
    let mut sections: Vec<String> = Vec::new();

    if let Some(Value::Array(beats)) = document.section(BEATS_KEY)
        && !beats.is_empty()
    {
        let lines: Vec<String> = beats
            .iter()
            .map(|beat| format!("- {}", one_line(&render_value(beat))))
            .collect();
        sections.push(format!("# Outline\n{}", lines.join("\n")));
    }

    let briefs: Vec<String> = document
        .scenes
        .iter()
        .filter(|scene| scene.status == SceneStatus::Confirmed)
        .filter(|scene| active_section_id != Some(scene.id.as_str()))
        .map(scene_brief)
        .collect();
    if !briefs.is_empty() {
        sections.push(format!("# Confirmed scenes\n{}", briefs.join("\n")));
    }

    (!sections.is_empty()).then(|| sections.join("\n\n"))
}

/// One compressed line for a confirmed scene: its summary section when
/// present, else the first populated section.
fn scene_brief(scene: &SceneState) -> String {
    let source = scene
        .section(SUMMARY_SECTION)
        .filter(|v| !value_is_empty(v))
        .or_else(|| scene.populated_sections().next().map(|(_, v)| v));
    match source {
        Some(value) => format!(
            "- {}: {}",
            scene.title,
            clip(&one_line(&render_value(value)), BRIEF_MAX_CHARACTERS)
        ),
        None => format!("- {}", scene.title),
    }
}

/// Renders a section value: strings verbatim, everything else as JSON.
fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn clip(text: &str, max_characters: usize) -> String {
    if text.chars().count() <= max_characters {
        return text.to_string();
    }
    text.chars().take(max_characters).collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Truncates to the budget, keeping the prefix and appending `"..."`.
///
/// Join order is fixed, so earlier tiers always survive truncation.
fn truncate_with_ellipsis(text: &str, max_characters: usize) -> String {
    if text.chars().count() <= max_characters {
        return text.to_string();
    }
    let keep = max_characters.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::document::SceneState;

    fn sample_document() -> (AdventureState, String) {
        let mut doc = AdventureState::default();
        doc.set_section("concept", json!("A heist in a drowned monastery"));
        doc.set_section("setting", json!("Storm-wracked coastal marches"));
        doc.set_section("tone", json!("grim"));
        doc.set_section(
            "beats",
            json!(["Arrival at the causeway", "The bells toll backward", "The vault floods"]),
        );

        let mut active = SceneState::new("The Causeway");
        active.status = SceneStatus::Confirmed;
        active.set_section("summary", json!("Pilgrims block the only road."));
        active.set_section("encounters", json!("Toll-keeper and his drowned hounds."));
        let active_id = active.id.clone();

        let mut other = SceneState::new("The Bells");
        other.status = SceneStatus::Confirmed;
        other.set_section("summary", json!("The carillon rings by itself."));

        let draft = SceneState::new("The Vault");

        doc.scenes.push(active);
        doc.scenes.push(other);
        doc.scenes.push(draft);
        (doc, active_id)
    }

    #[test]
    fn test_outline_stage_never_includes_active_scene_tier() {
        let (doc, active_id) = sample_document();
        let context = serialize(
            &doc,
            Stage::Outline,
            &SerializeOptions {
                active_section_id: Some(&active_id),
                ..SerializeOptions::default()
            },
        );

        assert_eq!(
            context.tiers_included,
            vec![TIER_PREMISE.to_string(), TIER_OUTLINE.to_string()]
        );
        assert!(!context.text.contains("Active scene"));
    }

    #[test]
    fn test_scene_stage_includes_all_three_tiers() {
        let (doc, active_id) = sample_document();
        let context = serialize(
            &doc,
            Stage::Scenes,
            &SerializeOptions {
                active_section_id: Some(&active_id),
                ..SerializeOptions::default()
            },
        );

        assert_eq!(
            context.tiers_included,
            vec![
                TIER_PREMISE.to_string(),
                TIER_ACTIVE_SCENE.to_string(),
                TIER_OUTLINE.to_string()
            ]
        );
        // Active scene content lives in Tier 2...
        assert!(context.text.contains("Active scene: The Causeway"));
        assert!(context.text.contains("Toll-keeper"));
        // ...and is excluded from Tier 3's confirmed-scene briefs.
        let confirmed = context.text.split("# Confirmed scenes").nth(1).unwrap();
        assert!(!confirmed.contains("The Causeway"));
        assert!(confirmed.contains("The Bells"));
        // Draft scenes never appear in the outline tier.
        assert!(!confirmed.contains("The Vault"));
    }

    #[test]
    fn test_unresolvable_active_scene_skips_tier_two() {
        let (doc, _) = sample_document();
        let context = serialize(
            &doc,
            Stage::Scenes,
            &SerializeOptions {
                active_section_id: Some("no-such-scene"),
                ..SerializeOptions::default()
            },
        );
        assert!(!context
            .tiers_included
            .contains(&TIER_ACTIVE_SCENE.to_string()));
    }

    #[test]
    fn test_premise_stage_renders_premise_only() {
        let (doc, _) = sample_document();
        let context = serialize(&doc, Stage::Premise, &SerializeOptions::default());
        assert_eq!(context.tiers_included, vec![TIER_PREMISE.to_string()]);
        assert!(context.text.starts_with("# Adventure premise"));
        assert!(context.text.contains("Concept: A heist"));
    }

    #[test]
    fn test_empty_document_serializes_to_nothing() {
        let doc = AdventureState::default();
        let context = serialize(&doc, Stage::Review, &SerializeOptions::default());
        assert!(context.text.is_empty());
        assert_eq!(context.character_count, 0);
        assert!(context.tiers_included.is_empty());
    }

    #[test]
    fn test_truncation_preserves_prefix_and_appends_ellipsis() {
        let (doc, active_id) = sample_document();
        let context = serialize(
            &doc,
            Stage::Scenes,
            &SerializeOptions {
                active_section_id: Some(&active_id),
                max_characters: 100,
            },
        );

        assert!(context.character_count <= 100);
        assert!(context.text.ends_with("..."));
        // Tier 1 is at the front of the join, so it survives the slice.
        assert!(context.text.starts_with("# Adventure premise"));
        assert_eq!(context.character_count, context.text.chars().count());
    }

    #[test]
    fn test_character_count_matches_final_text() {
        let (doc, _) = sample_document();
        let context = serialize(&doc, Stage::Outline, &SerializeOptions::default());
        assert_eq!(context.character_count, context.text.chars().count());
    }

    #[test]
    fn test_scene_brief_falls_back_to_first_populated_section() {
        let mut doc = AdventureState::default();
        doc.set_section("concept", json!("c"));
        let mut scene = SceneState::new("Quiet Scene");
        scene.status = SceneStatus::Confirmed;
        scene.set_section("mood", json!("An unsettling hush over everything."));
        doc.scenes.push(scene);

        let context = serialize(&doc, Stage::Review, &SerializeOptions::default());
        assert!(context.text.contains("Quiet Scene: An unsettling hush"));
    }
}
