//! Adventure document model.
//!
//! The document is a JSON-serializable tree: flat top-level sections
//! (premise fields, the outline list, any other authoring fields) plus an
//! ordered list of per-scene sub-documents. The turn-processing core treats
//! section values opaquely; only the context serializer interprets the
//! well-known keys below.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Top-level keys that make up the adventure premise (Tier 1 context).
pub const PREMISE_KEYS: [&str; 3] = ["concept", "setting", "tone"];

/// Top-level key holding the outline list (one entry per story beat).
pub const BEATS_KEY: &str = "beats";

/// Scene section consulted first when building a compressed scene brief.
pub const SUMMARY_SECTION: &str = "summary";

/// Authoring phase of the document.
///
/// Stages advance monotonically; the context serializer gates its tiers on
/// the stage it is given, not on the one stored in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Establishing concept, setting, and tone.
    #[default]
    Premise,
    /// Drafting the top-level beat outline.
    Outline,
    /// Detailed per-scene editing.
    Scenes,
    /// Final read-through and confirmation.
    Review,
}

impl Stage {
    /// Stages whose context includes the compressed outline (Tier 3).
    pub fn includes_outline_context(self) -> bool {
        matches!(self, Stage::Outline | Stage::Scenes | Stage::Review)
    }

    /// Whether this is the detailed scene-editing stage (Tier 2 gate).
    pub fn is_scene_editing(self) -> bool {
        matches!(self, Stage::Scenes)
    }

    /// Parses a stage name as it appears in tool inputs.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "premise" => Some(Stage::Premise),
            "outline" => Some(Stage::Outline),
            "scenes" => Some(Stage::Scenes),
            "review" => Some(Stage::Review),
            _ => None,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Stage::Premise => "premise",
            Stage::Outline => "outline",
            Stage::Scenes => "scenes",
            Stage::Review => "review",
        }
    }

    /// All stages in authoring order.
    pub fn all() -> &'static [Stage] {
        &[Stage::Premise, Stage::Outline, Stage::Scenes, Stage::Review]
    }
}

/// Confirmation status of a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SceneStatus {
    #[default]
    Draft,
    Confirmed,
}

impl SceneStatus {
    /// Parses a status name as it appears in tool inputs.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "draft" => Some(SceneStatus::Draft),
            "confirmed" => Some(SceneStatus::Confirmed),
            _ => None,
        }
    }
}

/// One scene (arc) of the adventure with its named sub-sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneState {
    /// Stable identifier used in section paths (`scene:<id>:<section>`).
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub status: SceneStatus,
    #[serde(default)]
    pub sections: Map<String, Value>,
}

impl SceneState {
    /// Creates a draft scene with a generated identifier.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            status: SceneStatus::Draft,
            sections: Map::new(),
        }
    }

    pub fn section(&self, name: &str) -> Option<&Value> {
        self.sections.get(name)
    }

    pub fn set_section(&mut self, name: impl Into<String>, value: Value) {
        self.sections.insert(name.into(), value);
    }

    /// Sub-sections with a non-empty value, in insertion order.
    pub fn populated_sections(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.sections.iter().filter(|(_, v)| !value_is_empty(v))
    }
}

/// The adventure document mutated by tool handlers and rendered into model
/// context. Owned by the persistence collaborator; the core receives it as
/// an explicit argument per operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdventureState {
    pub stage: Stage,
    pub sections: Map<String, Value>,
    pub scenes: Vec<SceneState>,
}

impl AdventureState {
    pub fn section(&self, key: &str) -> Option<&Value> {
        self.sections.get(key)
    }

    /// Top-level section as text, when it holds a string.
    pub fn section_text(&self, key: &str) -> Option<&str> {
        self.sections.get(key).and_then(Value::as_str)
    }

    pub fn set_section(&mut self, key: impl Into<String>, value: Value) {
        self.sections.insert(key.into(), value);
    }

    pub fn scene(&self, arc_id: &str) -> Option<&SceneState> {
        self.scenes.iter().find(|s| s.id == arc_id)
    }

    pub fn scene_mut(&mut self, arc_id: &str) -> Option<&mut SceneState> {
        self.scenes.iter_mut().find(|s| s.id == arc_id)
    }
}

/// Treats null, empty strings, empty arrays, and empty objects as absent
/// for rendering purposes.
pub fn value_is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_stage_tier_gates() {
        assert!(!Stage::Premise.includes_outline_context());
        assert!(Stage::Outline.includes_outline_context());
        assert!(Stage::Scenes.includes_outline_context());
        assert!(Stage::Review.includes_outline_context());

        assert!(Stage::Scenes.is_scene_editing());
        assert!(!Stage::Outline.is_scene_editing());
    }

    #[test]
    fn test_stage_roundtrips_through_serde() {
        for stage in Stage::all() {
            let encoded = serde_json::to_string(stage).unwrap();
            let decoded: Stage = serde_json::from_str(&encoded).unwrap();
            assert_eq!(*stage, decoded);
            assert_eq!(Stage::from_name(stage.display_name()), Some(*stage));
        }
    }

    #[test]
    fn test_document_deserializes_with_defaults() {
        let doc: AdventureState = serde_json::from_str("{}").unwrap();
        assert_eq!(doc.stage, Stage::Premise);
        assert!(doc.sections.is_empty());
        assert!(doc.scenes.is_empty());
    }

    #[test]
    fn test_scene_lookup_by_arc_id() {
        let mut doc = AdventureState::default();
        let scene = SceneState::new("The Drowned Abbey");
        let arc_id = scene.id.clone();
        doc.scenes.push(scene);

        assert!(doc.scene(&arc_id).is_some());
        assert!(doc.scene("missing").is_none());

        doc.scene_mut(&arc_id)
            .unwrap()
            .set_section("summary", json!("Monks guard a flooded crypt."));
        assert_eq!(
            doc.scene(&arc_id).unwrap().section("summary"),
            Some(&json!("Monks guard a flooded crypt."))
        );
    }

    #[test]
    fn test_populated_sections_skips_empty_values() {
        let mut scene = SceneState::new("Gatehouse");
        scene.set_section("summary", json!("A toll is demanded."));
        scene.set_section("notes", json!(""));
        scene.set_section("threats", json!([]));
        scene.set_section("reward", Value::Null);

        let populated: Vec<_> = scene
            .populated_sections()
            .map(|(name, _)| name.as_str())
            .collect();
        assert_eq!(populated, vec!["summary"]);
    }
}
