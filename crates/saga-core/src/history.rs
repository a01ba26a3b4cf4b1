//! Bounded per-section undo history.
//!
//! One stack exists per distinct section-path string, created lazily on the
//! first push. Stacks are append-only and bounded: once a stack holds
//! [`MAX_VERSIONS_PER_SECTION`] entries, the oldest entry is dropped to make
//! room (FIFO eviction, never rejection).

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::document::AdventureState;

/// Upper bound on entries retained per section path.
pub const MAX_VERSIONS_PER_SECTION: usize = 10;

/// Address of a versioned document field.
///
/// Parsed from `"scene:<arcId>:<section>"` or a bare top-level key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionPath {
    TopLevel { key: String },
    Scene { arc_id: String, section: String },
}

impl SectionPath {
    /// Splits a path string into its addressing mode.
    ///
    /// A `"scene:"` prefix yields exactly three parts (the tag, the arc id,
    /// and the section); everything else is a bare top-level key. Malformed
    /// scene paths are not validated here; the caller decides what an
    /// empty arc id or section means.
    pub fn parse(path: &str) -> Self {
        if let Some(rest) = path.strip_prefix("scene:") {
            let (arc_id, section) = match rest.split_once(':') {
                Some((arc_id, section)) => (arc_id.to_string(), section.to_string()),
                None => (rest.to_string(), String::new()),
            };
            return SectionPath::Scene { arc_id, section };
        }
        SectionPath::TopLevel {
            key: path.to_string(),
        }
    }
}

impl fmt::Display for SectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionPath::TopLevel { key } => write!(f, "{key}"),
            SectionPath::Scene { arc_id, section } => write!(f, "scene:{arc_id}:{section}"),
        }
    }
}

/// One captured prior value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionEntry {
    pub timestamp: DateTime<Utc>,
    /// Deep copy of the value that was about to be overwritten.
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Result of popping the most recent entry for a path.
#[derive(Debug, Clone, PartialEq)]
pub struct PopOutcome {
    pub success: bool,
    pub restored_value: Option<Value>,
    pub error: Option<String>,
    pub remaining_entries: usize,
}

/// Result of an undo: a pop composed with a path-directed write-back.
#[derive(Debug, Clone, PartialEq)]
pub struct UndoOutcome {
    pub success: bool,
    /// Whether the popped value was actually written back into the
    /// document. False when the addressed scene no longer exists; the
    /// entry is still consumed.
    pub restored: bool,
    pub restored_value: Option<Value>,
    pub error: Option<String>,
    pub remaining_entries: usize,
}

/// Bounded undo stacks keyed by section-path string.
#[derive(Debug, Clone, Default)]
pub struct VersionHistoryStore {
    stacks: HashMap<String, Vec<VersionEntry>>,
}

impl VersionHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures the value that is about to be overwritten.
    ///
    /// Must be called before the live value is mutated. The value is
    /// deep-copied, so later mutation of the caller's reference cannot
    /// corrupt history.
    pub fn push_version(
        &mut self,
        section_path: &str,
        previous_value: &Value,
        description: Option<String>,
    ) {
        let stack = self.stacks.entry(section_path.to_string()).or_default();
        stack.push(VersionEntry {
            timestamp: Utc::now(),
            value: previous_value.clone(),
            description,
        });
        while stack.len() > MAX_VERSIONS_PER_SECTION {
            stack.remove(0);
        }
    }

    /// Removes and returns the most recently pushed entry for a path.
    ///
    /// An absent or empty stack yields `success: false` with no mutation.
    pub fn pop_version(&mut self, section_path: &str) -> PopOutcome {
        let Some(entry) = self.stacks.get_mut(section_path).and_then(Vec::pop) else {
            return PopOutcome {
                success: false,
                restored_value: None,
                error: Some(format!("No version history for section: {section_path}")),
                remaining_entries: 0,
            };
        };
        PopOutcome {
            success: true,
            restored_value: Some(entry.value),
            error: None,
            remaining_entries: self.version_count(section_path),
        }
    }

    /// Pops the latest entry and writes it back to the addressed field.
    ///
    /// For a scene path whose scene has been deleted in the meantime, the
    /// entry is consumed but nothing is written back; the outcome reports
    /// `restored: false`.
    pub fn apply_undo(&mut self, document: &mut AdventureState, section_path: &str) -> UndoOutcome {
        let popped = self.pop_version(section_path);
        if !popped.success {
            return UndoOutcome {
                success: false,
                restored: false,
                restored_value: None,
                error: popped.error,
                remaining_entries: popped.remaining_entries,
            };
        }
        let value = popped
            .restored_value
            .clone()
            .unwrap_or(Value::Null);

        let restored = match SectionPath::parse(section_path) {
            SectionPath::TopLevel { key } => {
                document.set_section(key, value);
                true
            }
            SectionPath::Scene { arc_id, section } => match document.scene_mut(&arc_id) {
                Some(scene) => {
                    scene.set_section(section, value);
                    true
                }
                None => {
                    warn!(%arc_id, %section, "undo target scene no longer exists; entry consumed");
                    false
                }
            },
        };

        UndoOutcome {
            success: true,
            restored,
            restored_value: popped.restored_value,
            error: None,
            remaining_entries: popped.remaining_entries,
        }
    }

    /// Entries for a path, oldest first. Unknown paths yield an empty slice.
    pub fn history(&self, section_path: &str) -> &[VersionEntry] {
        self.stacks
            .get(section_path)
            .map_or(&[], Vec::as_slice)
    }

    pub fn version_count(&self, section_path: &str) -> usize {
        self.stacks.get(section_path).map_or(0, Vec::len)
    }
}
