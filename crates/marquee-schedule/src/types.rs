//! Schedule document data model.
//!
//! Field names mirror the JSON emitted by the content service (camelCase,
//! window fields flattened onto the schedule and each item). Every field is
//! optional on the wire; structural validation only demands a non-empty
//! `items` array of objects.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ScheduleError;
use crate::window::Window;

/// The root schedule for a display.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Schedule {
    /// Human-readable schedule name.
    pub name: Option<String>,
    /// Primary window gating the whole schedule.
    #[serde(flatten)]
    pub window: Window,
    /// Rotation entries, in declaration order. Declaration order is
    /// rotation order and tie-break order.
    pub items: Vec<ScheduleItem>,
}

/// One playable unit in the rotation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleItem {
    pub name: String,
    /// Opaque reference handed to the rendering surface, unmodified.
    pub object_reference: String,
    /// Dwell time in seconds. Zero or absent makes the item non-playable.
    pub duration: f64,
    /// Hold the screen until the rendering surface signals completion.
    pub play_until_done: bool,
    #[serde(flatten)]
    pub window: Window,
}

impl ScheduleItem {
    /// Rotation identity: two entries are the same item when both the name
    /// and the reference match.
    pub fn same_item(&self, other: &ScheduleItem) -> bool {
        self.name == other.name && self.object_reference == other.object_reference
    }

    /// Whether the item can occupy a rotation slot at all.
    pub(crate) fn has_dwell(&self) -> bool {
        self.duration > 0.0 || self.play_until_done
    }
}

/// Locate the schedule node inside a fetched document. The content service
/// wraps it as `{"content": {"schedule": {...}}}`; a bare schedule object
/// is accepted too.
fn schedule_node(doc: &Value) -> &Value {
    doc.pointer("/content/schedule").unwrap_or(doc)
}

/// Structural check: the schedule node must be an object carrying a
/// non-empty `items` array whose entries are all objects.
pub fn validate(doc: &Value) -> bool {
    structural(schedule_node(doc)).is_ok()
}

fn structural(node: &Value) -> Result<(), ScheduleError> {
    let Some(obj) = node.as_object() else {
        return Err(ScheduleError::InvalidDocument(
            "schedule is not an object".to_string(),
        ));
    };
    let Some(items) = obj.get("items").and_then(Value::as_array) else {
        return Err(ScheduleError::InvalidDocument(
            "missing items".to_string(),
        ));
    };
    if items.is_empty() {
        return Err(ScheduleError::InvalidDocument("empty items".to_string()));
    }
    if items.iter().any(|item| !item.is_object()) {
        return Err(ScheduleError::InvalidDocument(
            "non-object item".to_string(),
        ));
    }
    Ok(())
}

impl Schedule {
    /// Parse a schedule out of an already-fetched document.
    pub fn from_document(doc: &Value) -> Result<Self, ScheduleError> {
        let node = schedule_node(doc);
        structural(node)?;
        serde_json::from_value(node.clone())
            .map_err(|e| ScheduleError::InvalidDocument(e.to_string()))
    }
}
