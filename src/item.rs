// Item model for the todo list

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single todo list entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Opaque identifier, stable for the item's lifetime
    pub id: String,
    /// Trimmed, non-empty display text
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

impl Item {
    /// Create an active item with a freshly generated id.
    ///
    /// Returns `None` when `text` is blank after trimming.
    pub fn new(text: &str) -> Option<Self> {
        let text = normalize_text(text)?;
        Some(Self {
            id: new_id(),
            text,
            completed: false,
        })
    }
}

/// Trim `text`, rejecting values that end up empty
pub fn normalize_text(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Generate a time-ordered, collision-resistant item id
pub fn new_id() -> String {
    Uuid::now_v7().to_string()
}
