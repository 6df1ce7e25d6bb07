//! Activity taxonomy model.
//!
//! # Invariants
//! - `parent_id = None` marks a root of the taxonomy forest.
//! - The hierarchy is navigated by parent identifier lookups, never by
//!   in-memory back references.

use serde::{Deserialize, Serialize};

/// Store-assigned activity identifier.
pub type ActivityId = i64;

/// One node of the business activity taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    pub name: String,
    /// Direct parent; `None` for root activities.
    pub parent_id: Option<ActivityId>,
}

impl Activity {
    /// Creates a root-level activity.
    pub fn root(id: ActivityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            parent_id: None,
        }
    }

    /// Creates an activity nested under `parent_id`.
    pub fn child_of(parent_id: ActivityId, id: ActivityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            parent_id: Some(parent_id),
        }
    }
}
