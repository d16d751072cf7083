use serde::{Deserialize, Serialize};

/// A per-category tally owned by one log event.
///
/// Details have no lifecycle of their own: they are inserted and removed
/// together with their owning event row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, sqlx::FromRow, Serialize, Deserialize)]
pub struct LogDetail {
    #[serde(default)]
    id: i32,
    /// Stringified event-type id of the owning event.
    pub entity_type: String,
    /// Category label, e.g. `"species"` or `"records"`.
    pub record_type: String,
    pub record_count: i64,
}

impl LogDetail {
    pub fn new(entity_type: &str, record_type: &str, record_count: i64) -> Self {
        Self {
            id: 0,
            entity_type: entity_type.to_string(),
            record_type: record_type.to_string(),
            record_count,
        }
    }

    /// Storage-assigned identifier; 0 until the detail has been persisted.
    pub fn id(&self) -> i32 {
        self.id
    }

    pub(crate) fn assign_id(&mut self, id: i32) {
        self.id = id;
    }
}
