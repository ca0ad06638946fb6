// Lane Domain Model

use serde::{Deserialize, Serialize};

/// Lane identifier
pub type LaneId = i64;

/// One physical dispatch line with its own independent FIFO ordering.
/// Created once at startup from config; immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lane {
    pub id: LaneId,
    pub title: String,
}

impl Lane {
    pub fn new(id: LaneId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
        }
    }
}
