use serde::{Deserialize, Serialize};

/// Author of a poll, as embedded in the full poll payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creator {
    pub id: i64,
    pub username: String,
}
