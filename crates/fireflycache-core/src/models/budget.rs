use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Budget {
    pub id: i64,
    pub name: String,
    #[cfg_attr(feature = "ts", ts(type = "string"))]
    pub updated_at: DateTime<Utc>,
}

impl Budget {
    pub fn new(id: i64, name: impl Into<String>, updated_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            updated_at,
        }
    }
}
