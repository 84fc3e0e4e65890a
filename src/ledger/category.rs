use serde::{Deserialize, Serialize};

/// A spending category. The name is the primary key; transactions and
/// subscriptions reference it as a soft foreign key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub description: String,
}

impl Category {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Category {
        Category {
            name: name.into(),
            description: description.into(),
        }
    }
}
