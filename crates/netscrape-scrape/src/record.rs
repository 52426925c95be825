use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One starred repository as returned by the stars listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarredRepo {
    /// Stable, globally unique repository id.
    pub node_id: String,
    pub name: String,
    /// Login of the owning user.
    pub owner: String,
    /// Login of the owning organization, if any.
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub url: String,
    pub starred_at: DateTime<Utc>,
}

impl StarredRepo {
    /// The organization when present, the owning user otherwise.
    pub fn owner_login(&self) -> &str {
        self.organization.as_deref().unwrap_or(&self.owner)
    }
}
