use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    /// Numeric id on GitHub, the tag name on GitLab.
    pub id: String,
    pub name: String,
    pub tag_name: String,
    pub body: String,
    pub draft: bool,
    pub prerelease: bool,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NewRelease {
    pub tag_name: String,
    pub name: String,
    pub body: String,
    /// Branch or commit the tag is created from when it does not exist yet.
    pub target: Option<String>,
    pub draft: bool,
    pub prerelease: bool,
}
