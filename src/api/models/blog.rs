//! Blog post models.

use serde::{Deserialize, Serialize};

use super::lenient_id;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BlogPost {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    /// Rich-text HTML as saved by the editor.
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Body for creating or updating a post.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlogDraft {
    pub title: String,
    pub content: String,
}
