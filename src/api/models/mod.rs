//! Request and response bodies exchanged with the backend.
//!
//! Responses are decoded into explicit types; loosely typed fields (ids that
//! arrive as either numbers or strings) are normalized on the way in.

pub mod auth;
pub mod blog;
pub mod forms;
pub mod payment;

pub use auth::*;
pub use blog::*;
pub use forms::*;
pub use payment::*;

use serde::{Deserialize, Deserializer};

/// Accept `"42"`, `42` or `null` for an identifier.
pub(crate) fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(s)) if !s.is_empty() => Some(s),
        Some(Raw::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
