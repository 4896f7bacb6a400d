// Helper functions for safe logging and serialization

use serde::{Deserialize, Deserializer};
use tracing::warn;

/// Masks an email before it reaches the logs: `"user@example.com"` becomes
/// `"u***@example.com"`
pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
            let first: String = local.chars().take(1).collect();
            format!("{}***@{}", first, domain)
        }
        _ => "***@***".to_string(),
    }
}

/// Keeps the first and last four characters of a session id or OAuth state
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() > 12 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        "***".to_string()
    }
}

/// Deserializer for tri-state patch fields.
///
/// Used together with `#[serde(default)]`: a field that is absent stays
/// `None`, an explicit `null` becomes `Some(None)`, and a value becomes
/// `Some(Some(value))`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Trims tags, drops blank ones and removes duplicates, keeping the first
/// occurrence of each tag
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

/// Decodes a JSON-array TEXT column; a malformed value is logged and reads
/// as no tags
pub fn tags_from_column(raw: Option<&str>) -> Vec<String> {
    let Some(json) = raw else {
        return Vec::new();
    };
    match serde_json::from_str::<Vec<String>>(json) {
        Ok(tags) => tags,
        Err(e) => {
            warn!(error = %e, len = json.len(), "Malformed tag column, reading as no tags");
            Vec::new()
        }
    }
}

pub fn tags_to_column(tags: &[String]) -> String {
    serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string())
}
