use serde::{Deserialize, Deserializer};
use serde_json::value::RawValue;

use crate::error::{ResolveError, Result};

/// Raw submission as written to the spool: `{"format": "json", "content": ...}`.
#[derive(Deserialize)]
struct PostEnvelope<'a> {
    #[serde(default)]
    format: Option<String>,
    /// `None` only when the key is absent; an explicit `null` is kept.
    #[serde(borrow, default, deserialize_with = "present")]
    content: Option<&'a RawValue>,
}

fn present<'a, 'de: 'a, D>(deserializer: D) -> std::result::Result<Option<&'a RawValue>, D::Error>
where
    D: Deserializer<'de>,
{
    <&'a RawValue>::deserialize(deserializer).map(Some)
}

/// Returns the exact JSON text of the envelope's `content`.
pub fn unwrap_post(raw: &[u8]) -> Result<Vec<u8>> {
    let post: PostEnvelope<'_> = serde_json::from_slice(raw)
        .map_err(|err| ResolveError::SourceUnavailable(format!("invalid post envelope: {err}")))?;
    match post.format.as_deref() {
        Some("json") => {}
        other => {
            return Err(ResolveError::SourceUnavailable(format!(
                "unexpected post format {other:?}"
            )))
        }
    }
    Ok(post
        .content
        .map(|content| content.get().as_bytes().to_vec())
        .unwrap_or_else(|| b"{}".to_vec()))
}
