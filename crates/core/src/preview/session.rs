use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A live preview session. Overrides are keyed by
/// `"<universe>:<absolute channel>"` with 1-based channel numbers and are
/// mirrored into the DMX engine while the session is active.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewSession {
    pub id: String,
    pub project_id: String,
    pub user_id: Option<String>,
    pub active: bool,
    /// Refreshed on every channel update; the idle timeout measures from
    /// this instant.
    pub created_at: DateTime<Utc>,
    pub overrides: HashMap<String, u8>,
}

/// Per-universe view of what the session's output looks like right now:
/// the engine's current output with the session's overrides applied.
/// `channels` always holds exactly [`crate::dmx::UNIVERSE_SIZE`] values.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UniverseSnapshot {
    pub universe: u16,
    pub channels: Vec<u8>,
}

pub fn override_key(universe: u16, channel: u16) -> String {
    format!("{}:{}", universe, channel)
}

pub fn parse_override_key(key: &str) -> Option<(u16, u16)> {
    let (universe, channel) = key.split_once(':')?;
    Some((universe.parse().ok()?, channel.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_key_roundtrip() {
        let key = override_key(1, 512);
        assert_eq!(key, "1:512");
        assert_eq!(parse_override_key(&key), Some((1, 512)));
    }

    #[test]
    fn test_parse_rejects_malformed_keys() {
        assert_eq!(parse_override_key("1"), None);
        assert_eq!(parse_override_key("a:b"), None);
        assert_eq!(parse_override_key(""), None);
    }
}
