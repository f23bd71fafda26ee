//! Clip content carried in a `ClipData` payload

use serde::{Deserialize, Serialize};

/// Clipboard record exchanged between peers, encoded as a JSON object.
///
/// `host` is required so that arbitrary bytes which happen to parse as an
/// empty JSON object are still rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipContent {
    pub host: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub html: String,
}

impl ClipContent {
    pub fn new(host: impl Into<String>, text: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            text: text.into(),
            html: html.into(),
        }
    }

    /// True when there is nothing to put on a clipboard
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.html.is_empty()
    }

    /// Serialize for the wire (before encryption)
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize from a received (and decrypted) payload
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_roundtrip() {
        let content = ClipContent::new("desk", "hello", "<b>hello</b>");
        let bytes = content.to_bytes().unwrap();
        assert_eq!(ClipContent::from_bytes(&bytes).unwrap(), content);
    }

    #[test]
    fn test_missing_optional_fields() {
        let content = ClipContent::from_bytes(br#"{"host":"laptop","text":"x"}"#).unwrap();
        assert_eq!(content.text, "x");
        assert!(content.html.is_empty());
    }

    #[test]
    fn test_missing_host_rejected() {
        assert!(ClipContent::from_bytes(br#"{"text":"x","html":""}"#).is_err());
        assert!(ClipContent::from_bytes(b"{}").is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(ClipContent::from_bytes(&[0xc1, 0x88, 0xb5, 0xa3, 0x40]).is_err());
        assert!(ClipContent::from_bytes(b"").is_err());
    }

    #[test]
    fn test_is_empty() {
        assert!(ClipContent::new("h", "", "").is_empty());
        assert!(!ClipContent::new("h", "", "<p></p>").is_empty());
    }
}
