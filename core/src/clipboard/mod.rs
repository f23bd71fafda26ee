//! Local clipboard access and change detection

use arboard::Clipboard as ArboardClipboard;
use sha2::{Digest, Sha256};

use crate::protocol::ClipContent;
use crate::{Error, Result};

/// What the local clipboard currently holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardSnapshot {
    pub text: String,
    pub html: String,
}

impl ClipboardSnapshot {
    /// Compute hash of content for change detection
    pub fn hash(&self) -> ContentHash {
        let mut hasher = Sha256::new();
        hasher.update(b"text:");
        hasher.update(self.text.as_bytes());
        hasher.update(b"html:");
        hasher.update(self.html.as_bytes());
        ContentHash(hasher.finalize().into())
    }

    /// Stamp with the sending host to get a wire record
    pub fn into_content(self, host: &str) -> ClipContent {
        ClipContent::new(host, self.text, self.html)
    }
}

/// SHA256 hash of clipboard content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash(pub [u8; 32]);

/// One notification produced by polling the clipboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardChange {
    /// A write we made ourselves showing up
    Echo,
    /// Something copied on this machine
    Local(ClipboardSnapshot),
}

impl ClipboardChange {
    /// Wire record for the session; an echo carries no content.
    pub fn into_content(self, host: &str) -> ClipContent {
        match self {
            ClipboardChange::Echo => ClipContent::new(host, "", ""),
            ClipboardChange::Local(snapshot) => snapshot.into_content(host),
        }
    }
}

/// Clipboard manager for reading, writing, and polling for changes
pub struct ClipboardManager {
    /// Last known content hash (for change detection)
    last_hash: Option<ContentHash>,
    /// Own writes not yet reported by a poll
    pending_echoes: u32,
}

impl ClipboardManager {
    pub fn new() -> Self {
        Self {
            last_hash: None,
            pending_echoes: 0,
        }
    }

    /// Read current clipboard content; `None` when it holds neither text nor html
    pub fn read(&self) -> Result<Option<ClipboardSnapshot>> {
        let mut clipboard = ArboardClipboard::new()
            .map_err(|e| Error::Clipboard(e.to_string()))?;

        let text = or_empty(clipboard.get_text())?;
        let html = or_empty(clipboard.get().html())?;

        if text.is_empty() && html.is_empty() {
            Ok(None)
        } else {
            Ok(Some(ClipboardSnapshot { text, html }))
        }
    }

    /// Write a received clip; html is offered with the text as fallback
    pub fn write(&self, text: &str, html: &str) -> Result<()> {
        let mut clipboard = ArboardClipboard::new()
            .map_err(|e| Error::Clipboard(e.to_string()))?;

        let result = if html.is_empty() {
            clipboard.set_text(text)
        } else {
            let alt = (!text.is_empty()).then_some(text);
            clipboard.set_html(html, alt)
        };
        result.map_err(|e| Error::Clipboard(e.to_string()))
    }

    pub fn clear(&self) -> Result<()> {
        let mut clipboard = ArboardClipboard::new()
            .map_err(|e| Error::Clipboard(e.to_string()))?;
        clipboard.clear().map_err(|e| Error::Clipboard(e.to_string()))
    }

    /// Poll the clipboard once.
    ///
    /// Pending echoes are still reported when the read fails.
    pub fn check_change(&mut self) -> Result<Vec<ClipboardChange>> {
        match self.read() {
            Ok(snapshot) => Ok(self.observe(snapshot)),
            Err(e) if self.pending_echoes > 0 => {
                tracing::debug!("clipboard read failed after own write: {}", e);
                Ok(self.observe(None))
            }
            Err(e) => Err(e),
        }
    }

    /// Turn one poll result into change notifications.
    ///
    /// Writes recorded with [`expect_echo`](Self::expect_echo) since the last
    /// poll come out first, one [`ClipboardChange::Echo`] each, whatever the
    /// clipboard now reads back as. Only a poll with no pending echoes can
    /// report a local copy.
    pub fn observe(&mut self, snapshot: Option<ClipboardSnapshot>) -> Vec<ClipboardChange> {
        let hash = snapshot.as_ref().map(ClipboardSnapshot::hash);
        let echoes = std::mem::take(&mut self.pending_echoes);

        if echoes > 0 {
            self.last_hash = hash;
            return vec![ClipboardChange::Echo; echoes as usize];
        }

        match snapshot {
            Some(s) if self.last_hash != hash => {
                self.last_hash = hash;
                vec![ClipboardChange::Local(s)]
            }
            Some(_) => Vec::new(),
            None => {
                self.last_hash = None;
                Vec::new()
            }
        }
    }

    /// Record a write of our own; the next poll reports it as an echo.
    pub fn expect_echo(&mut self) {
        self.pending_echoes = self.pending_echoes.saturating_add(1);
    }

    pub fn pending_echoes(&self) -> u32 {
        self.pending_echoes
    }
}

fn or_empty(result: std::result::Result<String, arboard::Error>) -> Result<String> {
    match result {
        Ok(value) => Ok(value),
        Err(arboard::Error::ContentNotAvailable) => Ok(String::new()),
        Err(e) => Err(Error::Clipboard(e.to_string())),
    }
}

impl Default for ClipboardManager {
    fn default() -> Self {
        Self::new()
    }
}
