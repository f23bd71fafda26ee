//! Desktop side of the session: the real clipboard plus terminal cues.

use std::io::Write;
use std::time::SystemTime;

use clipnet_core::clipboard::ClipboardManager;
use clipnet_core::{ClipContent, Collaborator, Settings};

use crate::ui::{format_preview, format_time};

pub struct DesktopClipboard {
    manager: ClipboardManager,
    host: String,
    audio_cue: bool,
    visual_cue: bool,
    last_error: Option<String>,
}

impl DesktopClipboard {
    pub fn new(settings: &Settings) -> Self {
        Self {
            manager: ClipboardManager::new(),
            host: settings.display_name(),
            audio_cue: settings.audio_cue,
            visual_cue: settings.visual_cue,
            last_error: None,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Poll the clipboard: one entry per own write since the last poll, then
    /// the user's copy if the content changed.
    pub fn poll_local(&mut self) -> Vec<ClipContent> {
        match self.manager.check_change() {
            Ok(changes) => {
                self.last_error = None;
                changes
                    .into_iter()
                    .map(|change| change.into_content(&self.host))
                    .collect()
            }
            Err(e) => {
                let message = e.to_string();
                // Headless sessions fail on every poll; say it once.
                if self.last_error.as_deref() != Some(message.as_str()) {
                    tracing::warn!("clipboard read error: {}", message);
                    self.last_error = Some(message);
                }
                Vec::new()
            }
        }
    }
}

impl Collaborator for DesktopClipboard {
    fn write_clipboard(&mut self, text: &str, html: &str) {
        if let Err(e) = self.manager.write(text, html) {
            tracing::warn!("clipboard write failed: {}", e);
        }
        self.manager.expect_echo();
    }

    fn clear_clipboard(&mut self) {
        match self.manager.clear() {
            Ok(()) => println!("\x1b[2m{} :: Clipboard cleared\x1b[0m", format_time(SystemTime::now())),
            Err(e) => tracing::warn!("clipboard clear failed: {}", e),
        }
    }

    fn notify_audio_cue(&mut self) {
        if self.audio_cue {
            print!("\x07");
            let _ = std::io::stdout().flush();
        }
    }

    fn notify_visual_cue(&mut self, display_text: &str) {
        if self.visual_cue && !display_text.is_empty() {
            println!("\x1b[1;34m📋\x1b[0m \"{}\"", format_preview(display_text));
        }
    }

    fn log(&mut self, timestamp: SystemTime, message: &str) {
        println!("{} :: {}", format_time(timestamp), message);
    }
}
