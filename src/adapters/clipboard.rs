use arboard::Clipboard as SystemClipboard;
use parking_lot::Mutex;
use tracing::debug;

use crate::domain::DomainError;
use crate::ports::Clipboard;

/// System clipboard backed by arboard.
pub struct ArboardClipboard {
    clipboard: Mutex<SystemClipboard>,
}

impl ArboardClipboard {
    pub fn new() -> Result<Self, DomainError> {
        let clipboard = SystemClipboard::new()
            .map_err(|e| DomainError::Clipboard(format!("Failed to initialize clipboard: {}", e)))?;

        Ok(Self {
            clipboard: Mutex::new(clipboard),
        })
    }
}

impl Clipboard for ArboardClipboard {
    fn copy_text(&self, text: &str) -> Result<(), DomainError> {
        self.clipboard
            .lock()
            .set_text(text)
            .map_err(|e| DomainError::Clipboard(format!("Failed to set clipboard text: {}", e)))?;
        debug!(len = text.len(), "Text copied to clipboard");
        Ok(())
    }
}
