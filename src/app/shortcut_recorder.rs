use std::collections::BTreeSet;

use tracing::debug;

use crate::domain::{format_key, Modifier, Settings, ShortcutError, ShortcutSlot, ShortcutSpec};

/// Physical key code that cancels a capture.
pub const ESCAPE: &str = "Escape";

/// Outcome of feeding one key event to the recorder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureStep {
    /// No capture running, or the event carried nothing to record.
    Ignored,
    /// The key was recorded; the capture continues.
    Listening,
    /// Escape ended the capture without touching the slot.
    Cancelled { slot: ShortcutSlot },
    /// A valid shortcut was captured for the slot.
    Completed {
        slot: ShortcutSlot,
        shortcut: ShortcutSpec,
    },
    /// The capture ended without a usable shortcut.
    Rejected {
        slot: ShortcutSlot,
        error: ShortcutError,
    },
}

/// State of one capture, from `start` until release or Escape.
#[derive(Debug)]
struct CaptureSession {
    slot: ShortcutSlot,
    modifiers: BTreeSet<Modifier>,
    base_key: Option<String>,
}

impl CaptureSession {
    fn new(slot: ShortcutSlot) -> Self {
        Self {
            slot,
            modifiers: BTreeSet::new(),
            base_key: None,
        }
    }

    fn is_empty(&self) -> bool {
        self.modifiers.is_empty() && self.base_key.is_none()
    }

    fn finish(self) -> CaptureStep {
        let slot = self.slot;
        let key = self.base_key.unwrap_or_default();
        match ShortcutSpec::new(self.modifiers, key) {
            Ok(shortcut) => CaptureStep::Completed { slot, shortcut },
            Err(error) => CaptureStep::Rejected { slot, error },
        }
    }
}

/// Turns raw key-down/key-up events into a [`ShortcutSpec`].
///
/// At most one slot listens at a time. The recorder only produces steps; the
/// caller decides what to do with a completed shortcut.
#[derive(Debug, Default)]
pub struct ShortcutRecorder {
    session: Option<CaptureSession>,
}

impl ShortcutRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start listening for `slot`, replacing any running capture.
    ///
    /// Does nothing and returns `false` if the slot is disabled.
    pub fn start(&mut self, slot: ShortcutSlot, settings: &Settings) -> bool {
        if !settings.is_slot_enabled(slot) {
            debug!(slot = %slot, "Ignoring capture request for disabled slot");
            return false;
        }
        if let Some(previous) = self.session.replace(CaptureSession::new(slot)) {
            debug!(previous = %previous.slot, "Replaced running shortcut capture");
        }
        debug!(slot = %slot, "Shortcut capture started");
        true
    }

    /// Slot currently listening, if any.
    pub fn active_slot(&self) -> Option<ShortcutSlot> {
        self.session.as_ref().map(|s| s.slot)
    }

    /// Drop the running capture. Returns the slot that was listening.
    pub fn cancel(&mut self) -> Option<ShortcutSlot> {
        let slot = self.session.take().map(|s| s.slot);
        if let Some(slot) = slot {
            debug!(slot = %slot, "Shortcut capture cancelled");
        }
        slot
    }

    /// Handle a key press, identified by its physical key code.
    pub fn key_down(&mut self, code: &str) -> CaptureStep {
        if code == ESCAPE {
            return self.cancelled();
        }
        let Some(session) = self.session.as_mut() else {
            return CaptureStep::Ignored;
        };

        match Modifier::from_code(code) {
            Some(modifier) => {
                session.modifiers.insert(modifier);
            }
            // Only the last non-modifier key before release counts.
            None => session.base_key = Some(format_key(code)),
        }
        CaptureStep::Listening
    }

    /// Handle a key release. Any release with something recorded ends the capture.
    pub fn key_up(&mut self, code: &str) -> CaptureStep {
        if code == ESCAPE {
            return self.cancelled();
        }
        match self.session.take() {
            None => CaptureStep::Ignored,
            Some(session) if session.is_empty() => {
                self.session = Some(session);
                CaptureStep::Ignored
            }
            Some(session) => {
                let step = session.finish();
                debug!(step = ?step, "Shortcut capture finished");
                step
            }
        }
    }

    fn cancelled(&mut self) -> CaptureStep {
        match self.cancel() {
            Some(slot) => CaptureStep::Cancelled { slot },
            None => CaptureStep::Ignored,
        }
    }
}
