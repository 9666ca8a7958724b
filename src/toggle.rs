//! Toggle controller: maps target presence onto the two sound slots

use crate::sink::LogSink;
use crate::sounds::{SoundSlot, SoundStore};
use std::fmt;
use tracing::debug;

/// Sound files written when the chimes are restored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundPaths {
    pub inserted: String,
    pub removed: String,
}

/// The two absolute states the controller can apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleAction {
    /// Both slots empty
    Silence,
    /// Both slots set to the configured sound files
    Restore,
}

impl ToggleAction {
    /// Target attached means the generic chimes are silenced
    pub fn for_presence(is_present: bool) -> Self {
        if is_present {
            Self::Silence
        } else {
            Self::Restore
        }
    }
}

impl fmt::Display for ToggleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Silence => f.write_str("disabled"),
            Self::Restore => f.write_str("enabled"),
        }
    }
}

/// Applies a [`ToggleAction`] to a [`SoundStore`].
///
/// Both slots are written on every apply, so applying the same presence
/// twice leaves the same state as applying it once.
pub struct ToggleController {
    store: Box<dyn SoundStore>,
    sounds: SoundPaths,
    log: LogSink,
}

impl ToggleController {
    pub fn new(store: Box<dyn SoundStore>, sounds: SoundPaths, log: LogSink) -> Self {
        Self { store, sounds, log }
    }

    /// Write both slots for the given presence of the target.
    ///
    /// A failed slot write is reported as a warning and does not stop the
    /// other slot from being written.
    pub fn apply_for_presence(&mut self, is_present: bool) {
        let action = ToggleAction::for_presence(is_present);
        let (connect, disconnect) = match action {
            ToggleAction::Silence => ("", ""),
            ToggleAction::Restore => (self.sounds.inserted.as_str(), self.sounds.removed.as_str()),
        };

        let mut failed = false;
        for (slot, value) in [
            (SoundSlot::DeviceConnect, connect),
            (SoundSlot::DeviceDisconnect, disconnect),
        ] {
            if let Err(e) = self.store.write(slot, value) {
                (self.log)(&format!("Warning: {}", e));
                failed = true;
            }
        }

        if failed {
            debug!("Sound slots partially written for {:?}", action);
        } else {
            (self.log)(&format!("Device connect/disconnect sounds {}", action));
        }
    }
}
