//! Notification sound slots
//!
//! Windows keeps the sound played for a generic device arrival/removal in
//! two per-user scheme slots. A [`SoundStore`] writes those slots; an empty
//! value mutes the event, a file path makes it audible.

#[cfg(windows)]
pub mod registry;

use crate::error::{ChimeError, Result};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// One of the two device notification sound slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundSlot {
    DeviceConnect,
    DeviceDisconnect,
}

impl SoundSlot {
    /// Sound event name in the Windows sound scheme
    pub fn event_name(self) -> &'static str {
        match self {
            Self::DeviceConnect => "DeviceConnect",
            Self::DeviceDisconnect => "DeviceDisconnect",
        }
    }
}

impl fmt::Display for SoundSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.event_name())
    }
}

/// Write access to the sound slots. Writes are unconditional; nothing is
/// read back.
pub trait SoundStore: Send {
    fn write(&mut self, slot: SoundSlot, value: &str) -> Result<()>;
}

#[derive(Default)]
struct MemoryState {
    slots: HashMap<SoundSlot, String>,
    history: Vec<(SoundSlot, String)>,
    missing: HashSet<SoundSlot>,
}

/// In-process sound store.
///
/// Used for dry runs and on platforms without a sound scheme registry.
/// Clones share the same slots, so a caller can keep a handle after moving
/// the store into a controller.
#[derive(Clone, Default)]
pub struct MemorySoundStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemorySoundStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a slot, `None` if never written
    pub fn get(&self, slot: SoundSlot) -> Option<String> {
        self.state.lock().slots.get(&slot).cloned()
    }

    /// Every successful write in order
    pub fn history(&self) -> Vec<(SoundSlot, String)> {
        self.state.lock().history.clone()
    }

    /// Make writes to `slot` fail as if its key did not exist
    pub fn remove_slot(&self, slot: SoundSlot) {
        self.state.lock().missing.insert(slot);
    }
}

impl SoundStore for MemorySoundStore {
    fn write(&mut self, slot: SoundSlot, value: &str) -> Result<()> {
        let mut state = self.state.lock();
        if state.missing.contains(&slot) {
            return Err(ChimeError::SoundSlot {
                slot,
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "slot does not exist"),
            });
        }

        debug!("[memory] {} := {:?}", slot, value);
        state.slots.insert(slot, value.to_string());
        state.history.push((slot, value.to_string()));
        Ok(())
    }
}

/// Sound store for the current platform.
///
/// `dry_run` always selects the in-memory store.
pub fn platform_store(dry_run: bool) -> Box<dyn SoundStore> {
    if dry_run {
        return Box::new(MemorySoundStore::new());
    }

    #[cfg(windows)]
    {
        Box::new(registry::RegistrySoundStore::current_user())
    }

    #[cfg(not(windows))]
    {
        tracing::warn!("No notification sound scheme on this platform, sound slots are kept in memory");
        Box::new(MemorySoundStore::new())
    }
}
