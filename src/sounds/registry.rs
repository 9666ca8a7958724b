//! Windows back-end: the per-user sound scheme in the registry.
//!
//! `HKCU\AppEvents\Schemes\Apps\.Default\<event>\.Current` holds the sound
//! file played for `<event>` in its default value.

use super::{SoundSlot, SoundStore};
use crate::error::{ChimeError, Result};
use tracing::debug;
use winreg::enums::{HKEY_CURRENT_USER, KEY_SET_VALUE};
use winreg::RegKey;

const SCHEME_ROOT: &str = r"AppEvents\Schemes\Apps\.Default";

/// Registry key holding the current sound of `slot`
pub fn slot_key_path(slot: SoundSlot) -> String {
    format!(r"{}\{}\.Current", SCHEME_ROOT, slot.event_name())
}

/// Sound scheme of the current user
pub struct RegistrySoundStore {
    root: RegKey,
}

impl RegistrySoundStore {
    pub fn current_user() -> Self {
        Self {
            root: RegKey::predef(HKEY_CURRENT_USER),
        }
    }
}

impl SoundStore for RegistrySoundStore {
    fn write(&mut self, slot: SoundSlot, value: &str) -> Result<()> {
        let path = slot_key_path(slot);

        // Opened, never created: a missing event key is an error
        let key = self
            .root
            .open_subkey_with_flags(&path, KEY_SET_VALUE)
            .map_err(|source| ChimeError::SoundSlot { slot, source })?;

        key.set_value("", &value.to_string())
            .map_err(|source| ChimeError::SoundSlot { slot, source })?;

        debug!(r"HKCU\{} := {:?}", path, value);
        Ok(())
    }
}
