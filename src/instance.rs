//! Process-wide single-instance lock.
//!
//! Backed by a named mutex on Windows (an abstract socket on Linux). The
//! lock is released when the guard drops, whichever way `main` exits.

use crate::error::{ChimeError, Result};
use single_instance::SingleInstance;
use tracing::debug;

/// Lock name shared by every Display Chime process
pub const INSTANCE_LOCK_NAME: &str = "display-chime";

/// Exit status of a second instance that found the lock held
pub const EXIT_ALREADY_RUNNING: u8 = 3;

/// Held instance lock
pub struct InstanceGuard {
    _lock: SingleInstance,
}

impl InstanceGuard {
    /// Take the lock, or fail with [`ChimeError::AlreadyRunning`] if another
    /// process holds it.
    pub fn acquire(name: &str) -> Result<Self> {
        let lock =
            SingleInstance::new(name).map_err(|e| ChimeError::InstanceLock(e.to_string()))?;

        if !lock.is_single() {
            return Err(ChimeError::AlreadyRunning);
        }

        debug!("Instance lock '{}' acquired", name);
        Ok(Self { _lock: lock })
    }
}
