//! Error types for device enumeration, sound slots and the instance lock

use crate::sounds::SoundSlot;
use thiserror::Error;

/// Domain error type
#[derive(Error, Debug)]
pub enum ChimeError {
    /// Querying the attached display devices failed
    #[error("Device enumeration failed: {0}")]
    Enumeration(String),

    /// A notification sound slot could not be opened or written
    #[error("Failed to write {slot} sound slot: {source}")]
    SoundSlot {
        slot: SoundSlot,
        #[source]
        source: std::io::Error,
    },

    /// Another process already holds the instance lock
    #[error("Another instance is already running")]
    AlreadyRunning,

    /// The instance lock itself could not be created
    #[error("Failed to create instance lock: {0}")]
    InstanceLock(String),

    /// The current platform has no back-end for this operation
    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),
}

/// Result type alias for ChimeError
pub type Result<T> = std::result::Result<T, ChimeError>;
