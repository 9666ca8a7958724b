//! Display Chime
//!
//! Watches for one display device and silences the generic Windows device
//! connect/disconnect chimes while it is attached, restoring them when it
//! goes away.

pub mod config;
pub mod devices;
pub mod error;
pub mod instance;
pub mod paths;
pub mod poll;
pub mod presence;
pub mod sink;
pub mod sounds;
pub mod toggle;

pub use error::{ChimeError, Result};
