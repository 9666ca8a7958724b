//! Linux back-end: DRM connectors under `/sys/class/drm`.
//!
//! Each connected connector's EDID is decoded into the PnP manufacturer +
//! product code pair Windows uses for its display instance paths, so a
//! monitor is identified as `XYM1564` on both platforms. The synthetic
//! instance path is `DISPLAY\<pnp id>\<connector>`.

use super::DeviceBackend;
use crate::error::{ChimeError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default sysfs DRM class directory
pub const DRM_PATH: &str = "/sys/class/drm";

const EDID_HEADER: [u8; 8] = [0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00];

/// Connector scanner rooted at a DRM class directory
pub struct DrmBackend {
    root: PathBuf,
}

impl DrmBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn connector_path(&self, connector: &Path) -> Option<String> {
        let name = connector.file_name()?.to_string_lossy().to_string();

        let status = std::fs::read_to_string(connector.join("status")).ok()?;
        if status.trim() != "connected" {
            return None;
        }

        let edid = match std::fs::read(connector.join("edid")) {
            Ok(edid) => edid,
            Err(e) => {
                debug!("Connector {} has no readable EDID: {}", name, e);
                return None;
            }
        };

        match pnp_id(&edid) {
            Some(pnp) => Some(format!(r"DISPLAY\{}\{}", pnp, name)),
            None => {
                debug!("Connector {} has an invalid EDID ({} bytes)", name, edid.len());
                None
            }
        }
    }
}

impl Default for DrmBackend {
    fn default() -> Self {
        Self::new(DRM_PATH)
    }
}

impl DeviceBackend for DrmBackend {
    fn instance_paths(&mut self) -> Result<Vec<String>> {
        let entries = std::fs::read_dir(&self.root).map_err(|e| {
            ChimeError::Enumeration(format!("cannot read {}: {}", self.root.display(), e))
        })?;

        let mut paths = Vec::new();
        for entry in entries.flatten() {
            // Connectors are named card<N>-<type>-<index>; skip the card nodes
            if !entry.file_name().to_string_lossy().contains('-') {
                continue;
            }
            if let Some(path) = self.connector_path(&entry.path()) {
                paths.push(path);
            }
        }

        paths.sort();
        Ok(paths)
    }
}

/// Decode the PnP id (`XYM1564`) from an EDID base block.
///
/// Bytes 8-9 pack three 5-bit letters big-endian (`1` = `A`), bytes 10-11
/// hold the little-endian product code.
pub fn pnp_id(edid: &[u8]) -> Option<String> {
    if edid.len() < 128 || edid[..8] != EDID_HEADER {
        return None;
    }

    let packed = u16::from_be_bytes([edid[8], edid[9]]);
    let mut manufacturer = String::with_capacity(3);
    for shift in [10, 5, 0] {
        let code = ((packed >> shift) & 0x1F) as u8;
        if !(1..=26).contains(&code) {
            return None;
        }
        manufacturer.push((b'A' + code - 1) as char);
    }

    let product = u16::from_le_bytes([edid[10], edid[11]]);
    Some(format!("{}{:04X}", manufacturer, product))
}
