//! Display device enumeration
//!
//! A [`DeviceBackend`] lists the instance paths of the display devices that
//! are attached right now (`DISPLAY\XYM1564\5&1a2b3c4d&0&UID4353` on
//! Windows). [`DisplayDevices`] turns those paths into a [`DeviceIdSet`]
//! using an [`IdGranularity`] rule and fails closed: a query error yields an
//! empty set and a reported line, never a fatal error.

#[cfg(target_os = "linux")]
pub mod drm;
#[cfg(windows)]
pub mod setupapi;

use crate::error::{ChimeError, Result};
use crate::sink::LogSink;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Identifiers of the displays attached at one observation instant.
///
/// Ordered so logged deltas read the same way every poll.
pub type DeviceIdSet = BTreeSet<String>;

/// How much of a device instance path is used as its identifier.
///
/// The same rule must be used for the startup snapshot and every later poll,
/// otherwise one physical device would look like a remove + add pair.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum IdGranularity {
    /// Second path segment, the PnP model token (`XYM1564`). Two identical
    /// monitors collapse into one identifier.
    #[default]
    Model,
    /// The whole instance path. Identical models on different ports are
    /// distinct.
    Instance,
}

impl IdGranularity {
    /// Derive an identifier from an instance path, `None` if the path has no
    /// usable segment.
    pub fn identify(self, instance_path: &str) -> Option<String> {
        let path = instance_path.trim();
        let id = match self {
            Self::Model => path.split('\\').nth(1)?,
            Self::Instance => path,
        };
        (!id.is_empty()).then(|| id.to_string())
    }
}

/// Platform query for attached display devices
pub trait DeviceBackend: Send {
    /// Instance paths of every display device currently attached.
    fn instance_paths(&mut self) -> Result<Vec<String>>;
}

/// Back-end for platforms without a display query.
pub struct UnsupportedBackend;

impl DeviceBackend for UnsupportedBackend {
    fn instance_paths(&mut self) -> Result<Vec<String>> {
        Err(ChimeError::Unsupported("display device enumeration"))
    }
}

/// Back-end for the current platform
pub fn platform_backend() -> Box<dyn DeviceBackend> {
    #[cfg(windows)]
    {
        Box::new(setupapi::SetupApiBackend)
    }

    #[cfg(target_os = "linux")]
    {
        Box::new(drm::DrmBackend::default())
    }

    #[cfg(not(any(windows, target_os = "linux")))]
    {
        Box::new(UnsupportedBackend)
    }
}

/// Device enumerator: a back-end plus the identifier rule.
pub struct DisplayDevices {
    backend: Box<dyn DeviceBackend>,
    granularity: IdGranularity,
    log: LogSink,
}

impl DisplayDevices {
    pub fn new(backend: Box<dyn DeviceBackend>, granularity: IdGranularity, log: LogSink) -> Self {
        Self {
            backend,
            granularity,
            log,
        }
    }

    pub fn granularity(&self) -> IdGranularity {
        self.granularity
    }

    /// Query the back-end, propagating failures.
    pub fn try_enumerate(&mut self) -> Result<DeviceIdSet> {
        let paths = self.backend.instance_paths()?;
        let mut ids = DeviceIdSet::new();
        for path in &paths {
            match self.granularity.identify(path) {
                Some(id) => {
                    ids.insert(id);
                }
                None => debug!("Ignoring display with unusable instance path: {:?}", path),
            }
        }
        debug!("Enumerated {} display(s): {:?}", ids.len(), ids);
        Ok(ids)
    }

    /// Query the back-end; any failure degrades to an empty set.
    pub fn enumerate(&mut self) -> DeviceIdSet {
        match self.try_enumerate() {
            Ok(ids) => ids,
            Err(e) => {
                (self.log)(&format!("Error: {}", e));
                DeviceIdSet::new()
            }
        }
    }
}

/// Comma-separated identifiers, `(none)` for an empty set
pub fn format_ids(ids: &DeviceIdSet) -> String {
    if ids.is_empty() {
        "(none)".to_string()
    } else {
        ids.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
    }
}

/// Back-end replaying a fixed script of enumeration results
#[cfg(test)]
pub(crate) struct ScriptedBackend {
    script: std::collections::VecDeque<Result<Vec<String>>>,
    on_exhausted: Option<tokio::sync::oneshot::Sender<()>>,
}

#[cfg(test)]
impl ScriptedBackend {
    pub(crate) fn new(script: Vec<Result<Vec<String>>>) -> Self {
        Self {
            script: script.into(),
            on_exhausted: None,
        }
    }

    /// Script of plain model identifiers, wrapped into instance paths
    pub(crate) fn from_sets(sets: &[&[&str]]) -> Self {
        Self::new(sets.iter().map(|set| Ok(instance_paths(set))).collect())
    }

    /// Fire `tx` once the last scripted result has been handed out
    pub(crate) fn notify_when_exhausted(mut self, tx: tokio::sync::oneshot::Sender<()>) -> Self {
        self.on_exhausted = Some(tx);
        self
    }
}

#[cfg(test)]
impl DeviceBackend for ScriptedBackend {
    fn instance_paths(&mut self) -> Result<Vec<String>> {
        let next = self.script.pop_front().unwrap_or_else(|| Ok(Vec::new()));
        if self.script.is_empty() {
            if let Some(tx) = self.on_exhausted.take() {
                let _ = tx.send(());
            }
        }
        next
    }
}

#[cfg(test)]
pub(crate) fn instance_paths(models: &[&str]) -> Vec<String> {
    models
        .iter()
        .enumerate()
        .map(|(i, model)| format!(r"DISPLAY\{}\5&1a2b3c4d&0&UID{}", model, 4353 + i))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::CapturedLines;

    #[test]
    fn test_model_granularity_takes_second_segment() {
        let id = IdGranularity::Model.identify(r"DISPLAY\XYM1564\5&1a2b3c4d&0&UID4353");
        assert_eq!(id.as_deref(), Some("XYM1564"));
    }

    #[test]
    fn test_instance_granularity_keeps_whole_path() {
        let path = r"DISPLAY\XYM1564\5&1a2b3c4d&0&UID4353";
        assert_eq!(IdGranularity::Instance.identify(path).as_deref(), Some(path));
    }

    #[test]
    fn test_identify_rejects_unusable_paths() {
        assert_eq!(IdGranularity::Model.identify("DISPLAY"), None);
        assert_eq!(IdGranularity::Model.identify(r"DISPLAY\\UID1"), None);
        assert_eq!(IdGranularity::Instance.identify("   "), None);
    }

    #[test]
    fn test_model_granularity_collapses_identical_monitors() {
        let backend = ScriptedBackend::new(vec![Ok(vec![
            r"DISPLAY\XYM1564\5&1a2b3c4d&0&UID4353".to_string(),
            r"DISPLAY\XYM1564\5&1a2b3c4d&0&UID4354".to_string(),
        ])]);
        let mut devices =
            DisplayDevices::new(Box::new(backend), IdGranularity::Model, CapturedLines::default().sink());

        let ids = devices.enumerate();
        assert_eq!(ids.len(), 1);
        assert!(ids.contains("XYM1564"));
    }

    #[test]
    fn test_instance_granularity_distinguishes_identical_monitors() {
        let backend = ScriptedBackend::new(vec![Ok(vec![
            r"DISPLAY\XYM1564\5&1a2b3c4d&0&UID4353".to_string(),
            r"DISPLAY\XYM1564\5&1a2b3c4d&0&UID4354".to_string(),
        ])]);
        let mut devices = DisplayDevices::new(
            Box::new(backend),
            IdGranularity::Instance,
            CapturedLines::default().sink(),
        );

        assert_eq!(devices.enumerate().len(), 2);
    }

    #[test]
    fn test_enumerate_fails_closed() {
        let captured = CapturedLines::default();
        let backend = ScriptedBackend::new(vec![Err(ChimeError::Enumeration(
            "query timed out".to_string(),
        ))]);
        let mut devices = DisplayDevices::new(Box::new(backend), IdGranularity::Model, captured.sink());

        assert!(devices.enumerate().is_empty());
        assert_eq!(
            captured.lines(),
            vec!["Error: Device enumeration failed: query timed out".to_string()]
        );
    }

    #[test]
    fn test_try_enumerate_propagates_errors() {
        let mut devices = DisplayDevices::new(
            Box::new(UnsupportedBackend),
            IdGranularity::Model,
            CapturedLines::default().sink(),
        );

        assert!(matches!(
            devices.try_enumerate(),
            Err(ChimeError::Unsupported(_))
        ));
    }

    #[test]
    fn test_format_ids() {
        assert_eq!(format_ids(&DeviceIdSet::new()), "(none)");
        let ids: DeviceIdSet = ["XYM1564", "ABC123"].iter().map(|s| s.to_string()).collect();
        assert_eq!(format_ids(&ids), "ABC123, XYM1564");
    }
}
