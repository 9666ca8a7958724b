//! Poll loop: enumerate, diff, toggle, sleep, repeat.
//!
//! [`PollLoop::initialize`] performs the startup step (snapshot, seed,
//! unconditional baseline apply). After that every [`PollLoop::poll_once`]
//! is one cycle, and [`PollLoop::run`] repeats cycles until the shutdown
//! future resolves. Everything runs on the caller's task; the only await
//! point is the sleep between cycles.

use crate::devices::{format_ids, DisplayDevices};
use crate::presence::{PresenceTracker, TransitionEvent};
use crate::sink::LogSink;
use crate::toggle::ToggleController;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// Default time between two enumerations
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3000);

/// Steady-state poll loop for one target display
pub struct PollLoop {
    devices: DisplayDevices,
    tracker: PresenceTracker,
    controller: ToggleController,
    interval: Duration,
    log: LogSink,
}

impl PollLoop {
    /// Take the startup snapshot and apply the matching baseline.
    ///
    /// The baseline is applied whatever the slots held before, so the system
    /// starts from a known state.
    pub fn initialize(
        mut devices: DisplayDevices,
        mut controller: ToggleController,
        target_id: impl Into<String>,
        interval: Duration,
        log: LogSink,
    ) -> Self {
        let target_id = target_id.into();
        log(&format!(
            "Watching for display {} (polling every {} ms, {:?} identifiers)",
            target_id,
            interval.as_millis(),
            devices.granularity()
        ));

        let initial_ids = devices.enumerate();
        log(&format!("Attached displays: {}", format_ids(&initial_ids)));

        let tracker = PresenceTracker::new(target_id, initial_ids);
        log(&format!(
            "Target display {} is {} at startup",
            tracker.target_id(),
            if tracker.is_present() { "present" } else { "absent" }
        ));

        controller.apply_for_presence(tracker.is_present());

        Self {
            devices,
            tracker,
            controller,
            interval,
            log,
        }
    }

    pub fn tracker(&self) -> &PresenceTracker {
        &self.tracker
    }

    /// One poll cycle without the sleep
    pub fn poll_once(&mut self) -> TransitionEvent {
        let current_ids = self.devices.enumerate();
        let event = self.tracker.update(current_ids);

        if !event.added.is_empty() {
            (self.log)(&format!("Displays added: {}", format_ids(&event.added)));
        }
        if !event.removed.is_empty() {
            (self.log)(&format!("Displays removed: {}", format_ids(&event.removed)));
        }

        if event.is_transition() {
            (self.log)(&format!(
                "Target display {} {}",
                self.tracker.target_id(),
                if event.current_presence { "connected" } else { "disconnected" }
            ));
            self.controller.apply_for_presence(event.current_presence);
            self.tracker.commit(&event);
        }

        event
    }

    /// Poll until `shutdown` resolves.
    ///
    /// Shutdown is checked before every sleep, so a cycle already in
    /// progress always completes.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) {
        info!("Starting poll loop (interval {:?})", self.interval);
        tokio::pin!(shutdown);

        let mut cycles: u64 = 0;
        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Shutdown signal received, stopping poll loop after {} cycle(s)", cycles);
                    break;
                }

                _ = tokio::time::sleep(self.interval) => {}
            }

            let event = self.poll_once();
            cycles += 1;
            debug!(
                cycle = cycles,
                present = event.current_presence,
                added = event.added.len(),
                removed = event.removed.len(),
                "Poll cycle complete"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::{instance_paths, IdGranularity, ScriptedBackend};
    use crate::error::ChimeError;
    use crate::sink::CapturedLines;
    use crate::sounds::{MemorySoundStore, SoundSlot};
    use crate::toggle::SoundPaths;
    use proptest::prelude::*;

    const TARGET: &str = "XYM1564";

    struct Harness {
        store: MemorySoundStore,
        captured: CapturedLines,
        poll: PollLoop,
    }

    fn sounds() -> SoundPaths {
        SoundPaths {
            inserted: "insert.wav".to_string(),
            removed: "remove.wav".to_string(),
        }
    }

    fn start(backend: ScriptedBackend) -> Harness {
        let store = MemorySoundStore::new();
        let captured = CapturedLines::default();
        let devices = DisplayDevices::new(Box::new(backend), IdGranularity::Model, captured.sink());
        let controller = ToggleController::new(Box::new(store.clone()), sounds(), captured.sink());
        let poll = PollLoop::initialize(
            devices,
            controller,
            TARGET,
            Duration::from_millis(1),
            captured.sink(),
        );
        Harness {
            store,
            captured,
            poll,
        }
    }

    fn slots(store: &MemorySoundStore) -> (Option<String>, Option<String>) {
        (
            store.get(SoundSlot::DeviceConnect),
            store.get(SoundSlot::DeviceDisconnect),
        )
    }

    fn silenced() -> (Option<String>, Option<String>) {
        (Some(String::new()), Some(String::new()))
    }

    fn restored() -> (Option<String>, Option<String>) {
        (Some("insert.wav".to_string()), Some("remove.wav".to_string()))
    }

    /// Number of controller applies, from the write history (two per apply)
    fn applies(store: &MemorySoundStore) -> usize {
        store.history().len() / 2
    }

    #[test]
    fn test_baseline_with_target_present_silences() {
        let harness = start(ScriptedBackend::from_sets(&[&["XYM1564"]]));

        let history = harness.store.history();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|(_, value)| value.is_empty()));
        assert!(harness.poll.tracker().is_present());
        assert!(harness.captured.contains("is present at startup"));
    }

    #[test]
    fn test_baseline_with_target_absent_restores() {
        let harness = start(ScriptedBackend::from_sets(&[&["ABC123"]]));

        assert_eq!(applies(&harness.store), 1);
        assert_eq!(slots(&harness.store), restored());
        assert!(harness.captured.contains("Attached displays: ABC123"));
        assert!(harness.captured.contains("is absent at startup"));
    }

    #[test]
    fn test_target_arrival_silences() {
        let mut harness = start(ScriptedBackend::from_sets(&[&["ABC123"], &["ABC123", "XYM1564"]]));

        let event = harness.poll.poll_once();

        assert_eq!(event.added.iter().collect::<Vec<_>>(), vec!["XYM1564"]);
        assert!(event.removed.is_empty());
        assert!(!event.previous_presence);
        assert!(event.current_presence);
        assert_eq!(applies(&harness.store), 2);
        assert_eq!(slots(&harness.store), silenced());
        assert!(harness.captured.contains("Displays added: XYM1564"));
        assert!(harness.captured.contains("Target display XYM1564 connected"));
    }

    #[test]
    fn test_target_removal_restores() {
        let mut harness = start(ScriptedBackend::from_sets(&[&["XYM1564"], &[]]));

        let event = harness.poll.poll_once();

        assert_eq!(event.removed.iter().collect::<Vec<_>>(), vec!["XYM1564"]);
        assert!(event.previous_presence);
        assert!(!event.current_presence);
        assert_eq!(slots(&harness.store), restored());
        assert!(harness.captured.contains("Target display XYM1564 disconnected"));
    }

    #[test]
    fn test_unrelated_changes_do_not_toggle() {
        let mut harness = start(ScriptedBackend::from_sets(&[
            &["XYM1564"],
            &["XYM1564", "ABC123"],
            &["XYM1564"],
        ]));

        harness.poll.poll_once();
        harness.poll.poll_once();

        assert_eq!(applies(&harness.store), 1);
        assert!(harness.captured.contains("Displays added: ABC123"));
        assert!(harness.captured.contains("Displays removed: ABC123"));
    }

    #[test]
    fn test_quiet_cycles_log_nothing() {
        let mut harness = start(ScriptedBackend::from_sets(&[&["XYM1564"], &["XYM1564"]]));
        let before = harness.captured.lines().len();

        harness.poll.poll_once();

        assert_eq!(harness.captured.lines().len(), before);
    }

    #[test]
    fn test_enumeration_error_flaps_target() {
        let mut harness = start(ScriptedBackend::new(vec![
            Ok(instance_paths(&["XYM1564", "ABC123"])),
            Err(ChimeError::Enumeration("transport error".to_string())),
            Ok(instance_paths(&["XYM1564", "ABC123"])),
        ]));

        let degraded = harness.poll.poll_once();
        assert!(degraded.added.is_empty());
        assert_eq!(degraded.removed.len(), 2);
        assert!(degraded.is_transition());
        assert_eq!(slots(&harness.store), restored());
        assert!(harness.captured.contains("transport error"));

        let recovered = harness.poll.poll_once();
        assert!(recovered.is_transition());
        assert_eq!(slots(&harness.store), silenced());
        assert_eq!(applies(&harness.store), 3);
    }

    #[test]
    fn test_startup_enumeration_error_means_absent() {
        let harness = start(ScriptedBackend::new(vec![Err(ChimeError::Enumeration(
            "no access".to_string(),
        ))]));

        assert!(!harness.poll.tracker().is_present());
        assert_eq!(slots(&harness.store), restored());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let backend = ScriptedBackend::from_sets(&[&[], &["XYM1564"], &["XYM1564"], &[]])
            .notify_when_exhausted(tx);
        let harness = start(backend);

        harness
            .poll
            .run(async {
                let _ = rx.await;
            })
            .await;

        // Baseline restore, silence on arrival, restore on removal
        assert_eq!(applies(&harness.store), 3);
        assert_eq!(slots(&harness.store), restored());
    }

    proptest! {
        #[test]
        fn prop_one_apply_per_presence_edge(
            presence in prop::collection::vec(any::<bool>(), 1..24),
            others in prop::collection::vec(any::<bool>(), 24),
        ) {
            let sets: Vec<Vec<&str>> = presence
                .iter()
                .zip(&others)
                .map(|(&present, &other)| {
                    let mut set = Vec::new();
                    if present {
                        set.push(TARGET);
                    }
                    if other {
                        set.push("ABC123");
                    }
                    set
                })
                .collect();
            let set_refs: Vec<&[&str]> = sets.iter().map(Vec::as_slice).collect();

            let mut harness = start(ScriptedBackend::from_sets(&set_refs));
            for _ in 1..presence.len() {
                harness.poll.poll_once();
            }

            let edges = presence.windows(2).filter(|pair| pair[0] != pair[1]).count();
            prop_assert_eq!(applies(&harness.store), 1 + edges);

            let expected = if presence[presence.len() - 1] { silenced() } else { restored() };
            prop_assert_eq!(slots(&harness.store), expected);
        }
    }
}
