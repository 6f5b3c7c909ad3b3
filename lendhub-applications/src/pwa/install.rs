//! Install/Update Notifier
//!
//! Tracks whether the app can be installed, whether a newer version is
//! waiting, and whether the client is online. User-visible changes go through
//! the [`Notifier`] sink.

use super::queue::{FlushReport, OfflineQueue, QueuedAction};
use chrono::{DateTime, Utc};
use lendhub_core::{KeyValueStore, NotificationLevel, Notifier, PwaConfig};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallState {
    /// Host cannot install the app
    Unsupported,
    /// Supported, no install prompt offered yet
    Waiting,
    /// Install prompt is available
    Installable,
    /// User declined the prompt
    Dismissed,
    Installed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    Online,
    Offline,
}

/// A new version waiting to be activated
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingUpdate {
    pub version: String,
    pub found_at: DateTime<Utc>,
}

pub struct InstallNotifier {
    install_state: InstallState,
    connectivity: Connectivity,
    pending_update: Option<PendingUpdate>,
    queue: OfflineQueue,
    notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for InstallNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallNotifier")
            .field("install_state", &self.install_state)
            .field("connectivity", &self.connectivity)
            .field("pending_update", &self.pending_update)
            .field("queue", &self.queue)
            .finish()
    }
}

impl InstallNotifier {
    pub fn new(
        config: &PwaConfig,
        store: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let install_state = if config.install_supported {
            InstallState::Waiting
        } else {
            InstallState::Unsupported
        };

        Self {
            install_state,
            connectivity: Connectivity::Online,
            pending_update: None,
            queue: OfflineQueue::load(store, config.max_queued_actions),
            notifier,
        }
    }

    pub fn install_state(&self) -> InstallState {
        self.install_state
    }

    /// The host offered an install prompt. Returns whether the install
    /// button should now be shown.
    pub fn prompt_available(&mut self) -> bool {
        match self.install_state {
            InstallState::Waiting | InstallState::Dismissed => {
                self.install_state = InstallState::Installable;
                debug!("Install prompt available");
                true
            }
            InstallState::Installable => true,
            InstallState::Unsupported | InstallState::Installed => false,
        }
    }

    pub fn dismiss_install(&mut self) {
        if self.install_state == InstallState::Installable {
            self.install_state = InstallState::Dismissed;
        }
    }

    pub fn mark_installed(&mut self) {
        if self.install_state == InstallState::Installed {
            return;
        }
        self.install_state = InstallState::Installed;
        info!("App installed");
        self.notifier
            .notify("LendHub was installed on this device", NotificationLevel::Success);
    }

    /// A newer version finished downloading
    pub fn update_found<V: Into<String>>(&mut self, version: V) {
        let version = version.into();
        if self
            .pending_update
            .as_ref()
            .is_some_and(|u| u.version == version)
        {
            return;
        }

        info!("Update {} available", version);
        self.notifier.notify(
            &format!("Version {} is available. Reload to update.", version),
            NotificationLevel::Info,
        );
        self.pending_update = Some(PendingUpdate {
            version,
            found_at: Utc::now(),
        });
    }

    pub fn pending_update(&self) -> Option<&PendingUpdate> {
        self.pending_update.as_ref()
    }

    /// Activate the waiting version, returning it
    pub fn apply_update(&mut self) -> Option<PendingUpdate> {
        let update = self.pending_update.take()?;
        info!("Activating update {}", update.version);
        Some(update)
    }

    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    pub fn is_online(&self) -> bool {
        self.connectivity == Connectivity::Online
    }

    /// Show the offline banner
    pub fn go_offline(&mut self) {
        if self.connectivity == Connectivity::Offline {
            return;
        }
        self.connectivity = Connectivity::Offline;
        info!("Connection lost");
        self.notifier.notify(
            "You are offline. Actions will be sent when you reconnect.",
            NotificationLevel::Warning,
        );
    }

    /// Mark the client offline without showing the banner. Used when a new
    /// page load starts with actions still queued from an earlier one.
    pub fn resume_offline(&mut self) {
        if self.connectivity == Connectivity::Online {
            debug!("Resuming offline with {} queued actions", self.queue.len());
            self.connectivity = Connectivity::Offline;
        }
    }

    /// Hide the offline banner and replay queued actions once
    pub fn go_online<F, E>(&mut self, handler: F) -> FlushReport
    where
        F: FnMut(&QueuedAction) -> Result<(), E>,
        E: std::fmt::Display,
    {
        if self.connectivity == Connectivity::Online {
            return FlushReport::default();
        }
        self.connectivity = Connectivity::Online;
        info!("Connection restored");
        self.notifier
            .notify("You are back online", NotificationLevel::Success);

        if self.queue.is_empty() {
            return FlushReport::default();
        }

        let report = self.queue.flush(handler);
        if report.delivered > 0 {
            self.notifier.notify(
                &format!("Synced {} offline action(s)", report.delivered),
                NotificationLevel::Success,
            );
        }
        if report.failed > 0 {
            self.notifier.notify(
                &format!("{} action(s) could not be synced yet", report.failed),
                NotificationLevel::Warning,
            );
        }
        report
    }

    /// Record an action while offline
    pub fn queue_action<K: Into<String>>(
        &mut self,
        kind: K,
        payload: serde_json::Value,
    ) -> QueuedAction {
        self.queue.enqueue(kind, payload)
    }

    pub fn queue(&self) -> &OfflineQueue {
        &self.queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lendhub_core::MemoryStore;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        messages: Mutex<Vec<(String, NotificationLevel)>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, message: &str, level: NotificationLevel) {
            self.messages
                .lock()
                .unwrap()
                .push((message.to_string(), level));
        }
    }

    fn notifier_with(supported: bool) -> (Arc<RecordingNotifier>, InstallNotifier) {
        let config = PwaConfig {
            install_supported: supported,
            max_queued_actions: 10,
        };
        let sink = Arc::new(RecordingNotifier::default());
        let install = InstallNotifier::new(&config, Arc::new(MemoryStore::new()), sink.clone());
        (sink, install)
    }

    #[test]
    fn test_install_lifecycle() {
        let (sink, mut install) = notifier_with(true);
        assert_eq!(install.install_state(), InstallState::Waiting);

        assert!(install.prompt_available());
        install.dismiss_install();
        assert_eq!(install.install_state(), InstallState::Dismissed);

        assert!(install.prompt_available());
        install.mark_installed();
        install.mark_installed();
        assert!(!install.prompt_available());
        assert_eq!(sink.messages.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_unsupported_never_installable() {
        let (_, mut install) = notifier_with(false);
        assert!(!install.prompt_available());
        assert_eq!(install.install_state(), InstallState::Unsupported);
    }

    #[test]
    fn test_update_notified_once_per_version() {
        let (sink, mut install) = notifier_with(true);
        install.update_found("1.2.0");
        install.update_found("1.2.0");
        assert_eq!(sink.messages.lock().unwrap().len(), 1);

        assert_eq!(install.apply_update().unwrap().version, "1.2.0");
        assert!(install.apply_update().is_none());
    }

    #[test]
    fn test_offline_roundtrip_replays_queue() {
        let (sink, mut install) = notifier_with(true);

        install.go_offline();
        install.go_offline();
        install.queue_action("group.join", serde_json::json!({ "groupId": "g7" }));

        let report = install.go_online(|_| Ok::<(), String>(()));
        assert_eq!(report.delivered, 1);
        assert!(install.is_online());
        assert!(install.queue().is_empty());

        let levels: Vec<NotificationLevel> =
            sink.messages.lock().unwrap().iter().map(|(_, l)| *l).collect();
        assert_eq!(
            levels,
            vec![
                NotificationLevel::Warning,
                NotificationLevel::Success,
                NotificationLevel::Success
            ]
        );
    }

    #[test]
    fn test_resume_offline_is_silent() {
        let (sink, mut install) = notifier_with(true);
        install.resume_offline();
        assert_eq!(install.connectivity(), Connectivity::Offline);
        assert!(sink.messages.lock().unwrap().is_empty());

        let report = install.go_online(|_| Ok::<(), String>(()));
        assert_eq!(report, FlushReport::default());
        let levels: Vec<NotificationLevel> =
            sink.messages.lock().unwrap().iter().map(|(_, l)| *l).collect();
        assert_eq!(levels, vec![NotificationLevel::Success]);
    }

    #[test]
    fn test_going_online_when_online_is_noop() {
        let (sink, mut install) = notifier_with(true);
        let report = install.go_online(|_| Err::<(), _>("unreachable"));
        assert_eq!(report, FlushReport::default());
        assert!(sink.messages.lock().unwrap().is_empty());
    }
}
