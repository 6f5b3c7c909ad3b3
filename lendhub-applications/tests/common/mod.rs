//! Shared fixtures for the application integration tests

#![allow(dead_code)]

use chrono::{DateTime, Local, NaiveDate, TimeZone};
use lendhub_applications::{
    AppContext, Credentials, FixedClock, Navigator, Redirect, SessionStore, UserDraft,
};
use lendhub_core::{AuthConfig, KeyValueStore, LendhubConfig, MemoryStore, NotificationLevel, Notifier};
use std::sync::{Arc, Mutex, Once};

static INIT: Once = Once::new();

/// Initialize logging for tests
pub fn init_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("lendhub_applications=debug,lendhub_core=debug,info")
            .with_test_writer()
            .try_init();
    });
}

/// Local wall-clock instant
pub fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Local> {
    let naive = NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap();
    Local.from_local_datetime(&naive).earliest().unwrap()
}

pub fn auth_config() -> AuthConfig {
    LendhubConfig::default().auth
}

pub fn memory_store() -> Arc<dyn KeyValueStore> {
    Arc::new(MemoryStore::new())
}

pub fn session_at(
    store: Arc<dyn KeyValueStore>,
    config: AuthConfig,
    now: DateTime<Local>,
) -> (SessionStore, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::new(now));
    let session = SessionStore::with_clock(store, config, clock.clone());
    (session, clock)
}

pub fn ama_draft() -> UserDraft {
    UserDraft {
        full_name: "Ama K".to_string(),
        phone: "+233201234567".to_string(),
        country: "GH".to_string(),
        password: "secret1".to_string(),
        email: None,
    }
}

pub fn ama_credentials() -> Credentials {
    Credentials::new("+233201234567", "secret1", "GH")
}

/// Notifier that records every message
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<(String, NotificationLevel)>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<(String, NotificationLevel)> {
        self.messages.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<(String, NotificationLevel)> {
        self.messages.lock().unwrap().last().cloned()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str, level: NotificationLevel) {
        self.messages
            .lock()
            .unwrap()
            .push((message.to_string(), level));
    }
}

/// Navigator that records every redirect
#[derive(Default)]
pub struct RecordingNavigator {
    redirects: Mutex<Vec<Redirect>>,
}

impl RecordingNavigator {
    pub fn redirects(&self) -> Vec<Redirect> {
        self.redirects.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<Redirect> {
        self.redirects.lock().unwrap().last().copied()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect(&self, target: Redirect) {
        self.redirects.lock().unwrap().push(target);
    }
}

/// Context over a fresh memory store with recording sinks
pub struct TestApp {
    pub context: AppContext,
    pub store: Arc<dyn KeyValueStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub navigator: Arc<RecordingNavigator>,
    pub clock: Arc<FixedClock>,
}

impl TestApp {
    pub fn spawn() -> Self {
        Self::spawn_with(memory_store(), LendhubConfig::default())
    }

    pub fn spawn_with(store: Arc<dyn KeyValueStore>, config: LendhubConfig) -> Self {
        init_logging();

        let notifier = Arc::new(RecordingNotifier::default());
        let navigator = Arc::new(RecordingNavigator::default());
        let clock = Arc::new(FixedClock::new(local(2024, 1, 15, 9, 0)));

        let context = AppContext::initialize_with_clock(
            config,
            store.clone(),
            notifier.clone(),
            navigator.clone(),
            clock.clone(),
        )
        .expect("Failed to initialize context");

        Self {
            context,
            store,
            notifier,
            navigator,
            clock,
        }
    }
}
