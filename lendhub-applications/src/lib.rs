//! LendHub Applications - client behaviour built on lendhub-core
//!
//! - Session management: login, registration, logout and role switching
//! - Access control: role permissions, page gating and UI affordances
//! - PWA lifecycle: install prompt, updates and the offline action queue
//!
//! [`AppContext`] owns one instance of each component for a page load.

pub mod auth;
pub mod pwa;
pub mod session;

pub use auth::{
    AccessGate, Affordances, Capability, Decision, Navigator, Page, PermissionSet, Redirect, Role,
    UnknownRole,
};
pub use pwa::{
    Connectivity, FlushReport, InstallNotifier, InstallState, OfflineQueue, PendingUpdate,
    QueuedAction,
};
pub use session::{
    AccountStatus, AuthError, Clock, Credentials, FixedClock, SessionStore, SubscriptionStatus,
    SystemClock, UserDraft, UserRecord,
};

use lendhub_core::{KeyValueStore, LendhubConfig, NotificationLevel, Notifier};
use std::sync::Arc;
use tracing::{debug, info};

/// Application-level error type
#[derive(Debug, thiserror::Error)]
pub enum ApplicationError {
    #[error("Core error: {0}")]
    Core(#[from] lendhub_core::LendhubError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

pub type ApplicationResult<T> = Result<T, ApplicationError>;

/// One page load: the session, the gate and the install notifier sharing a
/// store and host sinks.
pub struct AppContext {
    config: LendhubConfig,
    store: Arc<dyn KeyValueStore>,
    session: SessionStore,
    gate: AccessGate,
    install: InstallNotifier,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("backend", &self.store.backend_name())
            .field("session", &self.session)
            .field("install", &self.install)
            .finish()
    }
}

impl AppContext {
    /// Build the components and load the persisted session
    pub fn initialize(
        config: LendhubConfig,
        store: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> ApplicationResult<Self> {
        Self::initialize_with_clock(config, store, notifier, navigator, Arc::new(SystemClock))
    }

    pub fn initialize_with_clock(
        config: LendhubConfig,
        store: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
        clock: Arc<dyn Clock>,
    ) -> ApplicationResult<Self> {
        config.validate()?;

        let mut session = SessionStore::with_clock(store.clone(), config.auth.clone(), clock);
        let install = InstallNotifier::new(&config.pwa, store.clone(), notifier.clone());

        match session.initialize() {
            Some(user) => info!("Restored session for {} ({})", user.id, user.role),
            None => debug!("No stored session"),
        }

        Ok(Self {
            config,
            store,
            session,
            gate: AccessGate::new(),
            install,
            notifier,
            navigator,
        })
    }

    /// Tear down the page load. Persisted state is left in place.
    pub fn shutdown(self) {
        info!(
            "Shutting down context ({} queued actions)",
            self.install.queue().len()
        );
    }

    /// Authorize a page view, redirecting and notifying on denial
    pub fn enter_page(&self, page: Page) -> Decision {
        let role = self.session.current_role();
        let decision = self.gate.authorize(page, role);

        match decision {
            Decision::Allow => {}
            Decision::DenyUnauthenticated => {
                self.notifier
                    .notify("Please sign in to continue", NotificationLevel::Warning);
            }
            Decision::DenyForbidden => {
                self.notifier.notify(
                    "You don't have permission to view that page",
                    NotificationLevel::Error,
                );
            }
        }

        if let Some(target) = decision.redirect(role) {
            debug!(page = %page, target = %target, "Redirecting");
            self.navigator.redirect(target);
        }
        decision
    }

    pub async fn login(&mut self, credentials: Credentials) -> ApplicationResult<UserRecord> {
        match self.session.login(credentials).await {
            Ok(user) => {
                self.notifier.notify(
                    &format!("Welcome back, {}!", user.first_name()),
                    NotificationLevel::Success,
                );
                self.navigator
                    .redirect(Redirect::Page(Page::dashboard_for(user.role)));
                Ok(user)
            }
            Err(e) => {
                self.notifier.notify(&e.to_string(), NotificationLevel::Error);
                Err(e.into())
            }
        }
    }

    pub async fn register(
        &mut self,
        draft: UserDraft,
        role: Role,
    ) -> ApplicationResult<UserRecord> {
        match self.session.register(draft, role).await {
            Ok(user) => {
                self.notifier.notify(
                    &format!("Welcome to LendHub, {}!", user.first_name()),
                    NotificationLevel::Success,
                );
                self.navigator
                    .redirect(Redirect::Page(Page::dashboard_for(user.role)));
                Ok(user)
            }
            Err(e) => {
                self.notifier.notify(&e.to_string(), NotificationLevel::Error);
                Err(e.into())
            }
        }
    }

    pub fn logout(&mut self) {
        let was_signed_in = self.session.is_authenticated();
        self.session.logout();
        if was_signed_in {
            self.notifier
                .notify("You have been signed out", NotificationLevel::Info);
        }
        self.navigator.redirect(Redirect::Login);
    }

    pub fn switch_role(&mut self, role_name: &str) -> ApplicationResult<UserRecord> {
        let user = self.session.switch_role(role_name)?;
        self.notifier.notify(
            &format!("Now viewing as {}", user.role.label()),
            NotificationLevel::Info,
        );
        Ok(user)
    }

    /// UI affordances for the current session
    pub fn affordances(&self) -> Affordances {
        let status = self.session.subscription_status();
        self.gate
            .affordances(self.session.current_role(), status.as_ref())
    }

    pub fn navigation(&self) -> Vec<Page> {
        self.gate.navigation(self.session.current_role())
    }

    pub fn config(&self) -> &LendhubConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionStore {
        &mut self.session
    }

    pub fn gate(&self) -> &AccessGate {
        &self.gate
    }

    pub fn install(&self) -> &InstallNotifier {
        &self.install
    }

    pub fn install_mut(&mut self) -> &mut InstallNotifier {
        &mut self.install
    }
}
