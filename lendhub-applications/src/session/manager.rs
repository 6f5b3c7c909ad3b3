//! Session Store - owns the authenticated user
//!
//! Login, registration, logout and role switching over [`SessionStorage`].
//! All mutation goes through `&mut self`; there is exactly one current record
//! or none.

use super::clock::{Clock, SystemClock};
use super::errors::AuthError;
use super::storage::{Loaded, SessionStorage};
use super::types::{AccountStatus, Credentials, SubscriptionStatus, UserDraft, UserRecord};
use crate::auth::{PermissionSet, Role};
use lendhub_core::{AuthConfig, KeyValueStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Display name given to accounts created by demo login
pub const DEMO_USER_NAME: &str = "Demo User";

/// Session store for one application context
pub struct SessionStore {
    storage: SessionStorage,
    config: AuthConfig,
    clock: Arc<dyn Clock>,
    current: Option<UserRecord>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("storage", &self.storage)
            .field("current", &self.current.as_ref().map(|u| &u.id))
            .finish()
    }
}

impl SessionStore {
    /// Create a store over `store` using the system clock. Nothing is read
    /// until [`initialize`](Self::initialize).
    pub fn new(store: Arc<dyn KeyValueStore>, config: AuthConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<dyn KeyValueStore>,
        config: AuthConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            storage: SessionStorage::new(store),
            config,
            clock,
            current: None,
        }
    }

    /// Load the persisted session into memory
    pub fn initialize(&mut self) -> Option<&UserRecord> {
        self.load_current();
        self.current.as_ref()
    }

    /// Re-read the persisted current user. Corrupt data is cleared and the
    /// session becomes unauthenticated.
    pub fn load_current(&mut self) -> Option<UserRecord> {
        self.current = match self.storage.load_current() {
            Loaded::Present(record) => Some(record),
            Loaded::Absent => None,
            Loaded::Cleared(e) => {
                info!("Discarded stored session: {}", e);
                None
            }
        };
        self.current.clone()
    }

    /// Sign in with phone, password and country.
    ///
    /// With `demo_auto_provision` enabled an unmatched login creates a demo
    /// borrower instead of failing.
    pub async fn login(&mut self, credentials: Credentials) -> Result<UserRecord, AuthError> {
        self.simulate_round_trip().await;

        let credentials = credentials.normalized();
        let users = self.storage.users();

        let matched = users.iter().find(|u| u.matches(&credentials)).cloned();
        let user = match matched {
            Some(user) => {
                if user.status == AccountStatus::Suspended {
                    warn!("Login refused for suspended account {}", user.id);
                    return Err(AuthError::AccountSuspended);
                }
                debug!("Credentials matched user {}", user.id);
                user
            }
            // A registered phone with the wrong password is never provisioned
            None if users
                .iter()
                .any(|u| u.phone == credentials.phone && u.country == credentials.country) =>
            {
                debug!("Wrong password for phone {}", credentials.phone);
                return Err(AuthError::InvalidCredentials);
            }
            None if self.config.demo_auto_provision => {
                self.provision_demo_user(&credentials, users)?
            }
            None => {
                debug!("No user matches phone {}", credentials.phone);
                return Err(AuthError::InvalidCredentials);
            }
        };

        self.establish(user.clone());
        info!("User {} signed in as {}", user.id, user.role);
        Ok(user)
    }

    /// Register a new account and make it current.
    ///
    /// Validation failures leave storage untouched. Failure to append to the
    /// user collection is returned; failure to persist the current record is
    /// only logged.
    pub async fn register(&mut self, draft: UserDraft, role: Role) -> Result<UserRecord, AuthError> {
        let draft = draft.validate(self.config.min_password_length)?;

        let mut users = self.storage.users();
        if users
            .iter()
            .any(|u| u.phone == draft.phone && u.country == draft.country)
        {
            return Err(AuthError::validation(
                "phone",
                "An account with this phone number already exists",
            ));
        }

        self.simulate_round_trip().await;

        let record = UserRecord::from_draft(draft, role, self.clock.now());
        users.push(record.clone());
        self.storage.save_users(&users)?;

        self.establish(record.clone());
        info!("Registered user {} as {}", record.id, record.role);
        Ok(record)
    }

    /// Clear the session. Always succeeds.
    pub fn logout(&mut self) {
        if let Some(user) = self.current.take() {
            info!("User {} signed out", user.id);
        }
        if let Err(e) = self.storage.clear_current() {
            warn!("Failed to clear stored session: {}", e);
        }
        if let Err(e) = self.storage.clear_token() {
            warn!("Failed to clear session token: {}", e);
        }
    }

    /// Switch the current user to another role
    pub fn switch_role(&mut self, role_name: &str) -> Result<UserRecord, AuthError> {
        let role: Role = role_name
            .parse()
            .map_err(|_| AuthError::InvalidRole(role_name.to_string()))?;
        let now = self.clock.now();

        let user = self.current.as_mut().ok_or(AuthError::NotAuthenticated)?;
        if user.role == role {
            return Ok(user.clone());
        }

        let previous = user.role;
        user.role = role;
        user.apply_role_defaults(now);
        info!("User {} switched role {} -> {}", user.id, previous, role);

        let updated = user.clone();
        self.persist_current(&updated);
        self.update_registered(&updated);
        Ok(updated)
    }

    /// Change the status of a registered account. Requires `can_manage_users`.
    pub fn set_account_status(
        &mut self,
        user_id: &str,
        status: AccountStatus,
    ) -> Result<UserRecord, AuthError> {
        let role = self.current_role().ok_or(AuthError::NotAuthenticated)?;
        if !PermissionSet::for_role(role).can_manage_users {
            return Err(AuthError::Forbidden);
        }

        let mut users = self.storage.users();
        let entry = users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| AuthError::UnknownUser(user_id.to_string()))?;
        entry.status = status;
        let updated = entry.clone();
        self.storage.save_users(&users)?;

        if let Some(current) = self.current.as_mut().filter(|u| u.id == user_id) {
            current.status = status;
            let current = current.clone();
            self.persist_current(&current);
        }

        info!("Account {} set to {}", user_id, status);
        Ok(updated)
    }

    pub fn current(&self) -> Option<&UserRecord> {
        self.current.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.is_some()
    }

    pub fn current_role(&self) -> Option<Role> {
        self.current.as_ref().map(|u| u.role)
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.current_role() == Some(role)
    }

    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        self.current_role().is_some_and(|r| roles.contains(&r))
    }

    /// Subscription status of the current lender
    pub fn subscription_status(&self) -> Option<SubscriptionStatus> {
        self.current
            .as_ref()
            .and_then(|u| u.subscription_status(self.clock.now()))
    }

    /// Opaque token of the current session
    pub fn token(&self) -> Option<String> {
        self.storage.token()
    }

    /// Registered users known to this store
    pub fn registered_users(&self) -> Vec<UserRecord> {
        self.storage.users()
    }

    pub fn storage(&self) -> &SessionStorage {
        &self.storage
    }

    /// Create a demo borrower from login credentials. Phone and country go
    /// through registration validation; the password length rule does not
    /// apply.
    fn provision_demo_user(
        &self,
        credentials: &Credentials,
        mut users: Vec<UserRecord>,
    ) -> Result<UserRecord, AuthError> {
        let draft = UserDraft {
            full_name: DEMO_USER_NAME.to_string(),
            phone: credentials.phone.clone(),
            country: credentials.country.clone(),
            password: credentials.password.clone(),
            email: None,
        }
        .validate(0)?;
        let record = UserRecord::from_draft(draft, Role::Borrower, self.clock.now());

        users.push(record.clone());
        self.storage.save_users(&users)?;

        info!("Provisioned demo borrower {}", record.id);
        Ok(record)
    }

    fn establish(&mut self, user: UserRecord) {
        self.persist_current(&user);
        let token = uuid::Uuid::new_v4().simple().to_string();
        if let Err(e) = self.storage.save_token(&token) {
            warn!("Failed to store session token: {}", e);
        }
        self.current = Some(user);
    }

    fn persist_current(&self, user: &UserRecord) {
        if let Err(e) = self.storage.save_current(user) {
            warn!(
                "Failed to persist current user {}, continuing in memory: {}",
                user.id, e
            );
        }
    }

    fn update_registered(&self, user: &UserRecord) {
        let mut users = self.storage.users();
        let Some(entry) = users.iter_mut().find(|u| u.id == user.id) else {
            return;
        };
        *entry = user.clone();
        if let Err(e) = self.storage.save_users(&users) {
            warn!("Failed to update registered user {}: {}", user.id, e);
        }
    }

    async fn simulate_round_trip(&self) {
        if self.config.simulated_latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.simulated_latency_ms)).await;
        }
    }
}
