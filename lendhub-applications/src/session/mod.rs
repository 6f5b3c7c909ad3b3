//! Session Management Module
//!
//! The authenticated-user record, its persistence boundary and the store that
//! owns it.

pub mod clock;
pub mod errors;
pub mod manager;
pub mod storage;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use errors::{AuthError, StoredRecordError};
pub use manager::{SessionStore, DEMO_USER_NAME};
pub use storage::{Loaded, SessionStorage, CURRENT_USER_KEY, TOKEN_KEY, USERS_KEY};
pub use types::*;
