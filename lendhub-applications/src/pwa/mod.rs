//! Progressive Web App lifecycle
//!
//! Installability, update availability, and the offline banner with its
//! queued-actions replay.

pub mod install;
pub mod queue;

pub use install::{Connectivity, InstallNotifier, InstallState, PendingUpdate};
pub use queue::{FlushReport, OfflineQueue, QueuedAction, PENDING_ACTIONS_KEY};
