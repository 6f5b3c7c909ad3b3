//! Authorization Module
//!
//! Static role and page tables plus the gate that evaluates them:
//! - `roles`: the closed set of roles
//! - `permissions`: role → capability flags
//! - `access`: page → allowed roles, decisions, redirects and UI affordances

pub mod access;
pub mod permissions;
pub mod roles;

pub use access::{AccessGate, Affordances, Decision, Navigator, Page, Redirect};
pub use permissions::{Capability, PermissionSet};
pub use roles::{Role, UnknownRole};
