//! Permission System
//!
//! Static role→capability table. The table is compiled in and cannot be
//! edited at runtime.

use super::Role;
use serde::{Deserialize, Serialize};

/// Named capability flags that can be granted to a role
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum Capability {
    /// Request loans
    Borrow,
    /// Fund loans
    Lend,
    /// Join savings/lending groups
    JoinGroups,
    /// Start a new group
    CreateGroup,
    /// Read the platform ledger
    ViewLedger,
    /// Open the administration panel
    AdminAccess,
    /// Suspend, reactivate and re-role users
    ManageUsers,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::Borrow => write!(f, "can_borrow"),
            Capability::Lend => write!(f, "can_lend"),
            Capability::JoinGroups => write!(f, "can_join_groups"),
            Capability::CreateGroup => write!(f, "can_create_group"),
            Capability::ViewLedger => write!(f, "can_view_ledger"),
            Capability::AdminAccess => write!(f, "admin_access"),
            Capability::ManageUsers => write!(f, "can_manage_users"),
        }
    }
}

/// Capability flags for one role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
    pub can_borrow: bool,
    pub can_lend: bool,
    pub can_join_groups: bool,
    pub can_create_group: bool,
    pub can_view_ledger: bool,
    pub admin_access: bool,
    pub can_manage_users: bool,
    /// Group membership cap; `None` means unlimited
    pub max_groups: Option<u32>,
}

impl PermissionSet {
    /// No capabilities at all (unauthenticated or unknown role)
    pub const EMPTY: PermissionSet = PermissionSet {
        can_borrow: false,
        can_lend: false,
        can_join_groups: false,
        can_create_group: false,
        can_view_ledger: false,
        admin_access: false,
        can_manage_users: false,
        max_groups: Some(0),
    };

    const BORROWER: PermissionSet = PermissionSet {
        can_borrow: true,
        can_lend: false,
        can_join_groups: true,
        can_create_group: false,
        can_view_ledger: false,
        admin_access: false,
        can_manage_users: false,
        max_groups: Some(4),
    };

    const LENDER: PermissionSet = PermissionSet {
        can_borrow: false,
        can_lend: true,
        can_join_groups: true,
        can_create_group: true,
        can_view_ledger: true,
        admin_access: false,
        can_manage_users: false,
        max_groups: None,
    };

    const ADMIN: PermissionSet = PermissionSet {
        can_borrow: true,
        can_lend: true,
        can_join_groups: true,
        can_create_group: true,
        can_view_ledger: true,
        admin_access: true,
        can_manage_users: true,
        max_groups: None,
    };

    /// Table lookup for a known role
    pub const fn for_role(role: Role) -> PermissionSet {
        match role {
            Role::Borrower => Self::BORROWER,
            Role::Lender => Self::LENDER,
            Role::Admin => Self::ADMIN,
        }
    }

    /// Check a single capability flag
    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::Borrow => self.can_borrow,
            Capability::Lend => self.can_lend,
            Capability::JoinGroups => self.can_join_groups,
            Capability::CreateGroup => self.can_create_group,
            Capability::ViewLedger => self.can_view_ledger,
            Capability::AdminAccess => self.admin_access,
            Capability::ManageUsers => self.can_manage_users,
        }
    }

    /// Granted capabilities, in declaration order
    pub fn capabilities(&self) -> Vec<Capability> {
        [
            Capability::Borrow,
            Capability::Lend,
            Capability::JoinGroups,
            Capability::CreateGroup,
            Capability::ViewLedger,
            Capability::AdminAccess,
            Capability::ManageUsers,
        ]
        .into_iter()
        .filter(|c| self.allows(*c))
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities().is_empty()
    }

    /// Whether one more group can be joined with `current_count` memberships
    pub fn has_group_capacity(&self, current_count: u32) -> bool {
        if !self.can_join_groups {
            return false;
        }
        match self.max_groups {
            None => true,
            Some(max) => current_count < max,
        }
    }

    /// Short summary for logging
    pub fn summary(&self) -> String {
        let caps: Vec<String> = self.capabilities().iter().map(|c| c.to_string()).collect();
        let groups = match self.max_groups {
            Some(max) => max.to_string(),
            None => "unlimited".to_string(),
        };
        format!("[{}] max_groups={}", caps.join(", "), groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_role_has_non_empty_permissions() {
        for role in Role::ALL {
            assert!(!PermissionSet::for_role(role).is_empty(), "{} is empty", role);
        }
        assert!(PermissionSet::EMPTY.is_empty());
    }

    #[test]
    fn test_documented_table() {
        let borrower = PermissionSet::for_role(Role::Borrower);
        assert!(borrower.can_borrow && !borrower.can_lend && !borrower.can_create_group);
        assert_eq!(borrower.max_groups, Some(4));

        let lender = PermissionSet::for_role(Role::Lender);
        assert!(lender.can_lend && lender.can_create_group && lender.can_view_ledger);
        assert!(!lender.admin_access);
        assert_eq!(lender.max_groups, None);

        let admin = PermissionSet::for_role(Role::Admin);
        assert_eq!(admin.capabilities().len(), 7);
    }

    #[test]
    fn test_group_capacity() {
        let borrower = PermissionSet::for_role(Role::Borrower);
        assert!(borrower.has_group_capacity(3));
        assert!(!borrower.has_group_capacity(4));

        let lender = PermissionSet::for_role(Role::Lender);
        assert!(lender.has_group_capacity(10_000));

        assert!(!PermissionSet::EMPTY.has_group_capacity(0));
    }

    #[test]
    fn test_summary_lists_flags() {
        let summary = PermissionSet::for_role(Role::Borrower).summary();
        assert_eq!(summary, "[can_borrow, can_join_groups] max_groups=4");
    }
}
