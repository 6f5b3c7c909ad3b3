//! Access Control Gate
//!
//! Maps protected pages to the roles allowed to view them and turns a
//! `(page, role)` pair into a single [`Decision`].

use super::{PermissionSet, Role};
use crate::session::SubscriptionStatus;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Protected views of the site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    BorrowerDashboard,
    LenderDashboard,
    AdminDashboard,
    Groups,
    Loans,
    Ledger,
    Lending,
    Subscription,
    Profile,
    Users,
}

impl Page {
    /// Every protected page, in menu order
    pub const ALL: [Page; 10] = [
        Page::BorrowerDashboard,
        Page::LenderDashboard,
        Page::AdminDashboard,
        Page::Groups,
        Page::Loans,
        Page::Lending,
        Page::Ledger,
        Page::Subscription,
        Page::Users,
        Page::Profile,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            Page::BorrowerDashboard => "borrower-dashboard.html",
            Page::LenderDashboard => "lender-dashboard.html",
            Page::AdminDashboard => "admin-dashboard.html",
            Page::Groups => "groups.html",
            Page::Loans => "loans.html",
            Page::Ledger => "ledger.html",
            Page::Lending => "lending.html",
            Page::Subscription => "subscription.html",
            Page::Profile => "profile.html",
            Page::Users => "users.html",
        }
    }

    /// Resolve a path such as `/app/ledger.html?tab=2` to a page.
    /// Returns `None` for pages the gate does not know.
    pub fn from_path(path: &str) -> Option<Page> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let name = path.rsplit('/').next().unwrap_or_default().to_lowercase();
        let stem = name.strip_suffix(".html").unwrap_or(&name);

        Page::ALL
            .into_iter()
            .find(|page| page.file_name().strip_suffix(".html") == Some(stem))
    }

    /// Roles allowed to view this page
    pub const fn allowed_roles(&self) -> &'static [Role] {
        use Role::*;

        match self {
            Page::BorrowerDashboard => &[Borrower, Admin],
            Page::LenderDashboard => &[Lender, Admin],
            Page::AdminDashboard => &[Admin],
            Page::Groups => &[Borrower, Lender, Admin],
            Page::Loans => &[Borrower, Lender, Admin],
            Page::Ledger => &[Lender, Admin],
            Page::Lending => &[Lender, Admin],
            Page::Subscription => &[Lender, Admin],
            Page::Profile => &[Borrower, Lender, Admin],
            Page::Users => &[Admin],
        }
    }

    /// Landing page for a role
    pub const fn dashboard_for(role: Role) -> Page {
        match role {
            Role::Borrower => Page::BorrowerDashboard,
            Role::Lender => Page::LenderDashboard,
            Role::Admin => Page::AdminDashboard,
        }
    }
}

impl std::fmt::Display for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Where the host should navigate after a denied view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redirect {
    /// Entry page for unauthenticated visitors
    Login,
    Page(Page),
}

impl Redirect {
    pub fn target(&self) -> &'static str {
        match self {
            Redirect::Login => "login.html",
            Redirect::Page(page) => page.file_name(),
        }
    }
}

impl std::fmt::Display for Redirect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.target())
    }
}

/// Navigation sink
pub trait Navigator: Send + Sync {
    fn redirect(&self, target: Redirect);
}

/// Outcome of a page view check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Allow,
    DenyUnauthenticated,
    DenyForbidden,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Redirect implied by this decision for the given session role
    pub fn redirect(&self, role: Option<Role>) -> Option<Redirect> {
        match (self, role) {
            (Decision::Allow, _) => None,
            (Decision::DenyUnauthenticated, _) | (Decision::DenyForbidden, None) => {
                Some(Redirect::Login)
            }
            (Decision::DenyForbidden, Some(role)) => {
                Some(Redirect::Page(Page::dashboard_for(role)))
            }
        }
    }
}

/// UI controls to expose for the current session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Affordances {
    pub show_lend_button: bool,
    pub show_borrow_button: bool,
    pub show_create_group: bool,
    pub show_ledger_link: bool,
    pub show_admin_panel: bool,
    /// Demo role switcher, offered to every signed-in user
    pub show_role_switcher: bool,
    /// Expired or expiring-soon subscription banner
    pub show_subscription_warning: bool,
}

/// Stateless authorization over the static permission and page tables
#[derive(Debug, Default, Clone, Copy)]
pub struct AccessGate;

impl AccessGate {
    pub fn new() -> Self {
        Self
    }

    /// Permission flags for a role; absent role yields the empty set
    pub fn permissions_for(&self, role: Option<Role>) -> PermissionSet {
        match role {
            Some(role) => PermissionSet::for_role(role),
            None => PermissionSet::EMPTY,
        }
    }

    /// Permission flags for a role name; unknown names yield the empty set
    pub fn permissions_for_name(&self, role: &str) -> PermissionSet {
        self.permissions_for(role.parse().ok())
    }

    pub fn allowed_roles(&self, page: Page) -> &'static [Role] {
        page.allowed_roles()
    }

    pub fn can_access(&self, page: Page, role: Option<Role>) -> bool {
        match role {
            Some(role) => page.allowed_roles().contains(&role),
            None => false,
        }
    }

    /// Decide whether `role` may view `page`
    pub fn authorize(&self, page: Page, role: Option<Role>) -> Decision {
        let decision = match role {
            None => Decision::DenyUnauthenticated,
            Some(role) if page.allowed_roles().contains(&role) => Decision::Allow,
            Some(_) => Decision::DenyForbidden,
        };
        debug!(page = %page, role = ?role, decision = ?decision, "Page authorization");
        decision
    }

    /// Like [`authorize`](Self::authorize) for a raw path. Unknown pages have
    /// an empty allow-list.
    pub fn authorize_path(&self, path: &str, role: Option<Role>) -> Decision {
        match (Page::from_path(path), role) {
            (Some(page), _) => self.authorize(page, role),
            (None, None) => Decision::DenyUnauthenticated,
            (None, Some(_)) => {
                debug!(path, "Unknown page denied");
                Decision::DenyForbidden
            }
        }
    }

    pub fn can_join_more_groups(&self, role: Role, current_count: u32) -> bool {
        PermissionSet::for_role(role).has_group_capacity(current_count)
    }

    /// Lending eligibility. A lender is refused only once the
    /// subscription has lapsed; no status at all does not block lending.
    pub fn can_lend(&self, role: Role, subscription: Option<&SubscriptionStatus>) -> bool {
        if !PermissionSet::for_role(role).can_lend {
            return false;
        }
        match role {
            Role::Lender => !subscription.is_some_and(|status| status.is_expired),
            _ => true,
        }
    }

    /// Pages reachable from the menu for `role`
    pub fn navigation(&self, role: Option<Role>) -> Vec<Page> {
        Page::ALL
            .into_iter()
            .filter(|page| self.can_access(*page, role))
            .collect()
    }

    pub fn affordances(
        &self,
        role: Option<Role>,
        subscription: Option<&SubscriptionStatus>,
    ) -> Affordances {
        let Some(role) = role else {
            return Affordances::default();
        };
        let permissions = PermissionSet::for_role(role);

        Affordances {
            show_lend_button: self.can_lend(role, subscription),
            show_borrow_button: permissions.can_borrow,
            show_create_group: permissions.can_create_group,
            show_ledger_link: permissions.can_view_ledger,
            show_admin_panel: permissions.admin_access,
            show_role_switcher: true,
            show_subscription_warning: subscription
                .is_some_and(|status| status.is_expired || status.is_expiring_soon),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(days_remaining: i64) -> SubscriptionStatus {
        SubscriptionStatus::from_days(days_remaining)
    }

    #[test]
    fn test_authorize_is_total() {
        let gate = AccessGate::new();
        let roles = [None, Some(Role::Borrower), Some(Role::Lender), Some(Role::Admin)];

        for page in Page::ALL {
            for role in roles {
                let decision = gate.authorize(page, role);
                assert_eq!(decision == Decision::Allow, gate.can_access(page, role));
                if role.is_none() {
                    assert_eq!(decision, Decision::DenyUnauthenticated);
                }
            }
        }
    }

    #[test]
    fn test_borrower_forbidden_from_ledger() {
        let gate = AccessGate::new();
        let decision = gate.authorize_path("ledger.html", Some(Role::Borrower));
        assert_eq!(decision, Decision::DenyForbidden);
        assert_eq!(
            decision.redirect(Some(Role::Borrower)),
            Some(Redirect::Page(Page::BorrowerDashboard))
        );
    }

    #[test]
    fn test_unknown_page_denies_everyone() {
        let gate = AccessGate::new();
        assert_eq!(
            gate.authorize_path("secret.html", Some(Role::Admin)),
            Decision::DenyForbidden
        );
        assert_eq!(
            gate.authorize_path("secret.html", None),
            Decision::DenyUnauthenticated
        );
    }

    #[test]
    fn test_page_from_path_variants() {
        assert_eq!(Page::from_path("ledger.html"), Some(Page::Ledger));
        assert_eq!(Page::from_path("/app/Ledger.html?x=1"), Some(Page::Ledger));
        assert_eq!(Page::from_path("groups#top"), Some(Page::Groups));
        assert_eq!(Page::from_path("index.html"), None);
        assert_eq!(Page::from_path(""), None);
    }

    #[test]
    fn test_every_role_can_reach_its_dashboard() {
        let gate = AccessGate::new();
        for role in Role::ALL {
            assert!(gate.can_access(Page::dashboard_for(role), Some(role)));
        }
    }

    #[test]
    fn test_permissions_for_unknown_name_is_empty() {
        let gate = AccessGate::new();
        assert!(gate.permissions_for_name("guest").is_empty());
        assert!(gate.permissions_for(None).is_empty());
        assert!(gate.permissions_for_name("LENDER").can_lend);
    }

    #[test]
    fn test_group_limit() {
        let gate = AccessGate::new();
        assert!(!gate.can_join_more_groups(Role::Borrower, 4));
        assert!(gate.can_join_more_groups(Role::Borrower, 3));
        assert!(gate.can_join_more_groups(Role::Admin, 400));
    }

    #[test]
    fn test_can_lend_refuses_only_lapsed_lenders() {
        let gate = AccessGate::new();
        assert!(!gate.can_lend(Role::Borrower, Some(&status(30))));
        assert!(gate.can_lend(Role::Lender, Some(&status(3))));
        assert!(!gate.can_lend(Role::Lender, Some(&status(0))));
        assert!(gate.can_lend(Role::Lender, None));
        assert!(gate.can_lend(Role::Admin, None));
    }

    #[test]
    fn test_affordances() {
        let gate = AccessGate::new();
        assert_eq!(gate.affordances(None, None), Affordances::default());

        let lender = gate.affordances(Some(Role::Lender), Some(&status(2)));
        assert!(lender.show_lend_button);
        assert!(lender.show_subscription_warning);
        assert!(!lender.show_admin_panel);

        let borrower = gate.affordances(Some(Role::Borrower), None);
        assert!(borrower.show_borrow_button);
        assert!(!borrower.show_lend_button);
        assert!(!borrower.show_ledger_link);
    }

    #[test]
    fn test_navigation_menu() {
        let gate = AccessGate::new();
        assert!(gate.navigation(None).is_empty());
        assert_eq!(gate.navigation(Some(Role::Admin)).len(), Page::ALL.len());

        let borrower_menu = gate.navigation(Some(Role::Borrower));
        assert_eq!(
            borrower_menu,
            vec![Page::BorrowerDashboard, Page::Groups, Page::Loans, Page::Profile]
        );
    }
}
