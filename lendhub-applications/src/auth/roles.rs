//! Role definitions
//!
//! The closed set of principals a session can act as.

use serde::{Deserialize, Serialize};

/// Role of a registered user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Member who borrows through groups
    Borrower,
    /// Subscriber who funds loans
    Lender,
    /// Platform operator
    Admin,
}

impl Role {
    /// Every role, in display order
    pub const ALL: [Role; 3] = [Role::Borrower, Role::Lender, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Borrower => "borrower",
            Role::Lender => "lender",
            Role::Admin => "admin",
        }
    }

    /// Human-readable label for menus and greetings
    pub fn label(&self) -> &'static str {
        match self {
            Role::Borrower => "Borrower",
            Role::Lender => "Lender",
            Role::Admin => "Administrator",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected role name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

impl std::str::FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "borrower" => Ok(Role::Borrower),
            "lender" => Ok(Role::Lender),
            "admin" => Ok(Role::Admin),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("Lender".parse::<Role>().unwrap(), Role::Lender);
        assert_eq!(" admin ".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(
            "guest".parse::<Role>().unwrap_err(),
            UnknownRole("guest".to_string())
        );
    }

    #[test]
    fn test_serde_uses_lowercase_names() {
        assert_eq!(serde_json::to_string(&Role::Borrower).unwrap(), "\"borrower\"");
        assert!(serde_json::from_str::<Role>("\"superuser\"").is_err());
    }
}
