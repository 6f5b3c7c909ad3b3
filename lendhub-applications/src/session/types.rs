//! Session Types and Structures
//!
//! The persisted user record, registration drafts, credentials and the
//! derived subscription status.

use super::errors::{AuthError, StoredRecordError};
use crate::auth::Role;
use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Days before expiry at which a subscription counts as expiring soon
pub const EXPIRING_SOON_DAYS: i64 = 7;

/// Rating assigned to newly registered borrowers
pub const DEFAULT_BORROWER_RATING: u8 = 5;

/// Account lifecycle tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Suspended,
    PendingVerification,
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountStatus::Active => write!(f, "active"),
            AccountStatus::Suspended => write!(f, "suspended"),
            AccountStatus::PendingVerification => write!(f, "pending_verification"),
        }
    }
}

/// One registered principal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Opaque identifier assigned at registration
    pub id: String,
    pub full_name: String,
    pub phone: String,
    /// ISO 3166-1 alpha-2 code
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Stored as entered; never hashed
    pub password: String,
    pub role: Role,
    pub status: AccountStatus,
    #[serde(default)]
    pub rating: Option<u8>,
    /// Local wall-clock instant the lender subscription lapses
    #[serde(default)]
    pub subscription_expiry: Option<NaiveDateTime>,
    pub registered_at: DateTime<Utc>,
}

impl UserRecord {
    /// Build a fresh record from a validated draft
    pub fn from_draft(draft: UserDraft, role: Role, now: DateTime<Local>) -> Self {
        let mut record = Self {
            id: uuid::Uuid::new_v4().to_string(),
            full_name: draft.full_name,
            phone: draft.phone,
            country: draft.country,
            email: draft.email,
            password: draft.password,
            role,
            status: AccountStatus::Active,
            rating: None,
            subscription_expiry: None,
            registered_at: now.with_timezone(&Utc),
        };
        record.apply_role_defaults(now);
        record
    }

    /// Fill role-dependent fields: borrower rating and lender expiry.
    /// A non-lender never carries a subscription.
    pub fn apply_role_defaults(&mut self, now: DateTime<Local>) {
        match self.role {
            Role::Lender => {
                if self.subscription_expiry.is_none() {
                    self.subscription_expiry = Some(subscription_expiry_after(now.naive_local()));
                }
            }
            Role::Borrower => {
                self.subscription_expiry = None;
                if self.rating.is_none() {
                    self.rating = Some(DEFAULT_BORROWER_RATING);
                }
            }
            Role::Admin => {
                self.subscription_expiry = None;
            }
        }
    }

    /// Parse and validate a persisted record
    pub fn parse(raw: &str) -> Result<Self, StoredRecordError> {
        let record: UserRecord = serde_json::from_str(raw)?;
        record.check_stored()?;
        Ok(record)
    }

    /// Parse and validate a persisted collection; one bad entry rejects it all
    pub fn parse_collection(raw: &str) -> Result<Vec<Self>, StoredRecordError> {
        let records: Vec<UserRecord> = serde_json::from_str(raw)?;
        for record in &records {
            record.check_stored()?;
        }
        Ok(records)
    }

    fn check_stored(&self) -> Result<(), StoredRecordError> {
        let required = [
            ("id", &self.id),
            ("phone", &self.phone),
            ("country", &self.country),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(StoredRecordError::Invalid {
                    field,
                    reason: "must not be empty".to_string(),
                });
            }
        }

        if self.role != Role::Lender && self.subscription_expiry.is_some() {
            return Err(StoredRecordError::Invalid {
                field: "subscriptionExpiry",
                reason: format!("only lenders carry a subscription, found role {}", self.role),
            });
        }

        Ok(())
    }

    /// Exact match on normalized credentials
    pub fn matches(&self, credentials: &Credentials) -> bool {
        self.phone == credentials.phone
            && self.country == credentials.country
            && self.password == credentials.password
    }

    /// Subscription status at `now`; `None` unless this is a lender with an expiry
    pub fn subscription_status(&self, now: DateTime<Local>) -> Option<SubscriptionStatus> {
        if self.role != Role::Lender {
            return None;
        }
        self.subscription_expiry
            .map(|expiry| SubscriptionStatus::compute(expiry, now.naive_local()))
    }

    /// First name for greetings
    pub fn first_name(&self) -> &str {
        self.full_name
            .split_whitespace()
            .next()
            .unwrap_or(&self.full_name)
    }
}

/// Expiry for a subscription started at `now`: 00:00 on the 28th of the next month
pub fn subscription_expiry_after(now: NaiveDateTime) -> NaiveDateTime {
    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };

    // Day 28 exists in every month; MAX only guards years outside chrono's range
    NaiveDate::from_ymd_opt(year, month, 28)
        .unwrap_or(NaiveDate::MAX)
        .and_time(NaiveTime::MIN)
}

/// Derived view of a lender subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    /// Whole days left, rounded up; zero or negative once lapsed
    pub days_remaining: i64,
    pub is_expired: bool,
    pub is_expiring_soon: bool,
}

impl SubscriptionStatus {
    pub fn compute(expiry: NaiveDateTime, now: NaiveDateTime) -> Self {
        let millis = (expiry - now).num_milliseconds();
        let mut days = millis / MILLIS_PER_DAY;
        if millis % MILLIS_PER_DAY > 0 {
            days += 1;
        }
        Self::from_days(days)
    }

    pub fn from_days(days_remaining: i64) -> Self {
        Self {
            days_remaining,
            is_expired: days_remaining <= 0,
            is_expiring_soon: days_remaining > 0 && days_remaining <= EXPIRING_SOON_DAYS,
        }
    }
}

/// Registration form input
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserDraft {
    pub full_name: String,
    pub phone: String,
    pub country: String,
    pub password: String,
    pub email: Option<String>,
}

fn phone_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\+?[0-9]{7,15}$").expect("valid phone regex"))
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[A-Za-z]{2,}$").expect("valid email regex")
    })
}

/// Strip the separators people type into phone numbers
pub fn normalize_phone(phone: &str) -> String {
    phone
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
        .collect()
}

pub fn normalize_country(country: &str) -> String {
    country.trim().to_uppercase()
}

impl UserDraft {
    /// Check every field and return the normalized draft.
    pub fn validate(self, min_password_length: usize) -> Result<UserDraft, AuthError> {
        let full_name = self.full_name.trim().to_string();
        if full_name.is_empty() {
            return Err(AuthError::validation("full_name", "Full name is required"));
        }

        let phone = normalize_phone(&self.phone);
        if phone.is_empty() {
            return Err(AuthError::validation("phone", "Phone number is required"));
        }
        if !phone_pattern().is_match(&phone) {
            return Err(AuthError::validation(
                "phone",
                "Phone number must be 7 to 15 digits, optionally starting with +",
            ));
        }

        let country = normalize_country(&self.country);
        if country.len() != 2 || !country.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(AuthError::validation(
                "country",
                "Country must be a two-letter code such as GH",
            ));
        }

        if self.password.chars().count() < min_password_length {
            return Err(AuthError::validation(
                "password",
                format!(
                    "Password must be at least {} characters",
                    min_password_length
                ),
            ));
        }

        let email = match self.email.map(|e| e.trim().to_string()) {
            Some(email) if email.is_empty() => None,
            Some(email) if !email_pattern().is_match(&email) => {
                return Err(AuthError::validation("email", "Email address is not valid"));
            }
            other => other,
        };

        Ok(UserDraft {
            full_name,
            phone,
            country,
            password: self.password,
            email,
        })
    }
}

/// Login form input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub phone: String,
    pub password: String,
    pub country: String,
}

impl Credentials {
    pub fn new<P: Into<String>, W: Into<String>, C: Into<String>>(
        phone: P,
        password: W,
        country: C,
    ) -> Self {
        Self {
            phone: phone.into(),
            password: password.into(),
            country: country.into(),
        }
    }

    /// Same separator stripping and casing as registration
    pub fn normalized(&self) -> Self {
        Self {
            phone: normalize_phone(&self.phone),
            password: self.password.clone(),
            country: normalize_country(&self.country),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn draft() -> UserDraft {
        UserDraft {
            full_name: "Ama K".to_string(),
            phone: "+233201234567".to_string(),
            country: "GH".to_string(),
            password: "secret1".to_string(),
            email: None,
        }
    }

    #[test]
    fn test_expiry_is_28th_of_next_month() {
        let jan = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        assert_eq!(
            subscription_expiry_after(jan),
            NaiveDate::from_ymd_opt(2024, 2, 28)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );

        let dec = NaiveDate::from_ymd_opt(2024, 12, 31)
            .unwrap()
            .and_hms_opt(23, 59, 0)
            .unwrap();
        assert_eq!(
            subscription_expiry_after(dec).date(),
            NaiveDate::from_ymd_opt(2025, 1, 28).unwrap()
        );
    }

    #[test]
    fn test_subscription_math() {
        let now = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();

        let status = SubscriptionStatus::compute(now + Duration::days(5), now);
        assert_eq!(status.days_remaining, 5);
        assert!(status.is_expiring_soon);
        assert!(!status.is_expired);

        // Partial days round up
        let status = SubscriptionStatus::compute(now + Duration::hours(7 * 24 + 1), now);
        assert_eq!(status.days_remaining, 8);
        assert!(!status.is_expiring_soon);

        let status = SubscriptionStatus::compute(now - Duration::hours(30), now);
        assert_eq!(status.days_remaining, -1);
        assert!(status.is_expired);
        assert!(!status.is_expiring_soon);
    }

    #[test]
    fn test_validate_normalizes_fields() {
        let mut input = draft();
        input.phone = "+233 20-123-4567".to_string();
        input.country = " gh ".to_string();
        input.email = Some("  ".to_string());

        let valid = input.validate(6).unwrap();
        assert_eq!(valid.phone, "+233201234567");
        assert_eq!(valid.country, "GH");
        assert_eq!(valid.email, None);
    }

    #[test]
    fn test_validate_reports_field() {
        let cases = [
            (UserDraft { full_name: " ".into(), ..draft() }, "full_name"),
            (UserDraft { phone: "12ab".into(), ..draft() }, "phone"),
            (UserDraft { country: "GHA".into(), ..draft() }, "country"),
            (UserDraft { password: "123".into(), ..draft() }, "password"),
            (UserDraft { email: Some("ama@".into()), ..draft() }, "email"),
        ];

        for (input, field) in cases {
            let err = input.validate(6).unwrap_err();
            assert_eq!(err.field(), Some(field));
        }
    }

    #[test]
    fn test_parse_rejects_subscription_on_borrower() {
        let now = Local.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        let mut record = UserRecord::from_draft(draft(), Role::Borrower, now);
        record.subscription_expiry = Some(now.naive_local());

        let raw = serde_json::to_string(&record).unwrap();
        assert!(matches!(
            UserRecord::parse(&raw),
            Err(StoredRecordError::Invalid {
                field: "subscriptionExpiry",
                ..
            })
        ));
    }

    #[test]
    fn test_parse_rejects_unknown_role() {
        let raw = r#"{"id":"1","fullName":"X","phone":"+2331234567","country":"GH",
            "password":"pw","role":"superuser","status":"active",
            "registeredAt":"2024-01-15T10:00:00Z"}"#;
        assert!(matches!(
            UserRecord::parse(raw),
            Err(StoredRecordError::Malformed(_))
        ));
    }

    #[test]
    fn test_first_name() {
        let now = Local.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        let record = UserRecord::from_draft(draft(), Role::Borrower, now);
        assert_eq!(record.first_name(), "Ama");
        assert_eq!(record.rating, Some(DEFAULT_BORROWER_RATING));
    }
}
