use chrono::{DateTime, Utc};

/// Role assigned when a profile is created implicitly at read time.
pub const DEFAULT_ROLE: &str = "user";

/// A registered user identity with credentials.
#[derive(Clone, Debug)]
pub struct Account {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Supplementary per-account data holding the role. At most one per account.
#[derive(Clone, Debug)]
pub struct Profile {
    pub id: String,
    pub account_id: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
