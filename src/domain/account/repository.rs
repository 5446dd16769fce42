use async_trait::async_trait;

use super::{Account, NewAccount, Profile};
use crate::shared::DomainResult;

/// Storage seam for accounts and profiles.
///
/// Handlers receive this as an injected trait object, so the HTTP layer
/// never talks to the database directly.
#[async_trait]
pub trait AccountRepositoryInterface: Send + Sync {
    /// Create the account and its profile in a single transaction.
    ///
    /// Either both records are committed or neither is; a unique-index
    /// violation on username or email surfaces as `DomainError::Conflict`.
    async fn register_account(&self, dto: NewAccount) -> DomainResult<Account>;

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Account>>;
    async fn find_by_username(&self, username: &str) -> DomainResult<Option<Account>>;
    async fn find_by_email(&self, email: &str) -> DomainResult<Option<Account>>;
    async fn count_accounts(&self) -> DomainResult<u64>;

    /// Fetch the account's profile, creating one with [`super::DEFAULT_ROLE`]
    /// when none exists yet. Idempotent apart from that first creation.
    async fn get_or_create_profile(&self, account_id: &str) -> DomainResult<Profile>;

    /// Update `last_login_at` after a successful login.
    async fn record_login(&self, id: &str) -> DomainResult<()>;
}
