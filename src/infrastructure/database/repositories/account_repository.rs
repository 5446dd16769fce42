use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set, TransactionTrait,
};

use crate::domain::account::{
    Account, AccountRepositoryInterface, NewAccount, Profile, DEFAULT_ROLE,
};
use crate::infrastructure::crypto::password::hash_password;
use crate::infrastructure::database::entities::{account, profile};
use crate::shared::{DomainError, DomainResult};

pub struct SeaOrmAccountRepository {
    db: DatabaseConnection,
}

impl SeaOrmAccountRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn account_model_to_domain(model: account::Model) -> Account {
    Account {
        id: model.id,
        username: model.username,
        email: model.email,
        password_hash: model.password_hash,
        is_active: model.is_active,
        created_at: model.created_at,
        updated_at: model.updated_at,
        last_login_at: model.last_login_at,
    }
}

fn profile_model_to_domain(model: profile::Model) -> Profile {
    Profile {
        id: model.id,
        account_id: model.account_id,
        role: model.role,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

fn db_err(e: sea_orm::DbErr) -> DomainError {
    DomainError::Storage(e.to_string())
}

fn is_unique_violation(e: &sea_orm::DbErr) -> bool {
    let msg = e.to_string();
    msg.contains("UNIQUE") || msg.contains("duplicate")
}

// ── Repository implementation ───────────────────────────────────

#[async_trait]
impl AccountRepositoryInterface for SeaOrmAccountRepository {
    async fn register_account(&self, dto: NewAccount) -> DomainResult<Account> {
        let now = Utc::now();
        let account_id = uuid::Uuid::new_v4().to_string();

        let password_hash = hash_password(&dto.password)
            .map_err(|e| DomainError::Validation(format!("Failed to hash password: {}", e)))?;

        let new_account = account::ActiveModel {
            id: Set(account_id.clone()),
            username: Set(dto.username),
            email: Set(dto.email),
            password_hash: Set(password_hash),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            last_login_at: Set(None),
        };

        let new_profile = profile::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            account_id: Set(account_id),
            role: Set(dto.role),
            created_at: Set(now),
            updated_at: Set(now),
        };

        // Both inserts commit together; a failed profile insert rolls back
        // the account as well.
        let model = self
            .db
            .transaction::<_, account::Model, sea_orm::DbErr>(|txn| {
                Box::pin(async move {
                    let model = new_account.insert(txn).await?;
                    new_profile.insert(txn).await?;
                    Ok(model)
                })
            })
            .await
            .map_err(|e| match e {
                sea_orm::TransactionError::Connection(e)
                | sea_orm::TransactionError::Transaction(e) => {
                    if is_unique_violation(&e) {
                        DomainError::Conflict("Username or email already exists".to_string())
                    } else {
                        db_err(e)
                    }
                }
            })?;

        Ok(account_model_to_domain(model))
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Account>> {
        let model = account::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(model.map(account_model_to_domain))
    }

    async fn find_by_username(&self, username: &str) -> DomainResult<Option<Account>> {
        let model = account::Entity::find()
            .filter(account::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(model.map(account_model_to_domain))
    }

    async fn find_by_email(&self, email: &str) -> DomainResult<Option<Account>> {
        let model = account::Entity::find()
            .filter(account::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(model.map(account_model_to_domain))
    }

    async fn count_accounts(&self) -> DomainResult<u64> {
        account::Entity::find().count(&self.db).await.map_err(db_err)
    }

    async fn get_or_create_profile(&self, account_id: &str) -> DomainResult<Profile> {
        let existing = profile::Entity::find()
            .filter(profile::Column::AccountId.eq(account_id))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        if let Some(model) = existing {
            return Ok(profile_model_to_domain(model));
        }

        let now = Utc::now();
        let new_profile = profile::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            account_id: Set(account_id.to_string()),
            role: Set(DEFAULT_ROLE.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        match new_profile.insert(&self.db).await {
            Ok(model) => Ok(profile_model_to_domain(model)),
            // A concurrent first read created the profile under us; the
            // unique index on account_id serialized the race. Fetch the winner.
            Err(e) if is_unique_violation(&e) => {
                let model = profile::Entity::find()
                    .filter(profile::Column::AccountId.eq(account_id))
                    .one(&self.db)
                    .await
                    .map_err(db_err)?;

                model
                    .map(profile_model_to_domain)
                    .ok_or_else(|| DomainError::NotFound {
                        entity: "Profile",
                        field: "account_id",
                        value: account_id.to_string(),
                    })
            }
            Err(e) => Err(db_err(e)),
        }
    }

    async fn record_login(&self, id: &str) -> DomainResult<()> {
        let existing = account::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        let Some(existing) = existing else {
            return Err(DomainError::NotFound {
                entity: "Account",
                field: "id",
                value: id.to_string(),
            });
        };

        let mut active: account::ActiveModel = existing.into();
        active.last_login_at = Set(Some(Utc::now()));
        active.update(&self.db).await.map_err(db_err)?;

        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::migrator::Migrator;
    use sea_orm::{ConnectOptions, Database};
    use sea_orm_migration::MigratorTrait;

    async fn test_repo() -> SeaOrmAccountRepository {
        let mut opts = ConnectOptions::new("sqlite::memory:");
        opts.max_connections(1);
        let db = Database::connect(opts).await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        SeaOrmAccountRepository::new(db)
    }

    fn alice() -> NewAccount {
        NewAccount {
            username: "alice".to_string(),
            email: "a@x.com".to_string(),
            password: "pw123".to_string(),
            role: "admin".to_string(),
        }
    }

    #[tokio::test]
    async fn register_creates_account_and_profile() {
        let repo = test_repo().await;

        let account = repo.register_account(alice()).await.unwrap();
        assert_eq!(account.username, "alice");
        assert_eq!(account.email, "a@x.com");
        // Secret is stored hashed, never as plaintext
        assert_ne!(account.password_hash, "pw123");

        let profile = repo.get_or_create_profile(&account.id).await.unwrap();
        assert_eq!(profile.role, "admin");
        assert_eq!(profile.account_id, account.id);
    }

    #[tokio::test]
    async fn duplicate_username_conflicts_and_leaves_single_record() {
        let repo = test_repo().await;
        repo.register_account(alice()).await.unwrap();

        let mut dup = alice();
        dup.email = "other@x.com".to_string();
        let err = repo.register_account(dup).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        assert_eq!(repo.count_accounts().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let repo = test_repo().await;
        repo.register_account(alice()).await.unwrap();

        let mut dup = alice();
        dup.username = "bob".to_string();
        let err = repo.register_account(dup).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn failed_profile_insert_rolls_back_account() {
        let repo = test_repo().await;
        let account = repo.register_account(alice()).await.unwrap();

        // Force the profile insert inside the transaction to fail by
        // colliding with the existing profile's unique account_id.
        let now = Utc::now();
        let orphan_account = account::ActiveModel {
            id: Set("acc-2".to_string()),
            username: Set("bob".to_string()),
            email: Set("b@x.com".to_string()),
            password_hash: Set("hash".to_string()),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            last_login_at: Set(None),
        };
        let colliding_profile = profile::ActiveModel {
            id: Set("prof-2".to_string()),
            account_id: Set(account.id.clone()),
            role: Set("user".to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let result = repo
            .db
            .transaction::<_, (), sea_orm::DbErr>(|txn| {
                Box::pin(async move {
                    orphan_account.insert(txn).await?;
                    colliding_profile.insert(txn).await?;
                    Ok(())
                })
            })
            .await;
        assert!(result.is_err());

        // The account insert was rolled back with the profile failure
        assert!(repo.find_by_username("bob").await.unwrap().is_none());
        assert_eq!(repo.count_accounts().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn missing_profile_is_created_with_default_role() {
        let repo = test_repo().await;

        // Insert an account without a profile, as if it predated the
        // profile table.
        let now = Utc::now();
        let bare = account::ActiveModel {
            id: Set("acc-bare".to_string()),
            username: Set("carol".to_string()),
            email: Set("c@x.com".to_string()),
            password_hash: Set("hash".to_string()),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            last_login_at: Set(None),
        };
        bare.insert(&repo.db).await.unwrap();

        let profile = repo.get_or_create_profile("acc-bare").await.unwrap();
        assert_eq!(profile.role, DEFAULT_ROLE);

        // Idempotent: the second read returns the same profile
        let again = repo.get_or_create_profile("acc-bare").await.unwrap();
        assert_eq!(again.id, profile.id);
        assert_eq!(again.role, DEFAULT_ROLE);
    }

    #[tokio::test]
    async fn record_login_sets_timestamp() {
        let repo = test_repo().await;
        let account = repo.register_account(alice()).await.unwrap();
        assert!(account.last_login_at.is_none());

        repo.record_login(&account.id).await.unwrap();

        let reloaded = repo.find_by_id(&account.id).await.unwrap().unwrap();
        assert!(reloaded.last_login_at.is_some());
    }

    #[tokio::test]
    async fn record_login_for_unknown_account_is_not_found() {
        let repo = test_repo().await;
        let err = repo.record_login("nope").await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }
}
