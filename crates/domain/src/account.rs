//! User records the workflows attach carts and orders to.
//!
//! Credentials and token handling live in front of this crate; a user id
//! reaching the services is trusted as already authenticated.

use common::UserId;
use store::{NewUser, Store, StoreTx, User, constraints};

use crate::error::{DomainError, Result};

/// Service for registering and loading users.
pub struct AccountService<S: Store> {
    store: S,
}

impl<S: Store> AccountService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Registers a user. Emails are unique.
    #[tracing::instrument(skip(self))]
    pub async fn register(&self, user: NewUser) -> Result<User> {
        if !user.email.contains('@') {
            return Err(DomainError::Validation("Invalid email format".to_string()));
        }
        if user.first_name.trim().len() < 2 || user.last_name.trim().len() < 2 {
            return Err(DomainError::Validation(
                "Names must be at least 2 characters".to_string(),
            ));
        }

        let mut tx = self.store.begin().await?;
        let created = tx.insert_user(&user).await.map_err(|e| {
            if e.is_unique_violation(constraints::USER_EMAIL) {
                DomainError::Conflict("User with this email already exists".to_string())
            } else {
                DomainError::Unavailable(e)
            }
        })?;
        tx.commit().await?;

        tracing::info!(user_id = %created.id, "user registered");
        Ok(created)
    }

    /// Loads a user by id.
    pub async fn get(&self, user_id: UserId) -> Result<User> {
        let mut tx = self.store.begin().await?;
        tx.get_user(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", user_id))
    }
}

#[cfg(test)]
mod tests {
    use store::InMemoryStore;

    use super::*;

    fn ada() -> NewUser {
        NewUser {
            email: "ada@example.com".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
        }
    }

    #[tokio::test]
    async fn register_and_load() {
        let service = AccountService::new(InMemoryStore::new());
        let user = service.register(ada()).await.unwrap();
        assert_eq!(service.get(user.id).await.unwrap().email, "ada@example.com");
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let service = AccountService::new(InMemoryStore::new());
        service.register(ada()).await.unwrap();
        assert!(matches!(
            service.register(ada()).await,
            Err(DomainError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let service = AccountService::new(InMemoryStore::new());
        assert!(matches!(
            service.get(UserId::new()).await,
            Err(DomainError::NotFound { entity: "User", .. })
        ));
    }
}
