use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::password::{hash_password, verify_password};
use crate::store::{unique_id, StoreError};

/// Identity record held by the hosted auth service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthIdentity {
    #[serde(rename(deserialize = "$id"))]
    pub id: String,
    pub email: String,
    pub name: String,
}

/// A hosted auth session; lives from login until logout.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AccountSession {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
}

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Email already registered")]
    EmailTaken,
    #[error("{0}")]
    NotFound(String),
    #[error("auth service error: {0}")]
    Remote(String),
}

impl From<StoreError> for AccountError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Unauthorized(_) => AccountError::InvalidCredentials,
            StoreError::AlreadyExists(_) => AccountError::EmailTaken,
            StoreError::NotFound(what) => AccountError::NotFound(what),
            other => AccountError::Remote(other.to_string()),
        }
    }
}

/// Account creation and session lifecycle on the hosted auth service.
#[async_trait]
pub trait AccountService: Send + Sync {
    async fn create_account(&self, email: &str, password: &str, name: &str) -> Result<AuthIdentity, AccountError>;
    async fn create_session(&self, email: &str, password: &str) -> Result<AccountSession, AccountError>;
    async fn get_user(&self, user_id: &str) -> Result<AuthIdentity, AccountError>;
    /// `NotFound` once the session has been deleted.
    async fn get_session(&self, user_id: &str, session_id: &str) -> Result<AccountSession, AccountError>;
    async fn delete_session(&self, user_id: &str, session_id: &str) -> Result<(), AccountError>;
}

struct StoredAccount {
    identity: AuthIdentity,
    password_hash: String,
}

#[derive(Default)]
struct Accounts {
    by_email: HashMap<String, StoredAccount>,
    sessions: HashMap<String, String>,
}

/// In-process accounts with argon2-hashed passwords.
#[derive(Default)]
pub struct MemoryAccounts {
    inner: Mutex<Accounts>,
}

impl MemoryAccounts {
    fn lock(&self) -> std::sync::MutexGuard<'_, Accounts> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[cfg(test)]
    pub fn session_count(&self) -> usize {
        self.lock().sessions.len()
    }
}

#[async_trait]
impl AccountService for MemoryAccounts {
    async fn create_account(&self, email: &str, password: &str, name: &str) -> Result<AuthIdentity, AccountError> {
        if self.lock().by_email.contains_key(email) {
            return Err(AccountError::EmailTaken);
        }
        let password_hash = hash_password(password).map_err(|e| AccountError::Remote(e.to_string()))?;
        let identity = AuthIdentity {
            id: unique_id(),
            email: email.to_string(),
            name: name.to_string(),
        };

        let mut inner = self.lock();
        if inner.by_email.contains_key(email) {
            return Err(AccountError::EmailTaken);
        }
        inner.by_email.insert(
            email.to_string(),
            StoredAccount {
                identity: identity.clone(),
                password_hash,
            },
        );
        Ok(identity)
    }

    async fn create_session(&self, email: &str, password: &str) -> Result<AccountSession, AccountError> {
        let (user_id, hash) = {
            let inner = self.lock();
            let account = inner
                .by_email
                .get(email)
                .ok_or(AccountError::InvalidCredentials)?;
            (account.identity.id.clone(), account.password_hash.clone())
        };
        let ok = verify_password(password, &hash).map_err(|e| AccountError::Remote(e.to_string()))?;
        if !ok {
            return Err(AccountError::InvalidCredentials);
        }

        let session = AccountSession {
            id: unique_id(),
            user_id,
        };
        self.lock()
            .sessions
            .insert(session.id.clone(), session.user_id.clone());
        Ok(session)
    }

    async fn get_user(&self, user_id: &str) -> Result<AuthIdentity, AccountError> {
        self.lock()
            .by_email
            .values()
            .find(|a| a.identity.id == user_id)
            .map(|a| a.identity.clone())
            .ok_or_else(|| AccountError::NotFound(format!("User {user_id} not found")))
    }

    async fn get_session(&self, user_id: &str, session_id: &str) -> Result<AccountSession, AccountError> {
        match self.lock().sessions.get(session_id) {
            Some(owner) if owner == user_id => Ok(AccountSession {
                id: session_id.to_string(),
                user_id: owner.clone(),
            }),
            _ => Err(AccountError::NotFound(format!("Session {session_id} not found"))),
        }
    }

    async fn delete_session(&self, user_id: &str, session_id: &str) -> Result<(), AccountError> {
        let mut inner = self.lock();
        match inner.sessions.get(session_id) {
            Some(owner) if owner == user_id => {
                inner.sessions.remove(session_id);
                Ok(())
            }
            _ => Err(AccountError::NotFound(format!("Session {session_id} not found"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn account_lifecycle() {
        let accounts = MemoryAccounts::default();
        let identity = accounts
            .create_account("asha@example.com", "correct-horse", "Asha")
            .await
            .unwrap();
        assert_eq!(identity.email, "asha@example.com");

        let err = accounts
            .create_account("asha@example.com", "whatever-else", "Other")
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::EmailTaken));

        let err = accounts
            .create_session("asha@example.com", "wrong-password")
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::InvalidCredentials));

        let session = accounts
            .create_session("asha@example.com", "correct-horse")
            .await
            .unwrap();
        assert_eq!(session.user_id, identity.id);
        assert_eq!(accounts.session_count(), 1);

        assert_eq!(accounts.get_user(&identity.id).await.unwrap(), identity);
        assert_eq!(accounts.get_session(&identity.id, &session.id).await.unwrap(), session);
        assert!(accounts.get_session("someone-else", &session.id).await.is_err());

        accounts
            .delete_session(&identity.id, &session.id)
            .await
            .unwrap();
        assert_eq!(accounts.session_count(), 0);
        assert!(matches!(
            accounts.get_session(&identity.id, &session.id).await,
            Err(AccountError::NotFound(_))
        ));
        assert!(accounts
            .delete_session(&identity.id, &session.id)
            .await
            .is_err());
    }

    #[test]
    fn store_errors_map_to_account_errors() {
        assert!(matches!(
            AccountError::from(StoreError::Unauthorized("x".into())),
            AccountError::InvalidCredentials
        ));
        assert!(matches!(
            AccountError::from(StoreError::AlreadyExists("x".into())),
            AccountError::EmailTaken
        ));
        assert!(matches!(
            AccountError::from(StoreError::Transport("x".into())),
            AccountError::Remote(_)
        ));
    }
}
