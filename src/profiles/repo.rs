use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use tracing::debug;

use crate::auth::accounts::AuthIdentity;
use crate::store::{unique_id, DocumentStore, Fields, Query, StoreError};

pub const USERS_COLLECTION: &str = "users";

/// Wallet balance a new account starts with.
pub const STARTING_CREDITS: i64 = 10;

/// Per-user wallet and role flags, separate from the auth identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    #[serde(rename(serialize = "id", deserialize = "$id"))]
    pub id: String,
    pub user_id: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub credits: i64,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_blocked: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

fn single(key: &str, value: impl Into<Value>) -> Fields {
    let mut data = Fields::new();
    data.insert(key.to_string(), value.into());
    data
}

pub async fn find_by_user_id(store: &dyn DocumentStore, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
    let docs = store
        .list_documents(
            USERS_COLLECTION,
            &[Query::equal("user_id", user_id), Query::Limit(1)],
        )
        .await?;
    docs.into_iter().next().map(|d| d.into_typed()).transpose()
}

pub async fn get(store: &dyn DocumentStore, profile_id: &str) -> Result<UserProfile, StoreError> {
    store
        .get_document(USERS_COLLECTION, profile_id)
        .await?
        .into_typed()
}

pub async fn list(store: &dyn DocumentStore, limit: u32, offset: u32) -> Result<Vec<UserProfile>, StoreError> {
    store
        .list_documents(USERS_COLLECTION, &[Query::Limit(limit), Query::Offset(offset)])
        .await?
        .into_iter()
        .map(|d| d.into_typed())
        .collect()
}

/// Creates the profile for a freshly registered identity.
pub async fn create(store: &dyn DocumentStore, identity: &AuthIdentity) -> Result<UserProfile, StoreError> {
    let profile = UserProfile {
        id: unique_id(),
        user_id: identity.id.clone(),
        email: identity.email.clone(),
        name: identity.name.clone(),
        credits: STARTING_CREDITS,
        is_admin: false,
        is_blocked: false,
        created_at: OffsetDateTime::now_utc(),
    };

    let Value::Object(mut data) =
        serde_json::to_value(&profile).map_err(|e| StoreError::Malformed(e.to_string()))?
    else {
        return Err(StoreError::Malformed("profile is not an object".into()));
    };
    data.remove("id");

    let doc = store.create_document(USERS_COLLECTION, &profile.id, data).await?;
    debug!(profile_id = %doc.id, user_id = %profile.user_id, "profile created");
    doc.into_typed()
}

async fn update(store: &dyn DocumentStore, profile_id: &str, data: Fields) -> Result<UserProfile, StoreError> {
    store
        .update_document(USERS_COLLECTION, profile_id, data)
        .await?
        .into_typed()
}

/// Overwrites the balance. No version check: the last writer wins.
pub async fn set_credits(store: &dyn DocumentStore, profile_id: &str, credits: i64) -> Result<UserProfile, StoreError> {
    update(store, profile_id, single("credits", credits)).await
}

pub async fn set_blocked(store: &dyn DocumentStore, profile_id: &str, blocked: bool) -> Result<UserProfile, StoreError> {
    update(store, profile_id, single("is_blocked", blocked)).await
}

pub async fn set_admin(store: &dyn DocumentStore, profile_id: &str, admin: bool) -> Result<UserProfile, StoreError> {
    update(store, profile_id, single("is_admin", admin)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ensure_schema;
    use crate::store::memory::MemoryStore;

    fn identity(n: u32) -> AuthIdentity {
        AuthIdentity {
            id: format!("user-{n}"),
            email: format!("user{n}@example.com"),
            name: format!("User {n}"),
        }
    }

    async fn store() -> MemoryStore {
        let store = MemoryStore::new("db");
        ensure_schema(&store).await.unwrap();
        store
    }

    #[tokio::test]
    async fn new_profiles_start_with_ten_credits() {
        let store = store().await;
        let profile = create(&store, &identity(1)).await.unwrap();
        assert_eq!(profile.credits, STARTING_CREDITS);
        assert!(!profile.is_admin);
        assert!(!profile.is_blocked);

        let found = find_by_user_id(&store, "user-1").await.unwrap().unwrap();
        assert_eq!(found, profile);
        assert!(find_by_user_id(&store, "user-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn toggling_admin_leaves_other_fields_alone() {
        let store = store().await;
        let profile = create(&store, &identity(1)).await.unwrap();
        set_credits(&store, &profile.id, 4).await.unwrap();
        set_blocked(&store, &profile.id, true).await.unwrap();

        let updated = set_admin(&store, &profile.id, true).await.unwrap();
        assert!(updated.is_admin);
        assert_eq!(updated.credits, 4);
        assert!(updated.is_blocked);
        assert_eq!(updated.email, profile.email);
        assert_eq!(updated.created_at, profile.created_at);
    }

    #[tokio::test]
    async fn concurrent_admins_last_write_wins() {
        let store = store().await;
        let profile = create(&store, &identity(1)).await.unwrap();

        // Two consoles loaded the same profile and each writes a balance
        // derived from what it saw.
        let seen_by_a = get(&store, &profile.id).await.unwrap();
        let seen_by_b = get(&store, &profile.id).await.unwrap();
        set_credits(&store, &profile.id, seen_by_a.credits + 5).await.unwrap();
        set_credits(&store, &profile.id, seen_by_b.credits - 3).await.unwrap();

        assert_eq!(get(&store, &profile.id).await.unwrap().credits, 7);
    }

    #[tokio::test]
    async fn list_pages_through_profiles() {
        let store = store().await;
        for n in 0..5 {
            create(&store, &identity(n)).await.unwrap();
        }
        assert_eq!(list(&store, 25, 0).await.unwrap().len(), 5);
        assert_eq!(list(&store, 2, 0).await.unwrap().len(), 2);
        assert_eq!(list(&store, 25, 4).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_profile_is_not_found() {
        let store = store().await;
        let err = set_admin(&store, "nope", true).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
