//! Lazy schema initialization for the hosted document database.
//!
//! Order is fixed: database, then per collection the collection itself, its
//! attributes and its indexes. Existence checks that answer `NotFound`
//! trigger creation; creates that answer `AlreadyExists` lost a race with
//! another bootstrapper and count as done.

use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

use crate::lookups::repo::LOOKUPS_COLLECTION;
use crate::profiles::repo::USERS_COLLECTION;
use crate::store::{AttributeKind, AttributeSpec, DocumentStore, IndexSpec, StoreError};

pub const DATABASE_NAME: &str = "Vehicle Lookup Database";

pub struct CollectionSpec {
    pub id: &'static str,
    pub name: &'static str,
    pub attributes: &'static [AttributeSpec],
    pub indexes: &'static [IndexSpec],
}

const fn string(key: &'static str, size: u32) -> AttributeSpec {
    AttributeSpec {
        key,
        kind: AttributeKind::String { size },
        required: true,
    }
}

const USER_ID_INDEX: IndexSpec = IndexSpec {
    key: "user_id_index",
    attributes: &["user_id"],
};

pub const COLLECTIONS: &[CollectionSpec] = &[
    CollectionSpec {
        id: USERS_COLLECTION,
        name: "Users",
        attributes: &[
            string("user_id", 255),
            string("email", 255),
            string("name", 255),
            AttributeSpec {
                key: "credits",
                kind: AttributeKind::Integer { default: Some(0) },
                required: false,
            },
            AttributeSpec {
                key: "is_admin",
                kind: AttributeKind::Boolean { default: Some(false) },
                required: false,
            },
            AttributeSpec {
                key: "is_blocked",
                kind: AttributeKind::Boolean { default: Some(false) },
                required: false,
            },
            string("created_at", 255),
        ],
        indexes: &[USER_ID_INDEX],
    },
    CollectionSpec {
        id: LOOKUPS_COLLECTION,
        name: "Vehicle Lookups",
        attributes: &[
            string("user_id", 255),
            string("vehicle_number", 255),
            string("owner", 255),
            string("lookup_data", 65535),
            string("created_at", 255),
        ],
        indexes: &[USER_ID_INDEX],
    },
];

fn tolerate_existing(result: Result<(), StoreError>) -> Result<(), StoreError> {
    match result {
        Err(StoreError::AlreadyExists(what)) => {
            debug!(%what, "created concurrently; treating as done");
            Ok(())
        }
        other => other,
    }
}

/// `Ok(true)` when the check answered `NotFound` and the resource was
/// created here or by a concurrent bootstrapper.
async fn create_if_missing<F>(check: Result<(), StoreError>, create: F) -> Result<bool, StoreError>
where
    F: std::future::Future<Output = Result<(), StoreError>>,
{
    match check {
        Ok(()) => Ok(false),
        Err(StoreError::NotFound(_)) => tolerate_existing(create.await).map(|_| true),
        Err(e) => Err(e),
    }
}

/// Creates whatever part of the schema is missing. Idempotent.
///
/// Attributes and indexes are only created together with their collection;
/// a collection that already exists is assumed complete.
#[instrument(skip(store), fields(database = store.database_id()))]
pub async fn ensure_schema(store: &dyn DocumentStore) -> Result<(), StoreError> {
    let check = store.get_database().await;
    if create_if_missing(check, store.create_database(DATABASE_NAME)).await? {
        info!("database ensured");
    }

    for spec in COLLECTIONS {
        let check = store.get_collection(spec.id).await;
        let missing = create_if_missing(check, store.create_collection(spec.id, spec.name)).await?;
        if !missing {
            debug!(collection = spec.id, "collection exists");
            continue;
        }

        for attribute in spec.attributes {
            tolerate_existing(store.create_attribute(spec.id, attribute).await)?;
        }
        for index in spec.indexes {
            tolerate_existing(store.create_index(spec.id, index).await)?;
        }
        info!(collection = spec.id, "collection ensured");
    }
    Ok(())
}

/// Runs [`ensure_schema`] once per process. Failures are not remembered, so
/// the next caller retries.
#[derive(Default)]
pub struct SchemaBootstrap {
    done: OnceCell<()>,
}

impl SchemaBootstrap {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn ensure(&self, store: &dyn DocumentStore) -> Result<(), StoreError> {
        self.done
            .get_or_try_init(|| ensure_schema(store))
            .await
            .map(|_| ())
    }

    #[cfg(test)]
    pub fn is_ready(&self) -> bool {
        self.done.initialized()
    }
}
