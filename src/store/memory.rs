use std::collections::HashMap;
#[cfg(test)]
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use super::{query, AttributeSpec, Document, DocumentStore, Fields, IndexSpec, Query, StoreError};

#[derive(Default)]
struct Collection {
    attributes: Vec<AttributeSpec>,
    indexes: Vec<String>,
    documents: Vec<Document>,
}

#[derive(Default)]
struct Inner {
    database: bool,
    collections: HashMap<String, Collection>,
    #[cfg(test)]
    failing_writes: HashSet<String>,
}

/// In-process document store with the hosted store's observable behaviour:
/// 404 on missing resources, 409 on duplicate creates, schema-checked
/// documents, partial updates and last-write-wins.
#[derive(Default)]
pub struct MemoryStore {
    database_id: String,
    inner: Mutex<Inner>,
}

fn timestamp() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

impl MemoryStore {
    pub fn new(database_id: impl Into<String>) -> Self {
        Self {
            database_id: database_id.into(),
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock leaves plain data behind; keep going.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[cfg(test)]
    /// Makes every later document create/update in `collection` fail with a
    /// 503, emulating an outage of the hosted store mid-operation.
    pub fn fail_writes_to(&self, collection: &str) {
        self.lock().failing_writes.insert(collection.to_string());
    }

    #[cfg(test)]
    pub fn restore_writes_to(&self, collection: &str) {
        self.lock().failing_writes.remove(collection);
    }

    #[cfg(test)]
    pub fn document_count(&self, collection: &str) -> usize {
        self.lock()
            .collections
            .get(collection)
            .map_or(0, |c| c.documents.len())
    }

    #[cfg(test)]
    pub fn attribute_keys(&self, collection: &str) -> Vec<&'static str> {
        self.lock()
            .collections
            .get(collection)
            .map(|c| c.attributes.iter().map(|a| a.key).collect())
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub fn index_keys(&self, collection: &str) -> Vec<String> {
        self.lock()
            .collections
            .get(collection)
            .map(|c| c.indexes.clone())
            .unwrap_or_default()
    }
}

impl Inner {
    fn database(&self, id: &str) -> Result<(), StoreError> {
        if self.database {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("Database {id} not found")))
        }
    }

    fn collection_mut(&mut self, db: &str, id: &str) -> Result<&mut Collection, StoreError> {
        self.database(db)?;
        self.collections
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("Collection {id} not found")))
    }

    fn check_writable(&self, _collection: &str) -> Result<(), StoreError> {
        #[cfg(test)]
        if self.failing_writes.contains(_collection) {
            return Err(StoreError::Remote {
                status: 503,
                message: format!("writes to {_collection} are unavailable"),
            });
        }
        Ok(())
    }
}

fn check_structure(collection: &Collection, data: &Fields) -> Result<(), StoreError> {
    if collection.attributes.is_empty() {
        return Ok(());
    }
    for key in data.keys() {
        if !collection.attributes.iter().any(|a| a.key == key) {
            return Err(StoreError::Remote {
                status: 400,
                message: format!("Invalid document structure: Unknown attribute: \"{key}\""),
            });
        }
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn database_id(&self) -> &str {
        &self.database_id
    }

    async fn get_database(&self) -> Result<(), StoreError> {
        self.lock().database(&self.database_id)
    }

    async fn create_database(&self, _name: &str) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner.database {
            return Err(StoreError::AlreadyExists(format!("database {}", self.database_id)));
        }
        inner.database = true;
        Ok(())
    }

    async fn get_collection(&self, collection: &str) -> Result<(), StoreError> {
        self.lock()
            .collection_mut(&self.database_id, collection)
            .map(|_| ())
    }

    async fn create_collection(&self, collection: &str, _name: &str) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.database(&self.database_id)?;
        if inner.collections.contains_key(collection) {
            return Err(StoreError::AlreadyExists(format!("collection {collection}")));
        }
        inner
            .collections
            .insert(collection.to_string(), Collection::default());
        Ok(())
    }

    async fn create_attribute(&self, collection: &str, attribute: &AttributeSpec) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let coll = inner.collection_mut(&self.database_id, collection)?;
        if coll.attributes.iter().any(|a| a.key == attribute.key) {
            return Err(StoreError::AlreadyExists(format!("attribute {}", attribute.key)));
        }
        coll.attributes.push(*attribute);
        Ok(())
    }

    async fn create_index(&self, collection: &str, index: &IndexSpec) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let coll = inner.collection_mut(&self.database_id, collection)?;
        if coll.indexes.iter().any(|k| k == index.key) {
            return Err(StoreError::AlreadyExists(format!("index {}", index.key)));
        }
        if let Some(missing) = index
            .attributes
            .iter()
            .find(|key| !coll.attributes.iter().any(|a| a.key == **key))
        {
            return Err(StoreError::Remote {
                status: 400,
                message: format!("Unknown attribute: {missing}"),
            });
        }
        coll.indexes.push(index.key.to_string());
        Ok(())
    }

    async fn create_document(&self, collection: &str, id: &str, mut data: Fields) -> Result<Document, StoreError> {
        let mut inner = self.lock();
        inner.check_writable(collection)?;
        let coll = inner.collection_mut(&self.database_id, collection)?;
        check_structure(coll, &data)?;
        if coll.documents.iter().any(|d| d.id == id) {
            return Err(StoreError::AlreadyExists(format!("document {id}")));
        }
        for attr in &coll.attributes {
            if data.contains_key(attr.key) {
                continue;
            }
            match attr.kind.default_value() {
                Some(default) => {
                    data.insert(attr.key.to_string(), default);
                }
                None if attr.required => {
                    return Err(StoreError::Remote {
                        status: 400,
                        message: format!("Missing required attribute \"{}\"", attr.key),
                    });
                }
                None => {
                    data.insert(attr.key.to_string(), Value::Null);
                }
            }
        }
        let now = timestamp();
        data.insert("$createdAt".into(), now.clone().into());
        data.insert("$updatedAt".into(), now.into());
        let doc = Document {
            id: id.to_string(),
            fields: data,
        };
        coll.documents.push(doc.clone());
        Ok(doc)
    }

    async fn get_document(&self, collection: &str, id: &str) -> Result<Document, StoreError> {
        let mut inner = self.lock();
        let coll = inner.collection_mut(&self.database_id, collection)?;
        coll.documents
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("Document {id} not found")))
    }

    async fn update_document(&self, collection: &str, id: &str, data: Fields) -> Result<Document, StoreError> {
        let mut inner = self.lock();
        inner.check_writable(collection)?;
        let coll = inner.collection_mut(&self.database_id, collection)?;
        check_structure(coll, &data)?;
        let doc = coll
            .documents
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("Document {id} not found")))?;
        for (key, value) in data {
            doc.fields.insert(key, value);
        }
        doc.fields.insert("$updatedAt".into(), timestamp().into());
        Ok(doc.clone())
    }

    async fn list_documents(&self, collection: &str, queries: &[Query]) -> Result<Vec<Document>, StoreError> {
        let mut inner = self.lock();
        let coll = inner.collection_mut(&self.database_id, collection)?;
        Ok(query::apply(coll.documents.clone(), queries))
    }
}
