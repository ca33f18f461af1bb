use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};

use super::AppwriteClient;
use crate::store::{AttributeKind, AttributeSpec, Document, DocumentStore, Fields, IndexSpec, Query, StoreError};

/// [`DocumentStore`] over the Appwrite Databases API.
pub struct AppwriteDatabases {
    client: Arc<AppwriteClient>,
    database_id: String,
}

#[derive(Debug, Deserialize)]
struct DocumentList {
    documents: Vec<Document>,
}

impl AppwriteDatabases {
    pub fn new(client: Arc<AppwriteClient>, database_id: &str) -> Self {
        Self {
            client,
            database_id: database_id.to_string(),
        }
    }

    fn collection_path(&self, collection: &str) -> String {
        format!("/databases/{}/collections/{}", self.database_id, collection)
    }
}

fn attribute_body(attribute: &AttributeSpec) -> (&'static str, Value) {
    let mut body = json!({
        "key": attribute.key,
        "required": attribute.required,
    });
    let kind = match attribute.kind {
        AttributeKind::String { size } => {
            body["size"] = json!(size);
            "string"
        }
        AttributeKind::Integer { .. } => "integer",
        AttributeKind::Boolean { .. } => "boolean",
    };
    // Required attributes cannot carry a default.
    if !attribute.required {
        if let Some(default) = attribute.kind.default_value() {
            body["default"] = default;
        }
    }
    (kind, body)
}

#[async_trait]
impl DocumentStore for AppwriteDatabases {
    fn database_id(&self) -> &str {
        &self.database_id
    }

    async fn get_database(&self) -> Result<(), StoreError> {
        let req = self
            .client
            .request(Method::GET, &format!("/databases/{}", self.database_id));
        self.client.send_discarding(req).await
    }

    async fn create_database(&self, name: &str) -> Result<(), StoreError> {
        let req = self
            .client
            .request(Method::POST, "/databases")
            .json(&json!({ "databaseId": self.database_id, "name": name }));
        self.client.send_discarding(req).await
    }

    async fn get_collection(&self, collection: &str) -> Result<(), StoreError> {
        let req = self
            .client
            .request(Method::GET, &self.collection_path(collection));
        self.client.send_discarding(req).await
    }

    async fn create_collection(&self, collection: &str, name: &str) -> Result<(), StoreError> {
        let req = self
            .client
            .request(Method::POST, &format!("/databases/{}/collections", self.database_id))
            .json(&json!({
                "collectionId": collection,
                "name": name,
                "permissions": ["read(\"users\")", "create(\"users\")", "update(\"users\")"],
                "documentSecurity": false,
            }));
        self.client.send_discarding(req).await
    }

    async fn create_attribute(&self, collection: &str, attribute: &AttributeSpec) -> Result<(), StoreError> {
        let (kind, body) = attribute_body(attribute);
        let req = self
            .client
            .request(
                Method::POST,
                &format!("{}/attributes/{}", self.collection_path(collection), kind),
            )
            .json(&body);
        self.client.send_discarding(req).await
    }

    async fn create_index(&self, collection: &str, index: &IndexSpec) -> Result<(), StoreError> {
        let req = self
            .client
            .request(Method::POST, &format!("{}/indexes", self.collection_path(collection)))
            .json(&json!({
                "key": index.key,
                "type": "key",
                "attributes": index.attributes,
            }));
        self.client.send_discarding(req).await
    }

    async fn create_document(&self, collection: &str, id: &str, data: Fields) -> Result<Document, StoreError> {
        let req = self
            .client
            .request(Method::POST, &format!("{}/documents", self.collection_path(collection)))
            .json(&json!({ "documentId": id, "data": data }));
        self.client.send(req).await
    }

    async fn get_document(&self, collection: &str, id: &str) -> Result<Document, StoreError> {
        let req = self.client.request(
            Method::GET,
            &format!("{}/documents/{}", self.collection_path(collection), id),
        );
        self.client.send(req).await
    }

    async fn update_document(&self, collection: &str, id: &str, data: Fields) -> Result<Document, StoreError> {
        let req = self
            .client
            .request(
                Method::PATCH,
                &format!("{}/documents/{}", self.collection_path(collection), id),
            )
            .json(&json!({ "data": data }));
        self.client.send(req).await
    }

    async fn list_documents(&self, collection: &str, queries: &[Query]) -> Result<Vec<Document>, StoreError> {
        let params: Vec<(&str, String)> = queries
            .iter()
            .map(|q| ("queries[]", q.to_query_string()))
            .collect();
        let req = self
            .client
            .request(Method::GET, &format!("{}/documents", self.collection_path(collection)))
            .query(&params);
        let list: DocumentList = self.client.send(req).await?;
        Ok(list.documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn store(server: &MockServer) -> AppwriteDatabases {
        let client = AppwriteClient::new(&format!("{}/v1", server.uri()), "proj", Some("key".into()));
        AppwriteDatabases::new(Arc::new(client), "vehicle_lookup_db")
    }

    #[test]
    fn optional_attributes_carry_defaults_and_required_ones_do_not() {
        let (kind, body) = attribute_body(&AttributeSpec {
            key: "credits",
            kind: AttributeKind::Integer { default: Some(0) },
            required: false,
        });
        assert_eq!(kind, "integer");
        assert_eq!(body, json!({ "key": "credits", "required": false, "default": 0 }));

        let (kind, body) = attribute_body(&AttributeSpec {
            key: "is_admin",
            kind: AttributeKind::Boolean { default: Some(false) },
            required: true,
        });
        assert_eq!(kind, "boolean");
        assert_eq!(body, json!({ "key": "is_admin", "required": true }));

        let (kind, body) = attribute_body(&AttributeSpec {
            key: "email",
            kind: AttributeKind::String { size: 255 },
            required: true,
        });
        assert_eq!(kind, "string");
        assert_eq!(body, json!({ "key": "email", "required": true, "size": 255 }));
    }

    #[tokio::test]
    async fn missing_database_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/databases/vehicle_lookup_db"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(json!({ "message": "Database not found", "code": 404 })),
            )
            .mount(&server)
            .await;

        let err = store(&server).await.get_database().await.unwrap_err();
        assert_eq!(err, StoreError::NotFound("Database not found".into()));
    }

    #[tokio::test]
    async fn creates_documents_with_client_ids() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/databases/vehicle_lookup_db/collections/users/documents"))
            .and(body_json(json!({ "documentId": "doc1", "data": { "name": "Asha" } })))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({ "$id": "doc1", "name": "Asha" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut data = Fields::new();
        data.insert("name".into(), "Asha".into());
        let doc = store(&server)
            .await
            .create_document("users", "doc1", data)
            .await
            .unwrap();
        assert_eq!(doc.id, "doc1");
        assert_eq!(doc.fields["name"], "Asha");
    }

    #[tokio::test]
    async fn lists_documents_with_json_queries() {
        let server = MockServer::start().await;
        let expected = Query::equal("user_id", "u1").to_query_string();
        Mock::given(method("GET"))
            .and(path("/v1/databases/vehicle_lookup_db/collections/users/documents"))
            .and(query_param("queries[]", expected.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total": 1,
                "documents": [{ "$id": "p1", "user_id": "u1" }],
            })))
            .mount(&server)
            .await;

        let docs = store(&server)
            .await
            .list_documents("users", &[Query::equal("user_id", "u1")])
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "p1");
    }

    #[tokio::test]
    async fn patches_only_the_given_fields() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/v1/databases/vehicle_lookup_db/collections/users/documents/p1"))
            .and(body_json(json!({ "data": { "is_admin": true } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "$id": "p1",
                "is_admin": true,
                "credits": 4,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut data = Fields::new();
        data.insert("is_admin".into(), true.into());
        let doc = store(&server)
            .await
            .update_document("users", "p1", data)
            .await
            .unwrap();
        assert_eq!(doc.fields["credits"], 4);
    }
}
