//! REST client for the hosted Appwrite backend.

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, warn};

use crate::store::StoreError;

pub mod databases;
pub mod users;

pub use databases::AppwriteDatabases;
pub use users::AppwriteAccounts;

/// Shared HTTP plumbing: base URL, project and key headers, error mapping.
#[derive(Clone)]
pub struct AppwriteClient {
    http: Client,
    endpoint: String,
    project_id: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl AppwriteClient {
    pub fn new(endpoint: &str, project_id: &str, api_key: Option<String>) -> Self {
        Self {
            http: Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            project_id: project_id.to_string(),
            api_key,
        }
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut req = self
            .http
            .request(method, format!("{}{}", self.endpoint, path))
            .header("X-Appwrite-Project", &self.project_id)
            .header("X-Appwrite-Response-Format", "1.5.0");
        if let Some(key) = &self.api_key {
            req = req.header("X-Appwrite-Key", key);
        }
        req
    }

    async fn execute(&self, req: RequestBuilder) -> Result<Response, StoreError> {
        let res = req
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }

        let code = status.as_u16();
        let message = match res.json::<ErrorBody>().await {
            Ok(body) => body.message,
            Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
        };
        debug!(status = code, %message, "appwrite request failed");
        Err(match code {
            404 => StoreError::NotFound(message),
            409 => StoreError::AlreadyExists(message),
            401 => StoreError::Unauthorized(message),
            _ => {
                warn!(status = code, %message, "appwrite error");
                StoreError::Remote {
                    status: code,
                    message,
                }
            }
        })
    }

    pub(crate) async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, StoreError> {
        self.execute(req)
            .await?
            .json::<T>()
            .await
            .map_err(|e| StoreError::Malformed(e.to_string()))
    }

    /// For endpoints whose response body is irrelevant (or empty, as for 204).
    pub(crate) async fn send_discarding(&self, req: RequestBuilder) -> Result<(), StoreError> {
        self.execute(req).await.map(|_| ())
    }
}
