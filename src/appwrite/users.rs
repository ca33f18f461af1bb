use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;

use super::AppwriteClient;
use crate::auth::accounts::{AccountError, AccountService, AccountSession, AuthIdentity};
use crate::store::unique_id;

#[derive(Deserialize)]
struct SessionList {
    sessions: Vec<AccountSession>,
}

/// [`AccountService`] over the Appwrite Users (server) and Account APIs.
pub struct AppwriteAccounts {
    client: Arc<AppwriteClient>,
}

impl AppwriteAccounts {
    pub fn new(client: Arc<AppwriteClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AccountService for AppwriteAccounts {
    async fn create_account(&self, email: &str, password: &str, name: &str) -> Result<AuthIdentity, AccountError> {
        let req = self.client.request(Method::POST, "/users").json(&json!({
            "userId": unique_id(),
            "email": email,
            "password": password,
            "name": name,
        }));
        Ok(self.client.send(req).await?)
    }

    async fn create_session(&self, email: &str, password: &str) -> Result<AccountSession, AccountError> {
        let req = self
            .client
            .request(Method::POST, "/account/sessions/email")
            .json(&json!({ "email": email, "password": password }));
        Ok(self.client.send(req).await?)
    }

    async fn get_user(&self, user_id: &str) -> Result<AuthIdentity, AccountError> {
        let req = self
            .client
            .request(Method::GET, &format!("/users/{user_id}"));
        Ok(self.client.send(req).await?)
    }

    async fn get_session(&self, user_id: &str, session_id: &str) -> Result<AccountSession, AccountError> {
        let req = self
            .client
            .request(Method::GET, &format!("/users/{user_id}/sessions"));
        let list: SessionList = self.client.send(req).await?;
        list.sessions
            .into_iter()
            .find(|s| s.id == session_id)
            .ok_or_else(|| AccountError::NotFound(format!("Session {session_id} not found")))
    }

    async fn delete_session(&self, user_id: &str, session_id: &str) -> Result<(), AccountError> {
        let req = self
            .client
            .request(Method::DELETE, &format!("/users/{user_id}/sessions/{session_id}"));
        Ok(self.client.send_discarding(req).await?)
    }
}
