use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::admin::AdminCredentials;
use crate::appwrite::{AppwriteAccounts, AppwriteClient, AppwriteDatabases};
use crate::auth::accounts::{AccountService, MemoryAccounts};
use crate::config::{AppConfig, StoreBackend};
use crate::lookups::vehicle_api::{HttpVehicleApi, VehicleApi};
use crate::schema::SchemaBootstrap;
use crate::store::{memory::MemoryStore, DocumentStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn DocumentStore>,
    pub accounts: Arc<dyn AccountService>,
    pub vehicles: Arc<dyn VehicleApi>,
    pub schema: Arc<SchemaBootstrap>,
    pub admin: Arc<AdminCredentials>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let (store, accounts): (Arc<dyn DocumentStore>, Arc<dyn AccountService>) = match config.store_backend {
            StoreBackend::Appwrite => {
                let client = Arc::new(AppwriteClient::new(
                    &config.appwrite.endpoint,
                    &config.appwrite.project_id,
                    config.appwrite.api_key.clone(),
                ));
                (
                    Arc::new(AppwriteDatabases::new(client.clone(), &config.appwrite.database_id)),
                    Arc::new(AppwriteAccounts::new(client)),
                )
            }
            StoreBackend::Memory => {
                tracing::warn!("using the in-memory store; data is lost on restart");
                (
                    Arc::new(MemoryStore::new(config.appwrite.database_id.clone())),
                    Arc::new(MemoryAccounts::default()),
                )
            }
        };

        let vehicles = Arc::new(
            HttpVehicleApi::new(
                &config.lookup.api_url,
                config.lookup.timeout_secs.map(Duration::from_secs),
            )
            .context("building the vehicle lookup client")?,
        ) as Arc<dyn VehicleApi>;

        let admin = Arc::new(AdminCredentials::new(&config.admin)?);

        Ok(Self {
            config,
            store,
            accounts,
            vehicles,
            schema: Arc::new(SchemaBootstrap::new()),
            admin,
        })
    }

    /// In-memory state for tests. The vehicle API points at a closed port
    /// until replaced with [`AppState::with_vehicles`].
    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::config::{AdminConfig, AppwriteConfig, JwtConfig, LookupConfig};

        let config = Arc::new(AppConfig {
            store_backend: StoreBackend::Memory,
            appwrite: AppwriteConfig {
                endpoint: "http://127.0.0.1:9/v1".into(),
                project_id: "test".into(),
                api_key: None,
                database_id: "test_db".into(),
            },
            admin: AdminConfig {
                email: "admin@example.com".into(),
                password: "admin-password".into(),
            },
            lookup: LookupConfig {
                api_url: "http://127.0.0.1:9/".into(),
                timeout_secs: Some(1),
            },
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test".into(),
                audience: "test".into(),
                ttl_minutes: 5,
                refresh_ttl_minutes: 60,
            },
        });

        let vehicles = HttpVehicleApi::new(&config.lookup.api_url, Some(Duration::from_secs(1)))
            .expect("client builds");
        let admin = AdminCredentials::new(&config.admin).expect("admin password hashes");

        Self {
            store: Arc::new(MemoryStore::new(config.appwrite.database_id.clone())),
            accounts: Arc::new(MemoryAccounts::default()),
            vehicles: Arc::new(vehicles),
            schema: Arc::new(SchemaBootstrap::new()),
            admin: Arc::new(admin),
            config,
        }
    }

    #[cfg(test)]
    pub fn with_vehicles(mut self, vehicles: Arc<dyn VehicleApi>) -> Self {
        self.vehicles = vehicles;
        self
    }

    #[cfg(test)]
    pub fn with_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = store;
        self
    }
}
