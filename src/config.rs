use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_DATABASE_ID: &str = "vehicle_lookup_db";
pub const DEFAULT_LOOKUP_API_URL: &str = "https://owner-vercel.vercel.app/";

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Which document store implementation backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Appwrite,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "appwrite" => Ok(Self::Appwrite),
            "memory" => Ok(Self::Memory),
            other => anyhow::bail!("unknown STORE_BACKEND {other:?}, expected appwrite or memory"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppwriteConfig {
    pub endpoint: String,
    pub project_id: String,
    pub api_key: Option<String>,
    pub database_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LookupConfig {
    pub api_url: String,
    /// `None` leaves the upstream call without a deadline.
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub store_backend: StoreBackend,
    pub appwrite: AppwriteConfig,
    pub admin: AdminConfig,
    pub lookup: LookupConfig,
    pub jwt: JwtConfig,
}

fn required(key: &str) -> anyhow::Result<String> {
    std::env::var(key).with_context(|| format!("{key} must be set"))
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let store_backend = optional("STORE_BACKEND")
            .map(|v| v.parse())
            .transpose()?
            .unwrap_or(StoreBackend::Appwrite);

        let appwrite = AppwriteConfig {
            endpoint: required("APPWRITE_ENDPOINT")?,
            project_id: required("APPWRITE_PROJECT_ID")?,
            api_key: optional("APPWRITE_API_KEY"),
            database_id: optional("APPWRITE_DATABASE_ID")
                .unwrap_or_else(|| DEFAULT_DATABASE_ID.into()),
        };
        let admin = AdminConfig {
            email: required("ADMIN_EMAIL")?,
            password: required("ADMIN_PASSWORD")?,
        };
        let lookup = LookupConfig {
            api_url: optional("LOOKUP_API_URL").unwrap_or_else(|| DEFAULT_LOOKUP_API_URL.into()),
            timeout_secs: optional("LOOKUP_TIMEOUT_SECS")
                .map(|v| v.parse::<u64>())
                .transpose()
                .context("LOOKUP_TIMEOUT_SECS must be a whole number of seconds")?,
        };
        let jwt = JwtConfig {
            secret: required("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "platecheck".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "platecheck-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
            refresh_ttl_minutes: std::env::var("JWT_REFRESH_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 14),
        };

        Ok(Self {
            store_backend,
            appwrite,
            admin,
            lookup,
            jwt,
        })
    }
}
