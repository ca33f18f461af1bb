use anyhow::Context;
use tracing::warn;

use crate::auth::password::{hash_password, verify_password};
use crate::config::AdminConfig;

/// The single configured admin login. Only the argon2 hash of the password
/// is kept after startup.
pub struct AdminCredentials {
    email: String,
    password_hash: String,
}

impl AdminCredentials {
    pub fn new(cfg: &AdminConfig) -> anyhow::Result<Self> {
        let password_hash = hash_password(&cfg.password).context("hashing ADMIN_PASSWORD")?;
        Ok(Self {
            email: cfg.email.trim().to_string(),
            password_hash,
        })
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn verify(&self, email: &str, password: &str) -> bool {
        let password_ok = verify_password(password, &self.password_hash).unwrap_or_else(|e| {
            warn!(error = %e, "admin password hash unreadable");
            false
        });
        email.trim() == self.email && password_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_only_the_configured_pair() {
        let creds = AdminCredentials::new(&AdminConfig {
            email: " admin@example.com ".into(),
            password: "admin-pass".into(),
        })
        .unwrap();

        assert!(creds.verify("admin@example.com", "admin-pass"));
        assert!(creds.verify(" admin@example.com", "admin-pass"));
        assert!(!creds.verify("admin@example.com", "admin-pass "));
        assert!(!creds.verify("other@example.com", "admin-pass"));
        assert!(!creds.verify("admin@example.com", ""));
    }
}
