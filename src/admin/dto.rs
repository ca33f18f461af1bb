use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AdminLoginResponse {
    pub token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

/// `{"credits": n}` sets the balance, `{"delta": d}` adjusts the stored one.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum CreditsChange {
    Set { credits: i64 },
    Adjust { delta: i64 },
}

impl CreditsChange {
    pub fn apply(self, current: i64) -> Result<i64, AppError> {
        let next = match self {
            CreditsChange::Set { credits } => Some(credits),
            CreditsChange::Adjust { delta } => current.checked_add(delta),
        };
        match next {
            Some(n) if n >= 0 => Ok(n),
            _ => Err(AppError::Validation("Credits cannot be negative".into())),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BlockedRequest {
    pub blocked: bool,
}

#[derive(Debug, Deserialize)]
pub struct AdminFlagRequest {
    pub admin: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_shapes() {
        let set: CreditsChange = serde_json::from_str(r#"{"credits": 12}"#).unwrap();
        assert_eq!(set, CreditsChange::Set { credits: 12 });
        let adjust: CreditsChange = serde_json::from_str(r#"{"delta": -3}"#).unwrap();
        assert_eq!(adjust, CreditsChange::Adjust { delta: -3 });
        assert!(serde_json::from_str::<CreditsChange>(r#"{"amount": 1}"#).is_err());
    }

    #[test]
    fn negative_results_are_rejected() {
        assert_eq!(CreditsChange::Set { credits: 0 }.apply(9).unwrap(), 0);
        assert_eq!(CreditsChange::Adjust { delta: -4 }.apply(9).unwrap(), 5);
        assert_eq!(CreditsChange::Adjust { delta: 5 }.apply(9).unwrap(), 14);

        let err = CreditsChange::Adjust { delta: -10 }.apply(9).unwrap_err();
        assert_eq!(err.to_string(), "Credits cannot be negative");
        assert!(CreditsChange::Set { credits: -1 }.apply(9).is_err());
    }
}
