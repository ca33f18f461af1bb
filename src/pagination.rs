use serde::Deserialize;

use crate::store::query::DEFAULT_LIMIT;

/// `?limit=&offset=` on list endpoints.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

fn default_limit() -> u32 {
    DEFAULT_LIMIT as u32
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_params_use_defaults() {
        let p: Pagination = serde_json::from_str("{}").unwrap();
        assert_eq!((p.limit, p.offset), (25, 0));

        let p: Pagination = serde_json::from_str(r#"{"limit": 5, "offset": 10}"#).unwrap();
        assert_eq!((p.limit, p.offset), (5, 10));
    }
}
