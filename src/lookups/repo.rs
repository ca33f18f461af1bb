use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use time::{format_description::FormatItem, macros::format_description, OffsetDateTime, UtcOffset};
use tracing::debug;

use super::vehicle_api::VehicleData;
use crate::store::{unique_id, DocumentStore, Query, StoreError};

pub const LOOKUPS_COLLECTION: &str = "vehicle_lookups";

const UNKNOWN: &str = "Unknown";

// Fixed width keeps string order equal to time order in the store.
const CREATED_AT_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z");

/// History entry for one successful lookup. Never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VehicleLookupRecord {
    #[serde(rename(serialize = "id", deserialize = "$id"))]
    pub id: String,
    pub user_id: String,
    pub vehicle_number: String,
    pub owner: String,
    /// Raw upstream response as a JSON string.
    pub lookup_data: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl VehicleLookupRecord {
    pub fn data(&self) -> Option<VehicleData> {
        match serde_json::from_str(&self.lookup_data) {
            Ok(Value::Object(data)) => Some(data),
            _ => None,
        }
    }
}

fn trimmed_or_unknown(data: &VehicleData, key: &str) -> String {
    data.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(UNKNOWN)
        .to_string()
}

fn format_created_at(at: OffsetDateTime) -> Result<String, StoreError> {
    at.to_offset(UtcOffset::UTC)
        .format(CREATED_AT_FORMAT)
        .map_err(|e| StoreError::Malformed(e.to_string()))
}

pub async fn append(store: &dyn DocumentStore, user_id: &str, data: &VehicleData) -> Result<VehicleLookupRecord, StoreError> {
    let lookup_data = serde_json::to_string(data).map_err(|e| StoreError::Malformed(e.to_string()))?;
    let fields = json!({
        "user_id": user_id,
        "vehicle_number": trimmed_or_unknown(data, "VEHICLENUMBER"),
        "owner": trimmed_or_unknown(data, "OWNER"),
        "lookup_data": lookup_data,
        "created_at": format_created_at(OffsetDateTime::now_utc())?,
    });
    let Value::Object(fields) = fields else {
        return Err(StoreError::Malformed("lookup record is not an object".into()));
    };

    let doc = store.create_document(LOOKUPS_COLLECTION, &unique_id(), fields).await?;
    debug!(record_id = %doc.id, user_id, "lookup recorded");
    doc.into_typed()
}

/// The user's lookups, newest first.
pub async fn list_by_user(
    store: &dyn DocumentStore,
    user_id: &str,
    limit: u32,
    offset: u32,
) -> Result<Vec<VehicleLookupRecord>, StoreError> {
    store
        .list_documents(
            LOOKUPS_COLLECTION,
            &[
                Query::equal("user_id", user_id),
                Query::order_desc("created_at"),
                Query::Limit(limit),
                Query::Offset(offset),
            ],
        )
        .await?
        .into_iter()
        .map(|d| d.into_typed())
        .collect()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::schema::ensure_schema;
    use crate::store::memory::MemoryStore;

    async fn store() -> MemoryStore {
        let store = MemoryStore::new("db");
        ensure_schema(&store).await.unwrap();
        store
    }

    fn data(value: Value) -> VehicleData {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[tokio::test]
    async fn append_trims_and_keeps_raw_response() {
        let store = store().await;
        let raw = data(json!({ "VEHICLENUMBER": " PB10BL2646 ", "OWNER": "A SINGH ", "REGDATE": "01-Jan-2015" }));

        let record = append(&store, "user-1", &raw).await.unwrap();
        assert_eq!(record.vehicle_number, "PB10BL2646");
        assert_eq!(record.owner, "A SINGH");
        assert_eq!(record.data().unwrap(), raw);
    }

    #[tokio::test]
    async fn missing_or_blank_fields_become_unknown() {
        let store = store().await;
        let record = append(&store, "user-1", &data(json!({ "OWNER": "   ", "VEHICLENUMBER": 7 })))
            .await
            .unwrap();
        assert_eq!(record.vehicle_number, UNKNOWN);
        assert_eq!(record.owner, UNKNOWN);
    }

    #[tokio::test]
    async fn history_is_per_user_and_newest_first() {
        let store = store().await;
        for plate in ["PB1A1", "PB1A2", "PB1A3"] {
            append(&store, "user-1", &data(json!({ "VEHICLENUMBER": plate })))
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        append(&store, "user-2", &data(json!({ "VEHICLENUMBER": "DL3CAB1" })))
            .await
            .unwrap();

        let history = list_by_user(&store, "user-1", 25, 0).await.unwrap();
        let plates: Vec<&str> = history.iter().map(|r| r.vehicle_number.as_str()).collect();
        assert_eq!(plates, ["PB1A3", "PB1A2", "PB1A1"]);

        let page = list_by_user(&store, "user-1", 1, 1).await.unwrap();
        assert_eq!(page[0].vehicle_number, "PB1A2");
        assert!(list_by_user(&store, "nobody", 25, 0).await.unwrap().is_empty());
    }

    #[test]
    fn created_at_is_fixed_width_utc() {
        let at = time::macros::datetime!(2024-03-05 07:08:09.1 +05:30);
        assert_eq!(format_created_at(at).unwrap(), "2024-03-05T01:38:09.100Z");
    }
}
