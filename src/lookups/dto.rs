use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::render::{render_fields, DisplayField};
use super::repo::VehicleLookupRecord;

#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    pub vehicle_number: String,
}

#[derive(Debug, Deserialize)]
pub struct LookupRequest {
    pub vehicle_number: String,
    /// Must be `true`; the charge happens only after explicit confirmation.
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Serialize)]
pub struct HistoryItem {
    pub id: String,
    pub vehicle_number: String,
    pub owner: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub fields: Vec<DisplayField>,
}

impl From<VehicleLookupRecord> for HistoryItem {
    fn from(record: VehicleLookupRecord) -> Self {
        let fields = record.data().map(|d| render_fields(&d)).unwrap_or_default();
        Self {
            id: record.id,
            vehicle_number: record.vehicle_number,
            owner: record.owner,
            created_at: record.created_at,
            fields,
        }
    }
}
