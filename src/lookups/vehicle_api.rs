use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, error, instrument};

use super::plate::PlateNumber;

/// Registration details as returned upstream: `VEHICLENUMBER`, `OWNER`,
/// `CHASSIS`, `REGDATE`, ... Kept opaque.
pub type VehicleData = Map<String, Value>;

#[derive(Debug, Error)]
pub enum VehicleApiError {
    #[error("Failed to fetch vehicle data: {0}")]
    Request(String),
    #[error("Failed to fetch vehicle data (status {0})")]
    Status(u16),
    #[error("Invalid response from server")]
    InvalidResponse,
}

#[async_trait]
pub trait VehicleApi: Send + Sync {
    async fn lookup(&self, plate: &PlateNumber) -> Result<VehicleData, VehicleApiError>;
}

/// Unauthenticated `GET <base>?vehicle_number=<PLATE>`.
pub struct HttpVehicleApi {
    http: Client,
    base_url: String,
}

impl HttpVehicleApi {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> anyhow::Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            base_url: base_url.to_string(),
        })
    }
}

#[async_trait]
impl VehicleApi for HttpVehicleApi {
    #[instrument(skip_all, fields(plate = %plate))]
    async fn lookup(&self, plate: &PlateNumber) -> Result<VehicleData, VehicleApiError> {
        let res = self
            .http
            .get(&self.base_url)
            .query(&[("vehicle_number", plate.as_str())])
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "vehicle lookup request failed");
                VehicleApiError::Request(e.to_string())
            })?;

        let status = res.status();
        if !status.is_success() {
            error!(%status, "vehicle lookup rejected");
            return Err(VehicleApiError::Status(status.as_u16()));
        }

        match res.json::<Value>().await {
            Ok(Value::Object(data)) => {
                debug!(fields = data.len(), "vehicle lookup answered");
                Ok(data)
            }
            Ok(_) | Err(_) => Err(VehicleApiError::InvalidResponse),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn plate() -> PlateNumber {
        PlateNumber::parse("PB10BL2646").unwrap()
    }

    async fn api_answering(template: ResponseTemplate) -> (MockServer, HttpVehicleApi) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .and(query_param("vehicle_number", "PB10BL2646"))
            .respond_with(template)
            .expect(1)
            .mount(&server)
            .await;
        let api = HttpVehicleApi::new(&format!("{}/", server.uri()), None).unwrap();
        (server, api)
    }

    #[tokio::test]
    async fn returns_the_object_fields() {
        let (_server, api) = api_answering(ResponseTemplate::new(200).set_body_json(json!({
            "VEHICLENUMBER": "PB10BL2646 ",
            "OWNER": "A SINGH",
            "REGDATE": "01-Jan-2015",
        })))
        .await;

        let data = api.lookup(&plate()).await.unwrap();
        assert_eq!(data["OWNER"], "A SINGH");
        assert_eq!(data.len(), 3);
    }

    #[tokio::test]
    async fn non_success_status_fails() {
        let (_server, api) = api_answering(ResponseTemplate::new(500)).await;
        let err = api.lookup(&plate()).await.unwrap_err();
        assert!(matches!(err, VehicleApiError::Status(500)));
    }

    #[tokio::test]
    async fn non_object_json_is_invalid() {
        let (_server, api) =
            api_answering(ResponseTemplate::new(200).set_body_json(json!(["PB10BL2646"]))).await;
        let err = api.lookup(&plate()).await.unwrap_err();
        assert!(matches!(err, VehicleApiError::InvalidResponse));
    }

    #[tokio::test]
    async fn non_json_body_is_invalid() {
        let (_server, api) =
            api_answering(ResponseTemplate::new(200).set_body_string("<html>oops</html>")).await;
        let err = api.lookup(&plate()).await.unwrap_err();
        assert!(matches!(err, VehicleApiError::InvalidResponse));
    }

    #[tokio::test]
    async fn configured_timeout_applies() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "OWNER": "X" }))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let api = HttpVehicleApi::new(&server.uri(), Some(Duration::from_millis(100))).unwrap();
        let err = api.lookup(&plate()).await.unwrap_err();
        assert!(matches!(err, VehicleApiError::Request(_)));
    }
}
