//! Inventory API client
//!
//! Looks up geography and geolocation metadata for a single zone. Every call is
//! one GET against `{base}/zone-details?zoneid={zone}`; retries belong to the
//! caller.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::InventoryConfig;

/// Inventory response for one zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneDetailsResponse {
    pub geography_details: String,
    pub geolocation: String,
}

/// Failures of a single inventory lookup
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InventoryError {
    /// The request URL could not be built
    #[error("Invalid inventory URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    /// The request never produced a response
    #[error("Inventory request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The request exceeded the configured timeout
    #[error("Inventory request to {url} timed out")]
    Timeout { url: String },

    /// The inventory answered with a non-200 status
    #[error("HTTP request failed with status: {status}")]
    Status { code: u16, status: String },

    /// The body was not a zone details document
    #[error("Failed to decode inventory response: {message}")]
    Decode { message: String },
}

/// Source of zone enrichment data
#[async_trait]
pub trait ZoneDetailsSource: Send + Sync {
    async fn fetch_zone_details(&self, zone_id: &str)
        -> Result<ZoneDetailsResponse, InventoryError>;
}

/// HTTP client for the inventory API
#[derive(Debug, Clone)]
pub struct InventoryApiClient {
    base_url: Url,
    http_client: Client,
}

impl InventoryApiClient {
    /// Build a client from configuration; the base URL is fixed for the client's lifetime
    pub fn new(config: &InventoryConfig) -> Result<Self, InventoryError> {
        let raw = config.resolved_base_url();
        let base_url = Url::parse(raw).map_err(|e| InventoryError::InvalidUrl {
            url: raw.to_string(),
            message: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(InventoryError::InvalidUrl {
                url: raw.to_string(),
                message: "URL cannot be a base".to_string(),
            });
        }

        let http_client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| InventoryError::InvalidUrl {
                url: raw.to_string(),
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        info!(base_url = %base_url, "Inventory API client configured");

        Ok(Self {
            base_url,
            http_client,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// URL of the zone details lookup for `zone_id`
    pub fn zone_details_url(&self, zone_id: &str) -> Result<Url, InventoryError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| InventoryError::InvalidUrl {
                url: self.base_url.to_string(),
                message: "URL cannot be a base".to_string(),
            })?
            .pop_if_empty()
            .push("zone-details");
        url.query_pairs_mut().clear().append_pair("zoneid", zone_id);
        Ok(url)
    }

    fn map_send_error(url: &Url, err: reqwest::Error) -> InventoryError {
        if err.is_timeout() {
            InventoryError::Timeout {
                url: url.to_string(),
            }
        } else if err.is_builder() {
            InventoryError::InvalidUrl {
                url: url.to_string(),
                message: err.to_string(),
            }
        } else {
            InventoryError::Transport {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl ZoneDetailsSource for InventoryApiClient {
    async fn fetch_zone_details(
        &self,
        zone_id: &str,
    ) -> Result<ZoneDetailsResponse, InventoryError> {
        let url = self.zone_details_url(zone_id)?;
        debug!(zone_id = %zone_id, url = %url, "Requesting zone details from inventory");

        let response = self
            .http_client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Self::map_send_error(&url, e))?;

        let status = response.status();
        debug!(zone_id = %zone_id, status = %status, "Inventory responded");

        if status != StatusCode::OK {
            warn!(zone_id = %zone_id, status = %status, "Inventory lookup failed");
            return Err(InventoryError::Status {
                code: status.as_u16(),
                status: status.to_string(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Self::map_send_error(&url, e))?;

        serde_json::from_slice::<ZoneDetailsResponse>(&body).map_err(|e| {
            warn!(zone_id = %zone_id, error = %e, "Inventory response could not be decoded");
            InventoryError::Decode {
                message: e.to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(base_url: &str) -> InventoryApiClient {
        let config = InventoryConfig {
            base_url: Some(base_url.to_string()),
            ..Default::default()
        };
        InventoryApiClient::new(&config).unwrap()
    }

    #[test]
    fn test_zone_details_url() {
        let client = client_for("http://10.10.0.85:5000/inventory/api/v1");
        let url = client.zone_details_url("zone-a").unwrap();
        assert_eq!(
            url.as_str(),
            "http://10.10.0.85:5000/inventory/api/v1/zone-details?zoneid=zone-a"
        );

        let client = client_for("http://inventory.local/api/");
        let url = client.zone_details_url("eu west/1").unwrap();
        assert_eq!(
            url.as_str(),
            "http://inventory.local/api/zone-details?zoneid=eu+west%2F1"
        );
    }

    #[test]
    fn test_default_base_url() {
        let client = InventoryApiClient::new(&InventoryConfig::default()).unwrap();
        assert_eq!(
            client.base_url().as_str(),
            "http://10.10.0.85:5000/inventory/api/v1"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let config = InventoryConfig {
            base_url: Some("::not-a-url".to_string()),
            ..Default::default()
        };
        let err = InventoryApiClient::new(&config).unwrap_err();
        assert!(matches!(err, InventoryError::InvalidUrl { .. }));

        let config = InventoryConfig {
            base_url: Some("mailto:ops@example.com".to_string()),
            ..Default::default()
        };
        let err = InventoryApiClient::new(&config).unwrap_err();
        assert!(matches!(err, InventoryError::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn test_fetch_zone_details() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/inventory/api/v1/zone-details"))
            .and(query_param("zoneid", "zone-milan"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "geographyDetails": "aws,Milan",
                "geolocation": "45.4642,9.19"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&format!("{}/inventory/api/v1", server.uri()));
        let details = client.fetch_zone_details("zone-milan").await.unwrap();

        assert_eq!(details.geography_details, "aws,Milan");
        assert_eq!(details.geolocation, "45.4642,9.19");
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/zone-details"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server.uri());
        let err = client.fetch_zone_details("missing").await.unwrap_err();

        match &err {
            InventoryError::Status { code, status } => {
                assert_eq!(*code, 404);
                assert!(status.contains("Not Found"));
            }
            other => panic!("expected status error, got {:?}", other),
        }
        assert!(err.to_string().contains("404 Not Found"));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/zone-details"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"geographyDetails\": 42"))
            .mount(&server)
            .await;

        let client = client_for(&server.uri());
        let err = client.fetch_zone_details("zone-a").await.unwrap_err();
        assert!(matches!(err, InventoryError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_missing_field_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/zone-details"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "geographyDetails": "gcp,Paris" })),
            )
            .mount(&server)
            .await;

        let client = client_for(&server.uri());
        let err = client.fetch_zone_details("zone-b").await.unwrap_err();
        assert!(matches!(err, InventoryError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_transport_failure() {
        // Port 9 (discard) on localhost is not expected to accept HTTP
        let client = client_for("http://127.0.0.1:9/inventory");
        let err = client.fetch_zone_details("zone-a").await.unwrap_err();
        assert!(matches!(
            err,
            InventoryError::Transport { .. } | InventoryError::Timeout { .. }
        ));
    }

    #[tokio::test]
    async fn test_request_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(std::time::Duration::from_secs(3))
                    .set_body_json(serde_json::json!({
                        "geographyDetails": "aws,Milan",
                        "geolocation": "45.4642,9.19"
                    })),
            )
            .mount(&server)
            .await;

        let config = InventoryConfig {
            base_url: Some(server.uri()),
            request_timeout: 1,
            ..Default::default()
        };
        let client = InventoryApiClient::new(&config).unwrap();
        let err = client.fetch_zone_details("zone-a").await.unwrap_err();
        assert!(matches!(err, InventoryError::Timeout { .. }));
    }
}
