//! Data models for the EWBI metastore
//!
//! Two families of types live here: the wire models exchanged with federation
//! partners and the persisted records stored by the cluster. Conversions between
//! them are implemented in [`crate::application_instance`] and [`crate::federation`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::inventory::InventoryError;

/// Federation context identifier scoping every record to one partner relationship
pub type FederationContextId = String;

/// Zone identifier as declared by the exporting operator
pub type ZoneIdentifier = String;

// ================================================================================================
// Wire Models
// ================================================================================================

/// Partner request to install an application instance in a zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallAppRequest {
    /// Provider of the application
    pub app_provider_id: String,
    /// Application identifier
    pub app_id: String,
    /// Application version
    pub app_version: String,
    /// Instance identifier chosen by the partner
    pub app_instance_id: String,
    /// Zone selection for the instance
    pub zone_info: ZoneSelection,
    /// Link the partner wants status callbacks on
    pub app_inst_callback_link: String,
}

/// Zone and flavour the partner selected for an instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneSelection {
    pub zone_id: ZoneIdentifier,
    pub flavour_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_consumption: Option<ResourceConsumption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub res_pool: Option<String>,
}

/// How the instance consumes zone resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceConsumption {
    #[serde(rename = "RESERVED_RES_SHALL")]
    ReservedResShall,
    #[serde(rename = "RESERVED_RES_PREFER")]
    ReservedResPrefer,
    #[serde(rename = "RESERVED_RES_AVOID")]
    ReservedResAvoid,
    #[serde(rename = "RESERVED_RES_FORBID")]
    ReservedResForbid,
}

impl ResourceConsumption {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceConsumption::ReservedResShall => "RESERVED_RES_SHALL",
            ResourceConsumption::ReservedResPrefer => "RESERVED_RES_PREFER",
            ResourceConsumption::ReservedResAvoid => "RESERVED_RES_AVOID",
            ResourceConsumption::ReservedResForbid => "RESERVED_RES_FORBID",
        }
    }
}

/// Read-side projection of an application instance returned to the partner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInstanceDetails {
    /// Observed lifecycle state, absent until the instance has been reconciled
    pub app_instance_state: Option<crate::state::ApplicationInstanceState>,
    /// Access points exposed by the instance
    pub accesspoint_info: Vec<AccessPointEntry>,
}

/// One interface of an application instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessPointEntry {
    pub interface_id: String,
    pub access_points: ServiceEndpoint,
}

/// Reachability information for one interface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceEndpoint {
    pub port: i32,
    pub fqdn: Option<String>,
    pub ipv4_addresses: Vec<String>,
    pub ipv6_addresses: Vec<String>,
}

/// Partner federation request, also used as the read-side federation view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederationRequest {
    /// Context id the federation is scoped to; carried out of band on the wire
    #[serde(skip)]
    pub federation_context_id: FederationContextId,
    pub initial_date: DateTime<Utc>,
    #[serde(rename = "origOPCountryCode", default)]
    pub orig_op_country_code: Option<String>,
    #[serde(rename = "origOPFixedNetworkCodes", default)]
    pub orig_op_fixed_network_codes: Option<Vec<String>>,
    #[serde(rename = "origOPMobileNetworkCodes", default)]
    pub orig_op_mobile_network_codes: Option<MobileNetworkIds>,
    #[serde(default)]
    pub partner_callback_credentials: Option<CallbackCredentials>,
    pub partner_status_link: String,
    #[serde(default)]
    pub accepted_availability_zones: Option<Vec<ZoneIdentifier>>,
    #[serde(default)]
    pub offered_availability_zones: Option<Vec<ZoneDetails>>,
}

/// Mobile network codes of the originating operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MobileNetworkIds {
    pub mcc: Option<String>,
    pub mncs: Option<Vec<String>>,
}

/// Credentials the host uses to call back into the partner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackCredentials {
    pub client_id: String,
    pub token_url: String,
}

/// Offered zone, enriched with inventory data on the read path
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneDetails {
    pub zone_id: ZoneIdentifier,
    #[serde(default)]
    pub geography_details: String,
    #[serde(default)]
    pub geolocation: String,
}

// ================================================================================================
// Persisted Records
// ================================================================================================

/// Metadata shared by every persisted record
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMeta {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owner_references: Vec<OwnerReference>,
}

/// Reference to the record owning another record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    pub kind: String,
    pub name: String,
}

/// Persisted application instance
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationInstanceRecord {
    pub metadata: RecordMeta,
    pub spec: ApplicationInstanceSpec,
    #[serde(default)]
    pub status: ApplicationInstanceStatus,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationInstanceSpec {
    pub app_provider_id: String,
    pub app_id: String,
    pub app_version: String,
    pub zone_info: ZoneSpec,
    pub callback_link: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneSpec {
    pub zone_id: String,
    pub flavour_id: String,
    pub resource_consumption: String,
    pub res_pool: String,
}

/// Observed state, owned by the reconciliation engine
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationInstanceStatus {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub access_point_info: Vec<AccessPointInfo>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessPointInfo {
    pub interface_id: String,
    pub access_point: AccessPoint,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessPoint {
    pub port: i32,
    pub fqdn: String,
    pub ipv4_addresses: String,
    pub ipv6_addresses: String,
}

/// Persisted federation relationship
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederationRecord {
    pub metadata: RecordMeta,
    pub spec: FederationSpec,
    #[serde(default)]
    pub status: FederationStatus,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederationSpec {
    pub initial_date: Option<DateTime<Utc>>,
    #[serde(rename = "originOP")]
    pub origin_op: Origin,
    pub partner: Partner,
    #[serde(default)]
    pub accepted_availability_zones: Vec<ZoneIdentifier>,
    /// Provider-declared zones, synced out of band from the inventory
    #[serde(default)]
    pub offered_availability_zones: Vec<ZoneIdentifier>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Origin {
    pub country_code: String,
    pub fixed_network_codes: Vec<String>,
    pub mobile_network_codes: MobileNetworkCodes,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MobileNetworkCodes {
    #[serde(rename = "mcc")]
    pub mcc: String,
    #[serde(rename = "mnc")]
    pub mnc: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Partner {
    pub callback_credentials: FederationCredentials,
    pub status_link: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederationCredentials {
    pub client_id: String,
    pub token_url: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederationStatus {
    #[serde(default)]
    pub state: String,
}

// ================================================================================================
// Error Types
// ================================================================================================

/// Result type alias for metastore operations
pub type Result<T> = std::result::Result<T, MetastoreError>;

/// Errors raised while converting, validating or enriching records
#[derive(Debug, thiserror::Error)]
pub enum MetastoreError {
    /// Required field missing or malformed
    #[error("Validation error: {field} - {message}")]
    ValidationError { field: String, message: String },

    /// Persisted state string outside the allowed set for its kind
    #[error("Invalid persisted state for {kind}: {state}")]
    InvalidPersistedState { kind: String, state: String },

    /// Metadata option attempted to set a derived label
    #[error("Label {key} is reserved and cannot be set by callers")]
    ReservedLabel { key: String },

    /// Request targets a record owned by another federation context
    #[error("Federation context mismatch: record belongs to {existing}, request is for {requested}")]
    ContextMismatch { existing: String, requested: String },

    /// Inventory lookup failed
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    /// Enrichment did not complete within its deadline
    #[error("Zone enrichment timed out after {millis}ms")]
    EnrichmentTimeout { millis: u64 },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },
}

impl MetastoreError {
    pub(crate) fn validation(field: &str, message: impl Into<String>) -> Self {
        MetastoreError::ValidationError {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// HTTP status the endpoint layer should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            MetastoreError::ValidationError { .. } => 400,
            MetastoreError::ReservedLabel { .. } => 400,
            MetastoreError::ContextMismatch { .. } => 409,
            MetastoreError::Inventory(_) => 502,
            MetastoreError::EnrichmentTimeout { .. } => 504,
            _ => 500,
        }
    }

    /// Stable error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            MetastoreError::ValidationError { .. } => "VALIDATION_ERROR",
            MetastoreError::InvalidPersistedState { .. } => "INVALID_PERSISTED_STATE",
            MetastoreError::ReservedLabel { .. } => "RESERVED_LABEL",
            MetastoreError::ContextMismatch { .. } => "CONTEXT_MISMATCH",
            MetastoreError::Inventory(_) => "INVENTORY_ERROR",
            MetastoreError::EnrichmentTimeout { .. } => "ENRICHMENT_TIMEOUT",
            MetastoreError::ConfigurationError { .. } => "CONFIG_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_request_wire_names() {
        let body = serde_json::json!({
            "appProviderId": "prov-1",
            "appId": "app-1",
            "appVersion": "1.0.0",
            "appInstanceId": "inst-1",
            "zoneInfo": {
                "zoneId": "zone-a",
                "flavourId": "small",
                "resourceConsumption": "RESERVED_RES_AVOID"
            },
            "appInstCallbackLink": "https://partner.example.com/cb"
        });

        let request: InstallAppRequest = serde_json::from_value(body).unwrap();
        assert_eq!(request.zone_info.zone_id, "zone-a");
        assert_eq!(
            request.zone_info.resource_consumption,
            Some(ResourceConsumption::ReservedResAvoid)
        );
        assert!(request.zone_info.res_pool.is_none());
    }

    #[test]
    fn test_federation_request_skips_context_id() {
        let body = serde_json::json!({
            "initialDate": "2024-05-01T10:00:00Z",
            "origOPCountryCode": "IT",
            "partnerStatusLink": "https://partner.example.com/status"
        });

        let request: FederationRequest = serde_json::from_value(body).unwrap();
        assert!(request.federation_context_id.is_empty());
        assert_eq!(request.orig_op_country_code.as_deref(), Some("IT"));

        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("federationContextId").is_none());
    }

    #[test]
    fn test_error_codes() {
        let err = MetastoreError::validation("zoneInfo.zoneId", "must not be empty");
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert!(err.to_string().contains("zoneInfo.zoneId"));

        let err = MetastoreError::EnrichmentTimeout { millis: 5000 };
        assert_eq!(err.status_code(), 504);
    }
}
