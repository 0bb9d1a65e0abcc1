//! Application instance conversion
//!
//! The write path builds a fresh persisted record from a partner install
//! request. The read path projects a record's observed status back into the
//! partner's instance details view.

use tracing::{debug, info};

use crate::identity::{self, MetaOption, HOST_RELATION};
use crate::models::{
    AccessPointEntry, AccessPointInfo, AppInstanceDetails, ApplicationInstanceRecord,
    ApplicationInstanceSpec, InstallAppRequest, MetastoreError, RecordMeta, Result,
    ServiceEndpoint, ZoneSpec,
};
use crate::state::{ApplicationInstanceState, EntityKind};

/// What to store when an optional partner field is absent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldPolicy {
    /// Store an empty string
    EmptyString,
    /// Store the given value
    Default(String),
    /// Reject the request
    Required,
}

impl FieldPolicy {
    fn resolve(&self, field: &str, value: Option<String>) -> Result<String> {
        match (value, self) {
            (Some(value), _) => Ok(value),
            (None, FieldPolicy::EmptyString) => Ok(String::new()),
            (None, FieldPolicy::Default(default)) => Ok(default.clone()),
            (None, FieldPolicy::Required) => {
                Err(MetastoreError::validation(field, "field is required"))
            }
        }
    }
}

/// Per-field policies for the optional parts of a zone selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneFieldPolicy {
    pub resource_consumption: FieldPolicy,
    pub res_pool: FieldPolicy,
}

impl Default for ZoneFieldPolicy {
    fn default() -> Self {
        Self {
            resource_consumption: FieldPolicy::EmptyString,
            res_pool: FieldPolicy::EmptyString,
        }
    }
}

/// Converts between install requests and application instance records
#[derive(Debug, Clone)]
pub struct ApplicationInstanceConverter {
    zone_policy: ZoneFieldPolicy,
    relation: String,
}

impl Default for ApplicationInstanceConverter {
    fn default() -> Self {
        Self::new(HOST_RELATION)
    }
}

impl ApplicationInstanceConverter {
    pub fn new(relation: impl Into<String>) -> Self {
        Self {
            zone_policy: ZoneFieldPolicy::default(),
            relation: relation.into(),
        }
    }

    pub fn with_zone_policy(mut self, zone_policy: ZoneFieldPolicy) -> Self {
        self.zone_policy = zone_policy;
        self
    }

    /// Build the persisted record for a new application instance
    pub fn create(
        &self,
        request: &InstallAppRequest,
        federation_context_id: &str,
        namespace: &str,
        opts: &[MetaOption],
    ) -> Result<ApplicationInstanceRecord> {
        require("federationContextId", federation_context_id)?;
        require("appInstanceId", &request.app_instance_id)?;
        require("zoneInfo.zoneId", &request.zone_info.zone_id)?;
        require("zoneInfo.flavourId", &request.zone_info.flavour_id)?;

        let zone = &request.zone_info;
        let resource_consumption = self.zone_policy.resource_consumption.resolve(
            "zoneInfo.resourceConsumption",
            zone.resource_consumption.map(|rc| rc.as_str().to_string()),
        )?;
        let res_pool = self
            .zone_policy
            .res_pool
            .resolve("zoneInfo.resPool", zone.res_pool.clone())?;

        let mut metadata = RecordMeta {
            name: identity::derive(
                EntityKind::ApplicationInstance,
                federation_context_id,
                &request.app_instance_id,
            ),
            namespace: namespace.to_string(),
            labels: identity::record_labels(
                federation_context_id,
                &request.app_instance_id,
                &self.relation,
            ),
            ..Default::default()
        };
        identity::apply_options(&mut metadata, opts)?;

        let record = ApplicationInstanceRecord {
            metadata,
            spec: ApplicationInstanceSpec {
                app_provider_id: request.app_provider_id.clone(),
                app_id: request.app_id.clone(),
                app_version: request.app_version.clone(),
                zone_info: ZoneSpec {
                    zone_id: zone.zone_id.clone(),
                    flavour_id: zone.flavour_id.clone(),
                    resource_consumption,
                    res_pool,
                },
                callback_link: request.app_inst_callback_link.clone(),
            },
            status: Default::default(),
        };

        info!(
            name = %record.metadata.name,
            federation_context_id = %federation_context_id,
            app_instance_id = %request.app_instance_id,
            "Converted install request to application instance record"
        );
        Ok(record)
    }

    /// Project a record's observed status into the partner details view
    pub fn to_details(&self, record: &ApplicationInstanceRecord) -> Result<AppInstanceDetails> {
        let state = match record.status.state.as_str() {
            "" => None,
            raw => Some(raw.parse::<ApplicationInstanceState>().map_err(|_| {
                MetastoreError::InvalidPersistedState {
                    kind: EntityKind::ApplicationInstance.to_string(),
                    state: raw.to_string(),
                }
            })?),
        };

        let details = AppInstanceDetails {
            app_instance_state: state,
            accesspoint_info: record
                .status
                .access_point_info
                .iter()
                .map(convert_access_point)
                .collect(),
        };

        debug!(
            name = %record.metadata.name,
            state = ?details.app_instance_state,
            access_points = details.accesspoint_info.len(),
            "Converted application instance record to details"
        );
        Ok(details)
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(MetastoreError::validation(field, "must not be empty"));
    }
    Ok(())
}

fn single_address(address: &str) -> Vec<String> {
    if address.is_empty() {
        Vec::new()
    } else {
        vec![address.to_string()]
    }
}

fn convert_access_point(info: &AccessPointInfo) -> AccessPointEntry {
    let point = &info.access_point;
    AccessPointEntry {
        interface_id: info.interface_id.clone(),
        access_points: ServiceEndpoint {
            port: point.port,
            fqdn: (!point.fqdn.is_empty()).then(|| point.fqdn.clone()),
            ipv4_addresses: single_address(&point.ipv4_addresses),
            ipv6_addresses: single_address(&point.ipv6_addresses),
        },
    }
}
