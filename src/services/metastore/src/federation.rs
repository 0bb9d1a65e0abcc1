//! Federation conversion
//!
//! Federation records are keyed by the federation context id. Partner requests
//! either create a record or update an existing one in place; offered zones are
//! declared by the provider and never written from a partner request. Reading a
//! record back enriches every offered zone from the inventory.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::enrichment::ZoneEnricher;
use crate::identity::{
    self, label_key, MetaOption, FEDERATION_CONTEXT_ID_LABEL, FEDERATION_RELATION_LABEL,
    HOST_RELATION, ID_LABEL,
};
use crate::models::{
    CallbackCredentials, FederationCredentials, FederationRecord, FederationRequest,
    MetastoreError, MobileNetworkCodes, MobileNetworkIds, Origin, Partner, RecordMeta, Result,
};
use crate::state::{EntityKind, FederationState};

/// Converts between partner federation requests and federation records
#[derive(Debug, Clone)]
pub struct FederationConverter {
    enricher: Arc<ZoneEnricher>,
    relation: String,
}

impl FederationConverter {
    pub fn new(enricher: Arc<ZoneEnricher>) -> Self {
        Self {
            enricher,
            relation: HOST_RELATION.to_string(),
        }
    }

    pub fn with_relation(mut self, relation: impl Into<String>) -> Self {
        self.relation = relation.into();
        self
    }

    /// Build a fresh record for a new federation
    pub fn create(
        &self,
        request: &FederationRequest,
        namespace: &str,
        opts: &[MetaOption],
    ) -> Result<FederationRecord> {
        let context_id = context_id_of(request)?;

        let mut record = FederationRecord {
            metadata: RecordMeta {
                name: identity::derive(EntityKind::Federation, context_id, context_id),
                namespace: namespace.to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        self.apply_update(request, &mut record)?;
        identity::apply_options(&mut record.metadata, opts)?;

        info!(
            name = %record.metadata.name,
            federation_context_id = %context_id,
            "Converted federation request to new federation record"
        );
        Ok(record)
    }

    /// Update an existing record in place from a partner request
    ///
    /// The record is left untouched when the request is rejected. Offered zones
    /// and status are never modified.
    pub fn apply_update<'a>(
        &self,
        request: &FederationRequest,
        existing: &'a mut FederationRecord,
    ) -> Result<&'a mut FederationRecord> {
        let context_id = context_id_of(request)?;

        if let Some(current) = existing
            .metadata
            .labels
            .get(&label_key(FEDERATION_CONTEXT_ID_LABEL))
        {
            if current != context_id {
                warn!(
                    name = %existing.metadata.name,
                    existing = %current,
                    requested = %context_id,
                    "Refusing federation update for another context"
                );
                return Err(MetastoreError::ContextMismatch {
                    existing: current.clone(),
                    requested: context_id.to_string(),
                });
            }
        }

        let origin_op = origin_from(request)?;
        let partner = partner_from(request)?;

        let labels = &mut existing.metadata.labels;
        labels.insert(label_key(FEDERATION_CONTEXT_ID_LABEL), context_id.to_string());
        labels.insert(label_key(ID_LABEL), context_id.to_string());
        labels.insert(label_key(FEDERATION_RELATION_LABEL), self.relation.clone());

        let spec = &mut existing.spec;
        spec.initial_date = Some(request.initial_date);
        spec.origin_op = origin_op;
        spec.partner = partner;
        spec.accepted_availability_zones = request
            .accepted_availability_zones
            .clone()
            .unwrap_or_default();

        debug!(
            name = %existing.metadata.name,
            accepted_zones = existing.spec.accepted_availability_zones.len(),
            "Applied federation request to record"
        );
        Ok(existing)
    }

    /// Project a record into the partner federation view, enriching offered zones
    pub async fn to_wire(&self, record: &FederationRecord) -> Result<FederationRequest> {
        let context_id = record
            .metadata
            .labels
            .get(&label_key(FEDERATION_CONTEXT_ID_LABEL))
            .cloned()
            .ok_or_else(|| {
                MetastoreError::validation(
                    "metadata.labels",
                    "federation context id label is missing",
                )
            })?;
        let initial_date = record.spec.initial_date.ok_or_else(|| {
            MetastoreError::validation("spec.initialDate", "record has no initial date")
        })?;

        let offered = self
            .enricher
            .enrich_offered_zones(&record.spec.offered_availability_zones)
            .await?;

        let spec = &record.spec;
        let federation = FederationRequest {
            federation_context_id: context_id,
            initial_date,
            orig_op_country_code: Some(spec.origin_op.country_code.clone()),
            orig_op_fixed_network_codes: Some(spec.origin_op.fixed_network_codes.clone()),
            orig_op_mobile_network_codes: Some(MobileNetworkIds {
                mcc: Some(spec.origin_op.mobile_network_codes.mcc.clone()),
                mncs: Some(spec.origin_op.mobile_network_codes.mnc.clone()),
            }),
            partner_callback_credentials: Some(CallbackCredentials {
                client_id: spec.partner.callback_credentials.client_id.clone(),
                token_url: spec.partner.callback_credentials.token_url.clone(),
            }),
            partner_status_link: spec.partner.status_link.clone(),
            accepted_availability_zones: Some(spec.accepted_availability_zones.clone()),
            offered_availability_zones: Some(offered),
        };

        info!(
            name = %record.metadata.name,
            offered_zones = spec.offered_availability_zones.len(),
            "Converted federation record to wire view"
        );
        Ok(federation)
    }

    /// Validated lifecycle state of a record, `None` until it has been reconciled
    pub fn state_of(record: &FederationRecord) -> Result<Option<FederationState>> {
        match record.status.state.as_str() {
            "" => Ok(None),
            raw => raw.parse::<FederationState>().map(Some).map_err(|_| {
                MetastoreError::InvalidPersistedState {
                    kind: EntityKind::Federation.to_string(),
                    state: raw.to_string(),
                }
            }),
        }
    }
}

fn context_id_of(request: &FederationRequest) -> Result<&str> {
    let context_id = request.federation_context_id.as_str();
    if context_id.trim().is_empty() {
        return Err(MetastoreError::validation(
            "federationContextId",
            "must not be empty",
        ));
    }
    Ok(context_id)
}

fn origin_from(request: &FederationRequest) -> Result<Origin> {
    let mobile = request
        .orig_op_mobile_network_codes
        .as_ref()
        .ok_or_else(|| MetastoreError::validation("origOPMobileNetworkCodes", "field is required"))?;
    let mcc = mobile
        .mcc
        .clone()
        .ok_or_else(|| MetastoreError::validation("origOPMobileNetworkCodes.mcc", "field is required"))?;
    let mnc = mobile
        .mncs
        .clone()
        .ok_or_else(|| MetastoreError::validation("origOPMobileNetworkCodes.mncs", "field is required"))?;

    Ok(Origin {
        country_code: request.orig_op_country_code.clone().unwrap_or_default(),
        fixed_network_codes: request
            .orig_op_fixed_network_codes
            .clone()
            .unwrap_or_default(),
        mobile_network_codes: MobileNetworkCodes { mcc, mnc },
    })
}

fn partner_from(request: &FederationRequest) -> Result<Partner> {
    let credentials = request
        .partner_callback_credentials
        .as_ref()
        .ok_or_else(|| MetastoreError::validation("partnerCallbackCredentials", "field is required"))?;

    Ok(Partner {
        callback_credentials: FederationCredentials {
            client_id: credentials.client_id.clone(),
            token_url: credentials.token_url.clone(),
        },
        status_link: request.partner_status_link.clone(),
    })
}
