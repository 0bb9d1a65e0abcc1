//! EWBI Metastore Library
//!
//! Translation layer between the partner-facing federation API and the
//! cluster-native records that persist application instances and federation
//! relationships.
//!
//! ## Architecture
//!
//! ```text
//! Metastore Service
//! ├── Identity (derived record names and indexing labels)
//! ├── State (allowed lifecycle states per entity kind)
//! ├── Inventory Client (zone details lookups over HTTP)
//! ├── Zone Enricher (ordered, fail-fast enrichment of offered zones)
//! └── Converters (application instance, federation)
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ewbi_metastore::{Config, MetastoreService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let service = MetastoreService::new(config)?;
//!
//!     let name = service.record_name(
//!         ewbi_metastore::EntityKind::ApplicationInstance,
//!         "fed-ctx-1",
//!         "inst-42",
//!     );
//!     println!("{}", name);
//!     Ok(())
//! }
//! ```

pub mod application_instance;
pub mod config;
pub mod enrichment;
pub mod federation;
pub mod identity;
pub mod inventory;
pub mod models;
pub mod state;
pub mod telemetry;

pub use application_instance::{ApplicationInstanceConverter, FieldPolicy, ZoneFieldPolicy};
pub use config::{Config, ConfigOverrides, InventoryConfig, MetastoreConfig};
pub use enrichment::{gather_fail_fast, ZoneEnricher};
pub use federation::FederationConverter;
pub use identity::{derive, MetaOption};
pub use inventory::{InventoryApiClient, InventoryError, ZoneDetailsResponse, ZoneDetailsSource};
pub use models::{
    AppInstanceDetails, ApplicationInstanceRecord, FederationRecord, FederationRequest,
    InstallAppRequest, MetastoreError, Result, ZoneDetails,
};
pub use state::{is_valid, ApplicationInstanceState, EntityKind, FederationState};

use std::sync::Arc;

/// Metastore service
///
/// Wires configuration into the inventory client, the zone enricher and both
/// converters. The endpoint layer holds one instance and calls the converters
/// per request.
#[derive(Debug, Clone)]
pub struct MetastoreService {
    /// Service configuration
    pub config: Arc<Config>,
    /// Zone enrichment over the inventory
    pub enricher: Arc<ZoneEnricher>,
    /// Application instance conversion
    pub application_instances: ApplicationInstanceConverter,
    /// Federation conversion
    pub federations: FederationConverter,
}

impl MetastoreService {
    /// Create a service backed by the HTTP inventory client
    pub fn new(config: Config) -> Result<Self> {
        config
            .validate()
            .map_err(|e| MetastoreError::ConfigurationError {
                message: e.to_string(),
            })?;

        let inventory = InventoryApiClient::new(&config.inventory)?;
        Ok(Self::with_source(config, Arc::new(inventory)))
    }

    /// Create a service with a custom zone details source
    pub fn with_source(config: Config, source: Arc<dyn ZoneDetailsSource>) -> Self {
        let enricher = Arc::new(ZoneEnricher::from_config(source, &config.inventory));
        let relation = config.metastore.relation.clone();

        Self {
            application_instances: ApplicationInstanceConverter::new(relation.clone()),
            federations: FederationConverter::new(enricher.clone()).with_relation(relation),
            enricher,
            config: Arc::new(config),
        }
    }

    /// Namespace new records are created in
    pub fn namespace(&self) -> &str {
        &self.config.metastore.namespace
    }

    /// Derived record name for an entity
    pub fn record_name(&self, kind: EntityKind, federation_context_id: &str, entity_id: &str) -> String {
        identity::derive(kind, federation_context_id, entity_id)
    }

    /// Build a new application instance record in the configured namespace
    pub fn create_application_instance(
        &self,
        request: &InstallAppRequest,
        federation_context_id: &str,
        opts: &[MetaOption],
    ) -> Result<ApplicationInstanceRecord> {
        self.application_instances
            .create(request, federation_context_id, self.namespace(), opts)
    }

    /// Build a new federation record in the configured namespace
    pub fn create_federation(
        &self,
        request: &FederationRequest,
        opts: &[MetaOption],
    ) -> Result<FederationRecord> {
        self.federations.create(request, self.namespace(), opts)
    }

    /// Service health information
    pub fn health(&self) -> serde_json::Value {
        serde_json::json!({
            "service": "ewbi-metastore",
            "status": "healthy",
            "timestamp": chrono::Utc::now(),
            "inventory": {
                "baseUrl": self.config.inventory.resolved_base_url(),
                "maxConcurrentLookups": self.config.inventory.max_concurrent_lookups,
            },
            "namespace": self.namespace(),
            "version": env!("CARGO_PKG_VERSION"),
        })
    }
}
