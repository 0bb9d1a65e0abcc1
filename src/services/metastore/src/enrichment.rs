//! Offered-zone enrichment
//!
//! Zone ids are resolved against the inventory one lookup per zone. Results stay
//! aligned with the input order, the first failing zone (by position) aborts the
//! whole enrichment and nothing partial is returned.

use futures::stream::{self, StreamExt, TryStreamExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::InventoryConfig;
use crate::inventory::{InventoryError, ZoneDetailsSource};
use crate::models::{MetastoreError, Result, ZoneDetails, ZoneIdentifier};

/// Run `tasks` with at most `concurrency` in flight, preserving input order
///
/// Resolves to every output in input order, or to the error of the first task
/// (by position) that failed. Tasks after a failure are dropped.
pub async fn gather_fail_fast<I, F, T, E>(tasks: I, concurrency: usize) -> std::result::Result<Vec<T>, E>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = std::result::Result<T, E>>,
{
    stream::iter(tasks)
        .buffered(concurrency.max(1))
        .try_collect()
        .await
}

/// Enriches offered zones with inventory metadata
#[derive(Clone)]
pub struct ZoneEnricher {
    source: Arc<dyn ZoneDetailsSource>,
    max_concurrent_lookups: usize,
    deadline: Option<Duration>,
}

impl std::fmt::Debug for ZoneEnricher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZoneEnricher")
            .field("max_concurrent_lookups", &self.max_concurrent_lookups)
            .field("deadline", &self.deadline)
            .finish()
    }
}

impl ZoneEnricher {
    /// Sequential enricher without a deadline
    pub fn new(source: Arc<dyn ZoneDetailsSource>) -> Self {
        Self {
            source,
            max_concurrent_lookups: 1,
            deadline: None,
        }
    }

    pub fn from_config(source: Arc<dyn ZoneDetailsSource>, config: &InventoryConfig) -> Self {
        Self::new(source)
            .with_max_concurrency(config.max_concurrent_lookups)
            .with_deadline(config.enrichment_deadline())
    }

    pub fn with_max_concurrency(mut self, max_concurrent_lookups: usize) -> Self {
        self.max_concurrent_lookups = max_concurrent_lookups.max(1);
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Resolve geography and geolocation for every offered zone
    pub async fn enrich_offered_zones(&self, zone_ids: &[ZoneIdentifier]) -> Result<Vec<ZoneDetails>> {
        if zone_ids.is_empty() {
            return Ok(Vec::new());
        }

        info!(
            zones = zone_ids.len(),
            concurrency = self.max_concurrent_lookups,
            "Enriching offered zones from inventory"
        );

        let lookups = zone_ids.iter().map(|zone_id| self.lookup(zone_id));
        let gathered = gather_fail_fast(lookups, self.max_concurrent_lookups);

        let outcome = match self.deadline {
            Some(deadline) => tokio::time::timeout(deadline, gathered).await.map_err(|_| {
                warn!(deadline_ms = deadline.as_millis() as u64, "Zone enrichment deadline exceeded");
                MetastoreError::EnrichmentTimeout {
                    millis: deadline.as_millis() as u64,
                }
            })?,
            None => gathered.await,
        };

        Ok(outcome?)
    }

    async fn lookup(&self, zone_id: &ZoneIdentifier) -> std::result::Result<ZoneDetails, InventoryError> {
        debug!(zone_id = %zone_id, "Fetching zone details");

        let response = self.source.fetch_zone_details(zone_id).await.map_err(|e| {
            warn!(zone_id = %zone_id, error = %e, "Zone enrichment failed");
            e
        })?;

        debug!(zone_id = %zone_id, "Zone details resolved");
        Ok(ZoneDetails {
            zone_id: zone_id.clone(),
            geography_details: response.geography_details,
            geolocation: response.geolocation,
        })
    }
}
