//! Gateway inventory - the managed gateways currently present in the network

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{info, warn};

use crate::config::TagConventions;
use crate::error::NatResult;
use crate::idle::parse_timestamp;
use crate::network::{CloudNetwork, Filter};
use crate::resource::{GatewayRecord, GatewayState, NatGateway};

pub struct GatewayInventory {
    network: Arc<dyn CloudNetwork>,
    network_id: String,
    tags: TagConventions,
}

impl GatewayInventory {
    pub fn new(
        network: Arc<dyn CloudNetwork>,
        network_id: impl Into<String>,
        tags: TagConventions,
    ) -> Self {
        Self {
            network,
            network_id: network_id.into(),
            tags,
        }
    }

    fn filters(&self) -> Vec<Filter> {
        vec![
            Filter::tag(&self.tags.ownership_key, self.tags.truthy_values.iter().cloned()),
            Filter::state(GatewayState::LIVE),
            Filter::network(&self.network_id),
        ]
    }

    /// List managed gateways that are pending or available
    ///
    /// An empty list is the normal "no gateway" answer, not an error.
    /// `now` stands in for a missing creation time.
    pub async fn list_managed_gateways(
        &self,
        now: DateTime<Utc>,
    ) -> NatResult<Vec<GatewayRecord>> {
        let gateways = self.network.list_gateways(&self.filters()).await?;

        let records: Vec<GatewayRecord> = gateways
            .into_iter()
            .filter(|gw| gw.state.is_live())
            .map(|gw| self.to_record(gw, now))
            .collect();

        if records.is_empty() {
            info!("Checking for existing gateways, found none");
        } else {
            let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
            info!("Checking for existing gateways, found {:?}", ids);
        }
        Ok(records)
    }

    /// A missing creation time becomes `now`. If LastRequested is also
    /// missing or unreadable the gateway looks brand new on every run and is
    /// never swept until demand refreshes its tag; that case is warned about
    /// separately.
    fn to_record(&self, gateway: NatGateway, now: DateTime<Utc>) -> GatewayRecord {
        let created_at = gateway.created_at.unwrap_or_else(|| {
            warn!("Gateway {} has no creation time, treating it as new", gateway.id);
            now
        });

        let last_requested = match gateway.tag(&self.tags.last_requested_key) {
            Some(raw) => {
                let parsed = parse_timestamp(raw);
                if parsed.is_none() {
                    warn!(
                        "Gateway {} has unreadable {} tag {:?}, falling back to age",
                        gateway.id, self.tags.last_requested_key, raw
                    );
                }
                parsed
            }
            None => None,
        };

        if gateway.created_at.is_none() && last_requested.is_none() {
            warn!(
                "Gateway {} has neither a creation time nor a usable {} tag, \
                 it will not be swept until demand refreshes it",
                gateway.id, self.tags.last_requested_key
            );
        }

        GatewayRecord {
            id: gateway.id,
            state: gateway.state,
            created_at,
            last_requested,
        }
    }
}
