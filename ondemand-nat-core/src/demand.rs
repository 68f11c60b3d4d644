//! Demand probe - does any running workload in the network need egress?

use std::sync::Arc;

use log::{debug, info};

use crate::config::TagConventions;
use crate::error::NatResult;
use crate::network::{CloudNetwork, Filter};
use crate::resource::find_tag;

/// Instance state that counts as demand
const RUNNING: &str = "running";

pub struct DemandProbe {
    network: Arc<dyn CloudNetwork>,
    network_id: String,
    tags: TagConventions,
}

impl DemandProbe {
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
            Filter::tag(&self.tags.demand_key, self.tags.truthy_values.iter().cloned()),
            Filter::state([RUNNING]),
            Filter::network(&self.network_id),
        ]
    }

    /// Returns true iff at least one running, demand-tagged instance exists
    pub async fn is_egress_needed(&self) -> NatResult<bool> {
        let instances = self.network.list_instances(&self.filters()).await?;

        // The provider filter is authoritative, but the truthy match is
        // re-checked here so it stays case-sensitive whatever the backend does.
        let needed = instances.iter().any(|i| {
            i.state == RUNNING
                && find_tag(&i.tags, &self.tags.demand_key)
                    .is_some_and(|v| self.tags.is_truthy(v))
        });

        debug!(
            "{} candidate instance(s) returned for network {}",
            instances.len(),
            self.network_id
        );
        info!(
            "Checking if NAT gateway is required - {}",
            if needed { "YES" } else { "NO" }
        );
        Ok(needed)
    }
}
