//! Route reconciler - points the default route of managed route tables at a gateway

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};

use crate::config::{DEFAULT_ROUTE_CIDR, TagConventions};
use crate::error::NatResult;
use crate::network::{CloudNetwork, Filter};

pub struct RouteReconciler {
    network: Arc<dyn CloudNetwork>,
    network_id: String,
    tags: TagConventions,
    availability_timeout: Duration,
}

impl RouteReconciler {
    pub fn new(
        network: Arc<dyn CloudNetwork>,
        network_id: impl Into<String>,
        tags: TagConventions,
        availability_timeout: Duration,
    ) -> Self {
        Self {
            network,
            network_id: network_id.into(),
            tags,
            availability_timeout,
        }
    }

    /// Repoint the default route of every managed route table to `gateway_id`
    ///
    /// Waits for the gateway to become available first. A missing default
    /// route is expected; any other failure aborts the whole operation.
    /// Returns the ids of the route tables that were updated.
    pub async fn repoint_default_route(&self, gateway_id: &str) -> NatResult<Vec<String>> {
        let route_tables = self
            .network
            .list_route_tables(&[
                Filter::tag(&self.tags.ownership_key, self.tags.truthy_values.iter().cloned()),
                Filter::network(&self.network_id),
            ])
            .await?;
        let ids: Vec<String> = route_tables.into_iter().map(|rt| rt.id).collect();
        info!("Fetched route tables for update: {:?}", ids);

        self.network
            .wait_until_gateway_available(gateway_id, self.availability_timeout)
            .await?;

        for route_table_id in &ids {
            info!("Updating route table {}", route_table_id);
            match self
                .network
                .delete_route(route_table_id, DEFAULT_ROUTE_CIDR)
                .await
            {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {
                    debug!("No default route in {}, nothing to remove", route_table_id);
                }
                Err(e) => return Err(e.into()),
            }

            self.network
                .create_route(route_table_id, DEFAULT_ROUTE_CIDR, gateway_id)
                .await?;
            info!("Update completed for {}", route_table_id);
        }

        Ok(ids)
    }
}
