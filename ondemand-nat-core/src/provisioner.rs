//! Gateway provisioner - creates and tags a new on-demand gateway
//!
//! The new gateway is bound to the reserved public address and to a public
//! subnet chosen at random. Creation does not wait for availability; the
//! route reconciler does that before touching routes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{info, warn};
use rand::seq::SliceRandom;

use crate::config::TagConventions;
use crate::error::{NatError, NatResult};
use crate::idle::format_timestamp;
use crate::network::{CloudNetwork, Filter};
use crate::resource::{GatewayRecord, Tag};

pub struct GatewayProvisioner {
    network: Arc<dyn CloudNetwork>,
    network_id: String,
    tags: TagConventions,
}

impl GatewayProvisioner {
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

    /// Resolve the allocation id of the reserved address
    async fn reserved_address(&self) -> NatResult<String> {
        let (key, value) = &self.tags.address_tag;
        let addresses = self
            .network
            .list_addresses(&[Filter::tag(key, [value.as_str()])])
            .await?;

        if addresses.len() > 1 {
            warn!(
                "{} addresses tagged {}={}, using {}",
                addresses.len(),
                key,
                value,
                addresses[0].allocation_id
            );
        }

        addresses
            .into_iter()
            .next()
            .map(|a| a.allocation_id)
            .ok_or_else(|| NatError::NoReservedAddress {
                key: key.clone(),
                value: value.clone(),
            })
    }

    /// Pick one public subnet of the network uniformly at random
    async fn public_subnet(&self) -> NatResult<String> {
        let (key, value) = &self.tags.public_subnet_tag;
        let subnets = self
            .network
            .list_subnets(&[
                Filter::tag(key, [value.as_str()]),
                Filter::network(&self.network_id),
            ])
            .await?;

        subnets
            .choose(&mut rand::thread_rng())
            .map(|s| s.id.clone())
            .ok_or_else(|| NatError::NoPublicSubnet {
                key: key.clone(),
                value: value.clone(),
                network_id: self.network_id.clone(),
            })
    }

    fn creation_tags(&self, now: DateTime<Utc>) -> Vec<Tag> {
        let mut tags = vec![
            Tag::new(&self.tags.ownership_key, "True"),
            Tag::new("Name", &self.tags.gateway_name),
            Tag::new(&self.tags.last_requested_key, format_timestamp(now)),
        ];
        tags.extend(self.tags.bookkeeping.iter().cloned());
        tags
    }

    /// Create, tag and return a new gateway
    pub async fn create_gateway(&self, now: DateTime<Utc>) -> NatResult<GatewayRecord> {
        let allocation_id = self.reserved_address().await?;
        let subnet_id = self.public_subnet().await?;

        let gateway = self
            .network
            .create_gateway(&allocation_id, &subnet_id)
            .await?;
        if gateway.id.is_empty() {
            return Err(NatError::GatewayIdMissing);
        }

        info!(
            "NAT gateway created: {} (address {}, subnet {}, state {})",
            gateway.id, allocation_id, subnet_id, gateway.state
        );

        self.network
            .tag_resource(&gateway.id, &self.creation_tags(now))
            .await?;

        Ok(GatewayRecord {
            id: gateway.id,
            state: gateway.state,
            created_at: gateway.created_at.unwrap_or(now),
            last_requested: Some(now),
        })
    }
}
