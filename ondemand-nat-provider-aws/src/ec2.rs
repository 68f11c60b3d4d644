//! EC2-backed CloudNetwork

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_ec2::Client as Ec2Client;
use log::{debug, info};

use ondemand_nat_core::network::{
    CloudNetwork, Filter, NetworkError, NetworkErrorKind, NetworkResult,
};
use ondemand_nat_core::resource::{
    Address, GatewayState, Instance, NatGateway, RouteTable, Subnet, Tag,
};

use crate::convert::{from_ec2_tags, network_error, to_chrono, to_ec2_filters, to_ec2_tags};

/// Delay between availability polls (the SDK waiter's cadence)
const POLL_DELAY: Duration = Duration::from_secs(15);

/// State filter names differ per EC2 resource
const INSTANCE_STATE_FILTER: &str = "instance-state-name";
const GATEWAY_STATE_FILTER: &str = "state";

fn to_gateway(gw: &aws_sdk_ec2::types::NatGateway) -> NatGateway {
    NatGateway {
        id: gw.nat_gateway_id().unwrap_or_default().to_string(),
        state: gw
            .state()
            .map(|s| GatewayState::parse(s.as_str()))
            .unwrap_or(GatewayState::Pending),
        network_id: gw.vpc_id().map(String::from),
        subnet_id: gw.subnet_id().map(String::from),
        created_at: gw.create_time().and_then(to_chrono),
        tags: from_ec2_tags(gw.tags()),
    }
}

/// CloudNetwork implementation over the EC2 API
pub struct Ec2Network {
    client: Ec2Client,
    poll_delay: Duration,
}

impl Ec2Network {
    /// Create from a loaded SDK config
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self::with_client(Ec2Client::new(config))
    }

    /// Create with a specific client (for testing)
    pub fn with_client(client: Ec2Client) -> Self {
        Self {
            client,
            poll_delay: POLL_DELAY,
        }
    }

    async fn describe_gateway(&self, gateway_id: &str) -> NetworkResult<Option<NatGateway>> {
        let result = self
            .client
            .describe_nat_gateways()
            .nat_gateway_ids(gateway_id)
            .send()
            .await
            .map_err(|e| network_error("describe_nat_gateways", e))?;
        Ok(result.nat_gateways().first().map(to_gateway))
    }
}

#[async_trait]
impl CloudNetwork for Ec2Network {
    async fn list_instances(&self, filters: &[Filter]) -> NetworkResult<Vec<Instance>> {
        let mut instances = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let result = self
                .client
                .describe_instances()
                .set_filters(Some(to_ec2_filters(filters, INSTANCE_STATE_FILTER)))
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| network_error("describe_instances", e))?;

            for reservation in result.reservations() {
                for i in reservation.instances() {
                    instances.push(Instance {
                        id: i.instance_id().unwrap_or_default().to_string(),
                        state: i
                            .state()
                            .and_then(|s| s.name())
                            .map(|n| n.as_str().to_string())
                            .unwrap_or_default(),
                        network_id: i.vpc_id().map(String::from),
                        tags: from_ec2_tags(i.tags()),
                    });
                }
            }

            match result.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }
        Ok(instances)
    }

    async fn list_gateways(&self, filters: &[Filter]) -> NetworkResult<Vec<NatGateway>> {
        let mut gateways = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let result = self
                .client
                .describe_nat_gateways()
                .set_filter(Some(to_ec2_filters(filters, GATEWAY_STATE_FILTER)))
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| network_error("describe_nat_gateways", e))?;

            gateways.extend(result.nat_gateways().iter().map(to_gateway));

            match result.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }
        Ok(gateways)
    }

    async fn list_addresses(&self, filters: &[Filter]) -> NetworkResult<Vec<Address>> {
        let result = self
            .client
            .describe_addresses()
            .set_filters(Some(to_ec2_filters(filters, "state")))
            .send()
            .await
            .map_err(|e| network_error("describe_addresses", e))?;

        Ok(result
            .addresses()
            .iter()
            .filter_map(|a| {
                a.allocation_id().map(|id| Address {
                    allocation_id: id.to_string(),
                    public_ip: a.public_ip().map(String::from),
                    tags: from_ec2_tags(a.tags()),
                })
            })
            .collect())
    }

    async fn list_subnets(&self, filters: &[Filter]) -> NetworkResult<Vec<Subnet>> {
        let result = self
            .client
            .describe_subnets()
            .set_filters(Some(to_ec2_filters(filters, "state")))
            .send()
            .await
            .map_err(|e| network_error("describe_subnets", e))?;

        Ok(result
            .subnets()
            .iter()
            .filter_map(|s| {
                s.subnet_id().map(|id| Subnet {
                    id: id.to_string(),
                    network_id: s.vpc_id().map(String::from),
                    tags: from_ec2_tags(s.tags()),
                })
            })
            .collect())
    }

    async fn list_route_tables(&self, filters: &[Filter]) -> NetworkResult<Vec<RouteTable>> {
        let result = self
            .client
            .describe_route_tables()
            .set_filters(Some(to_ec2_filters(filters, "state")))
            .send()
            .await
            .map_err(|e| network_error("describe_route_tables", e))?;

        Ok(result
            .route_tables()
            .iter()
            .filter_map(|rt| {
                rt.route_table_id().map(|id| RouteTable {
                    id: id.to_string(),
                    network_id: rt.vpc_id().map(String::from),
                    tags: from_ec2_tags(rt.tags()),
                })
            })
            .collect())
    }

    async fn create_gateway(
        &self,
        allocation_id: &str,
        subnet_id: &str,
    ) -> NetworkResult<NatGateway> {
        let result = self
            .client
            .create_nat_gateway()
            .allocation_id(allocation_id)
            .subnet_id(subnet_id)
            .send()
            .await
            .map_err(|e| network_error("create_nat_gateway", e))?;

        let gateway = result.nat_gateway().map(to_gateway).ok_or_else(|| {
            NetworkError::other("NAT gateway created but not returned")
                .for_operation("create_nat_gateway")
        })?;
        debug!("create_nat_gateway returned {:?}", gateway);
        Ok(gateway)
    }

    async fn delete_gateway(&self, gateway_id: &str) -> NetworkResult<()> {
        self.client
            .delete_nat_gateway()
            .nat_gateway_id(gateway_id)
            .send()
            .await
            .map_err(|e| network_error("delete_nat_gateway", e))?;
        Ok(())
    }

    async fn tag_resource(&self, resource_id: &str, tags: &[Tag]) -> NetworkResult<()> {
        self.client
            .create_tags()
            .resources(resource_id)
            .set_tags(Some(to_ec2_tags(tags)))
            .send()
            .await
            .map_err(|e| network_error("create_tags", e))?;
        Ok(())
    }

    async fn delete_route(&self, route_table_id: &str, cidr: &str) -> NetworkResult<()> {
        self.client
            .delete_route()
            .route_table_id(route_table_id)
            .destination_cidr_block(cidr)
            .send()
            .await
            .map_err(|e| network_error("delete_route", e))?;
        Ok(())
    }

    async fn create_route(
        &self,
        route_table_id: &str,
        cidr: &str,
        gateway_id: &str,
    ) -> NetworkResult<()> {
        self.client
            .create_route()
            .route_table_id(route_table_id)
            .destination_cidr_block(cidr)
            .nat_gateway_id(gateway_id)
            .send()
            .await
            .map_err(|e| network_error("create_route", e))?;
        Ok(())
    }

    async fn wait_until_gateway_available(
        &self,
        gateway_id: &str,
        timeout: Duration,
    ) -> NetworkResult<()> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            // A freshly created gateway may not be visible yet
            let state = match self.describe_gateway(gateway_id).await {
                Ok(gw) => gw.map(|g| g.state),
                Err(e) if e.is_not_found() => None,
                Err(e) => return Err(e),
            };

            match state {
                Some(GatewayState::Available) => {
                    info!("NAT gateway {} is available", gateway_id);
                    return Ok(());
                }
                Some(
                    s @ (GatewayState::Failed | GatewayState::Deleting | GatewayState::Deleted),
                ) => {
                    return Err(NetworkError::other(format!(
                        "NAT gateway {} entered state {} while waiting",
                        gateway_id, s
                    ))
                    .for_operation("wait_until_gateway_available"));
                }
                other => {
                    debug!(
                        "NAT gateway {} not available yet (state {:?})",
                        gateway_id, other
                    );
                }
            }

            if tokio::time::Instant::now() + self.poll_delay > deadline {
                return Err(NetworkError::new(
                    NetworkErrorKind::Timeout,
                    format!(
                        "NAT gateway {} not available after {}s",
                        gateway_id,
                        timeout.as_secs()
                    ),
                )
                .for_operation("wait_until_gateway_available"));
            }
            tokio::time::sleep(self.poll_delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_ec2::primitives::DateTime as SmithyDateTime;
    use aws_sdk_ec2::types::{NatGatewayState, Tag as Ec2Tag};

    #[test]
    fn test_to_gateway() {
        let sdk = aws_sdk_ec2::types::NatGateway::builder()
            .nat_gateway_id("nat-0abc")
            .state(NatGatewayState::Available)
            .vpc_id("vpc-1")
            .subnet_id("subnet-a")
            .create_time(SmithyDateTime::from_secs(1_714_564_800))
            .tags(Ec2Tag::builder().key("OnDemandNAT").value("True").build())
            .build();

        let gw = to_gateway(&sdk);
        assert_eq!(gw.id, "nat-0abc");
        assert_eq!(gw.state, GatewayState::Available);
        assert_eq!(gw.network_id.as_deref(), Some("vpc-1"));
        assert_eq!(gw.created_at.unwrap().timestamp(), 1_714_564_800);
        assert_eq!(gw.tag("OnDemandNAT"), Some("True"));
    }

    #[test]
    fn test_to_gateway_without_state() {
        let sdk = aws_sdk_ec2::types::NatGateway::builder()
            .nat_gateway_id("nat-0abc")
            .build();
        let gw = to_gateway(&sdk);
        assert_eq!(gw.state, GatewayState::Pending);
        assert_eq!(gw.created_at, None);
        assert!(gw.tags.is_empty());
    }
}
