//! In-memory CloudNetwork for tests

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::network::{CloudNetwork, Filter, NetworkError, NetworkResult};
use crate::resource::{
    Address, GatewayState, Instance, NatGateway, RouteTable, Subnet, Tag, find_tag,
};

pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

pub fn running_instance(id: &str, network_id: &str, nat_required: Option<&str>) -> Instance {
    Instance {
        id: id.to_string(),
        state: "running".to_string(),
        network_id: Some(network_id.to_string()),
        tags: nat_required
            .map(|v| vec![Tag::new("NAT-Required", v)])
            .unwrap_or_default(),
    }
}

pub fn managed_gateway(id: &str, network_id: &str, created_at: DateTime<Utc>) -> NatGateway {
    NatGateway {
        id: id.to_string(),
        state: GatewayState::Available,
        network_id: Some(network_id.to_string()),
        subnet_id: Some("subnet-a".to_string()),
        created_at: Some(created_at),
        tags: vec![Tag::new("OnDemandNAT", "True")],
    }
}

pub fn reserved_address(allocation_id: &str) -> Address {
    Address {
        allocation_id: allocation_id.to_string(),
        public_ip: Some("203.0.113.10".to_string()),
        tags: vec![Tag::new("Name", "OnDemandNAT-IPAddr")],
    }
}

pub fn public_subnet(id: &str, network_id: &str) -> Subnet {
    Subnet {
        id: id.to_string(),
        network_id: Some(network_id.to_string()),
        tags: vec![Tag::new("Public", "Yes")],
    }
}

pub fn managed_route_table(id: &str, network_id: &str) -> RouteTable {
    RouteTable {
        id: id.to_string(),
        network_id: Some(network_id.to_string()),
        tags: vec![Tag::new("OnDemandNAT", "Yes")],
    }
}

/// A recorded call against the fake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListInstances,
    ListGateways,
    ListAddresses,
    ListSubnets,
    ListRouteTables,
    CreateGateway {
        allocation_id: String,
        subnet_id: String,
    },
    DeleteGateway(String),
    TagResource {
        id: String,
        keys: Vec<String>,
    },
    DeleteRoute {
        route_table_id: String,
        cidr: String,
    },
    CreateRoute {
        route_table_id: String,
        cidr: String,
        gateway_id: String,
    },
    WaitAvailable(String),
}

impl Call {
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Call::CreateGateway { .. }
                | Call::DeleteGateway(_)
                | Call::TagResource { .. }
                | Call::DeleteRoute { .. }
                | Call::CreateRoute { .. }
        )
    }
}

type FailureFn = Box<dyn Fn() -> NetworkError + Send>;

#[derive(Default)]
struct FakeState {
    instances: Vec<Instance>,
    gateways: Vec<NatGateway>,
    addresses: Vec<Address>,
    subnets: Vec<Subnet>,
    route_tables: Vec<RouteTable>,
    /// (route table, cidr) -> gateway ids, in insertion order
    routes: HashMap<(String, String), Vec<String>>,
    calls: Vec<Call>,
    failures: HashMap<&'static str, FailureFn>,
    next_id: u32,
}

pub struct FakeNetwork {
    state: Mutex<FakeState>,
}

impl Default for FakeNetwork {
    fn default() -> Self {
        Self::new()
    }
}

fn filters_match(
    filters: &[Filter],
    tags: &[Tag],
    state: Option<&str>,
    network_id: Option<&str>,
) -> bool {
    filters.iter().all(|f| match f {
        Filter::Tag { key, values } => {
            find_tag(tags, key).is_some_and(|v| values.iter().any(|want| want == v))
        }
        Filter::State(states) => state.is_some_and(|s| states.iter().any(|want| want == s)),
        Filter::Network(id) => network_id == Some(id.as_str()),
    })
}

impl FakeNetwork {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState::default()),
        }
    }

    pub fn add_instance(&self, instance: Instance) {
        self.state.lock().unwrap().instances.push(instance);
    }

    pub fn add_gateway(&self, gateway: NatGateway) {
        self.state.lock().unwrap().gateways.push(gateway);
    }

    pub fn add_address(&self, address: Address) {
        self.state.lock().unwrap().addresses.push(address);
    }

    pub fn add_subnet(&self, subnet: Subnet) {
        self.state.lock().unwrap().subnets.push(subnet);
    }

    pub fn add_route_table(&self, route_table: RouteTable) {
        self.state.lock().unwrap().route_tables.push(route_table);
    }

    pub fn set_route(&self, route_table_id: &str, cidr: &str, gateway_id: &str) {
        self.state.lock().unwrap().routes.insert(
            (route_table_id.to_string(), cidr.to_string()),
            vec![gateway_id.to_string()],
        );
    }

    /// Make every call to `operation` fail with the produced error
    pub fn fail_on(
        &self,
        operation: &'static str,
        error: impl Fn() -> NetworkError + Send + 'static,
    ) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(operation, Box::new(error));
    }

    pub fn gateway(&self, id: &str) -> Option<NatGateway> {
        self.state
            .lock()
            .unwrap()
            .gateways
            .iter()
            .find(|g| g.id == id)
            .cloned()
    }

    pub fn gateways(&self) -> Vec<NatGateway> {
        self.state.lock().unwrap().gateways.clone()
    }

    /// Current target of a route, if any
    pub fn route(&self, route_table_id: &str, cidr: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .routes
            .get(&(route_table_id.to_string(), cidr.to_string()))
            .and_then(|targets| targets.last().cloned())
    }

    pub fn route_count(&self, route_table_id: &str, cidr: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .routes
            .get(&(route_table_id.to_string(), cidr.to_string()))
            .map_or(0, Vec::len)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    fn record(&self, operation: &'static str, call: Call) -> NetworkResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        match state.failures.get(operation) {
            Some(make_error) => Err(make_error().for_operation(operation)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CloudNetwork for FakeNetwork {
    async fn list_instances(&self, filters: &[Filter]) -> NetworkResult<Vec<Instance>> {
        self.record("list_instances", Call::ListInstances)?;
        let state = self.state.lock().unwrap();
        Ok(state
            .instances
            .iter()
            .filter(|i| {
                filters_match(
                    filters,
                    &i.tags,
                    Some(i.state.as_str()),
                    i.network_id.as_deref(),
                )
            })
            .cloned()
            .collect())
    }

    async fn list_gateways(&self, filters: &[Filter]) -> NetworkResult<Vec<NatGateway>> {
        self.record("list_gateways", Call::ListGateways)?;
        let state = self.state.lock().unwrap();
        Ok(state
            .gateways
            .iter()
            .filter(|g| {
                filters_match(
                    filters,
                    &g.tags,
                    Some(g.state.as_str()),
                    g.network_id.as_deref(),
                )
            })
            .cloned()
            .collect())
    }

    async fn list_addresses(&self, filters: &[Filter]) -> NetworkResult<Vec<Address>> {
        self.record("list_addresses", Call::ListAddresses)?;
        let state = self.state.lock().unwrap();
        Ok(state
            .addresses
            .iter()
            .filter(|a| filters_match(filters, &a.tags, None, None))
            .cloned()
            .collect())
    }

    async fn list_subnets(&self, filters: &[Filter]) -> NetworkResult<Vec<Subnet>> {
        self.record("list_subnets", Call::ListSubnets)?;
        let state = self.state.lock().unwrap();
        Ok(state
            .subnets
            .iter()
            .filter(|s| filters_match(filters, &s.tags, None, s.network_id.as_deref()))
            .cloned()
            .collect())
    }

    async fn list_route_tables(&self, filters: &[Filter]) -> NetworkResult<Vec<RouteTable>> {
        self.record("list_route_tables", Call::ListRouteTables)?;
        let state = self.state.lock().unwrap();
        Ok(state
            .route_tables
            .iter()
            .filter(|rt| filters_match(filters, &rt.tags, None, rt.network_id.as_deref()))
            .cloned()
            .collect())
    }

    async fn create_gateway(
        &self,
        allocation_id: &str,
        subnet_id: &str,
    ) -> NetworkResult<NatGateway> {
        self.record(
            "create_gateway",
            Call::CreateGateway {
                allocation_id: allocation_id.to_string(),
                subnet_id: subnet_id.to_string(),
            },
        )?;
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let network_id = state
            .subnets
            .iter()
            .find(|s| s.id == subnet_id)
            .and_then(|s| s.network_id.clone());
        let gateway = NatGateway {
            id: format!("nat-{:04}", state.next_id),
            state: GatewayState::Pending,
            network_id,
            subnet_id: Some(subnet_id.to_string()),
            created_at: Some(test_now()),
            tags: Vec::new(),
        };
        state.gateways.push(gateway.clone());
        Ok(gateway)
    }

    async fn delete_gateway(&self, gateway_id: &str) -> NetworkResult<()> {
        self.record("delete_gateway", Call::DeleteGateway(gateway_id.to_string()))?;
        let mut state = self.state.lock().unwrap();
        match state.gateways.iter_mut().find(|g| g.id == gateway_id) {
            Some(gw) => {
                gw.state = GatewayState::Deleting;
                Ok(())
            }
            None => Err(NetworkError::not_found(format!("gateway {} not found", gateway_id))),
        }
    }

    async fn tag_resource(&self, resource_id: &str, tags: &[Tag]) -> NetworkResult<()> {
        self.record(
            "tag_resource",
            Call::TagResource {
                id: resource_id.to_string(),
                keys: tags.iter().map(|t| t.key.clone()).collect(),
            },
        )?;
        let mut state = self.state.lock().unwrap();
        let gateway = state
            .gateways
            .iter_mut()
            .find(|g| g.id == resource_id)
            .ok_or_else(|| NetworkError::not_found(format!("resource {} not found", resource_id)))?;
        for tag in tags {
            gateway.tags.retain(|t| t.key != tag.key);
            gateway.tags.push(tag.clone());
        }
        Ok(())
    }

    async fn delete_route(&self, route_table_id: &str, cidr: &str) -> NetworkResult<()> {
        self.record(
            "delete_route",
            Call::DeleteRoute {
                route_table_id: route_table_id.to_string(),
                cidr: cidr.to_string(),
            },
        )?;
        let mut state = self.state.lock().unwrap();
        match state
            .routes
            .remove(&(route_table_id.to_string(), cidr.to_string()))
        {
            Some(_) => Ok(()),
            None => Err(NetworkError::not_found(format!(
                "no route {} in {}",
                cidr, route_table_id
            ))),
        }
    }

    async fn create_route(
        &self,
        route_table_id: &str,
        cidr: &str,
        gateway_id: &str,
    ) -> NetworkResult<()> {
        self.record(
            "create_route",
            Call::CreateRoute {
                route_table_id: route_table_id.to_string(),
                cidr: cidr.to_string(),
                gateway_id: gateway_id.to_string(),
            },
        )?;
        self.state
            .lock()
            .unwrap()
            .routes
            .entry((route_table_id.to_string(), cidr.to_string()))
            .or_default()
            .push(gateway_id.to_string());
        Ok(())
    }

    async fn wait_until_gateway_available(
        &self,
        gateway_id: &str,
        _timeout: Duration,
    ) -> NetworkResult<()> {
        self.record(
            "wait_until_gateway_available",
            Call::WaitAvailable(gateway_id.to_string()),
        )?;
        let mut state = self.state.lock().unwrap();
        match state.gateways.iter_mut().find(|g| g.id == gateway_id) {
            Some(gw) => {
                gw.state = GatewayState::Available;
                Ok(())
            }
            None => Err(NetworkError::not_found(format!("gateway {} not found", gateway_id))),
        }
    }
}
