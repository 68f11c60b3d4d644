//! Network - Trait abstracting the cloud control plane
//!
//! A CloudNetwork exposes the handful of compute/networking operations the
//! reconciler needs: listing instances, gateways, addresses, subnets and route
//! tables, creating and deleting gateways, tagging, and route mutation.
//! Implementations convert these into actual provider API calls.

use std::time::Duration;

use async_trait::async_trait;

use crate::resource::{Address, Instance, NatGateway, RouteTable, Subnet, Tag};

/// Classification of a failed provider call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    /// The addressed object does not exist
    NotFound,
    /// The provider rejected the call because of rate limiting
    Throttled,
    /// The caller lacks permission for the operation
    AccessDenied,
    /// A bounded wait expired before the object reached the wanted state
    Timeout,
    /// Anything else (network failure, validation error, ...)
    Other,
}

/// Error type for CloudNetwork operations
#[derive(Debug)]
pub struct NetworkError {
    pub kind: NetworkErrorKind,
    pub message: String,
    /// Name of the operation that failed (e.g., "delete_route")
    pub operation: Option<&'static str>,
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for NetworkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(operation) = self.operation {
            write!(f, "[{}] {}", operation, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for NetworkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|e| e.as_ref() as &dyn std::error::Error)
    }
}

impl NetworkError {
    pub fn new(kind: NetworkErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            operation: None,
            cause: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(NetworkErrorKind::NotFound, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(NetworkErrorKind::Other, message)
    }

    pub fn for_operation(mut self, operation: &'static str) -> Self {
        self.operation = Some(operation);
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Returns true if the addressed object did not exist
    pub fn is_not_found(&self) -> bool {
        self.kind == NetworkErrorKind::NotFound
    }
}

pub type NetworkResult<T> = Result<T, NetworkError>;

/// Server-side filter applied to list operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Tag `key` equals one of `values` (case-sensitive)
    Tag { key: String, values: Vec<String> },
    /// Lifecycle state is one of the given states
    State(Vec<String>),
    /// Resource belongs to the given network
    Network(String),
}

impl Filter {
    pub fn tag<S: Into<String>>(
        key: impl Into<String>,
        values: impl IntoIterator<Item = S>,
    ) -> Self {
        Filter::Tag {
            key: key.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn state<S: Into<String>>(states: impl IntoIterator<Item = S>) -> Self {
        Filter::State(states.into_iter().map(Into::into).collect())
    }

    pub fn network(network_id: impl Into<String>) -> Self {
        Filter::Network(network_id.into())
    }
}

/// Main CloudNetwork trait
///
/// All operations are async, fire-once and involve side effects or remote
/// reads. Nothing is retried here; callers decide on retry policy.
#[async_trait]
pub trait CloudNetwork: Send + Sync {
    /// List compute instances matching every filter
    async fn list_instances(&self, filters: &[Filter]) -> NetworkResult<Vec<Instance>>;

    /// List NAT gateways matching every filter
    async fn list_gateways(&self, filters: &[Filter]) -> NetworkResult<Vec<NatGateway>>;

    /// List reserved public addresses matching every filter
    async fn list_addresses(&self, filters: &[Filter]) -> NetworkResult<Vec<Address>>;

    /// List subnets matching every filter
    async fn list_subnets(&self, filters: &[Filter]) -> NetworkResult<Vec<Subnet>>;

    /// List route tables matching every filter
    async fn list_route_tables(&self, filters: &[Filter]) -> NetworkResult<Vec<RouteTable>>;

    /// Create a NAT gateway bound to a reserved address in a subnet
    ///
    /// Returns as soon as the provider accepted the request; the gateway is
    /// usually still pending.
    async fn create_gateway(&self, allocation_id: &str, subnet_id: &str)
    -> NetworkResult<NatGateway>;

    /// Delete a NAT gateway
    async fn delete_gateway(&self, gateway_id: &str) -> NetworkResult<()>;

    /// Add or overwrite tags on a resource
    async fn tag_resource(&self, resource_id: &str, tags: &[Tag]) -> NetworkResult<()>;

    /// Delete the route for `cidr` from a route table
    ///
    /// Fails with `NetworkErrorKind::NotFound` when no such route exists.
    async fn delete_route(&self, route_table_id: &str, cidr: &str) -> NetworkResult<()>;

    /// Create a route for `cidr` targeting a NAT gateway
    async fn create_route(
        &self,
        route_table_id: &str,
        cidr: &str,
        gateway_id: &str,
    ) -> NetworkResult<()>;

    /// Block until the gateway reports "available" or `timeout` elapses
    async fn wait_until_gateway_available(
        &self,
        gateway_id: &str,
        timeout: Duration,
    ) -> NetworkResult<()>;
}
