//! Resource - Records returned by the cloud network and the gateway view
//! the reconciler works with

use chrono::{DateTime, Utc};

/// A key/value tag attached to a cloud resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Look up a tag value by key
pub fn find_tag<'a>(tags: &'a [Tag], key: &str) -> Option<&'a str> {
    tags.iter()
        .find(|t| t.key == key)
        .map(|t| t.value.as_str())
}

/// Lifecycle state of a NAT gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayState {
    Pending,
    Available,
    Deleting,
    Deleted,
    Failed,
    /// A state string this crate does not know about
    Unknown(String),
}

impl GatewayState {
    /// States in which a gateway counts as present
    pub const LIVE: [&'static str; 2] = ["pending", "available"];

    pub fn parse(s: &str) -> Self {
        match s {
            "pending" => GatewayState::Pending,
            "available" => GatewayState::Available,
            "deleting" => GatewayState::Deleting,
            "deleted" => GatewayState::Deleted,
            "failed" => GatewayState::Failed,
            other => GatewayState::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            GatewayState::Pending => "pending",
            GatewayState::Available => "available",
            GatewayState::Deleting => "deleting",
            GatewayState::Deleted => "deleted",
            GatewayState::Failed => "failed",
            GatewayState::Unknown(s) => s.as_str(),
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, GatewayState::Pending | GatewayState::Available)
    }
}

impl std::fmt::Display for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A compute instance (workload)
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub id: String,
    /// Lifecycle state as reported by the provider (e.g., "running")
    pub state: String,
    pub network_id: Option<String>,
    pub tags: Vec<Tag>,
}

/// A NAT gateway as reported by the provider
#[derive(Debug, Clone, PartialEq)]
pub struct NatGateway {
    pub id: String,
    pub state: GatewayState,
    pub network_id: Option<String>,
    pub subnet_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub tags: Vec<Tag>,
}

impl NatGateway {
    pub fn tag(&self, key: &str) -> Option<&str> {
        find_tag(&self.tags, key)
    }
}

/// A reserved public address
#[derive(Debug, Clone, PartialEq)]
pub struct Address {
    pub allocation_id: String,
    pub public_ip: Option<String>,
    pub tags: Vec<Tag>,
}

/// A subnet
#[derive(Debug, Clone, PartialEq)]
pub struct Subnet {
    pub id: String,
    pub network_id: Option<String>,
    pub tags: Vec<Tag>,
}

/// A route table
#[derive(Debug, Clone, PartialEq)]
pub struct RouteTable {
    pub id: String,
    pub network_id: Option<String>,
    pub tags: Vec<Tag>,
}

/// The reconciler's view of a managed gateway
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayRecord {
    pub id: String,
    pub state: GatewayState,
    pub created_at: DateTime<Utc>,
    /// Last time demand was confirmed; `None` when the tag is absent
    pub last_requested: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_state_parse() {
        assert_eq!(GatewayState::parse("pending"), GatewayState::Pending);
        assert_eq!(GatewayState::parse("available"), GatewayState::Available);
        assert_eq!(GatewayState::parse("deleting"), GatewayState::Deleting);
        assert_eq!(
            GatewayState::parse("rebooting"),
            GatewayState::Unknown("rebooting".to_string())
        );
        assert_eq!(GatewayState::parse("rebooting").as_str(), "rebooting");
    }

    #[test]
    fn test_gateway_state_is_live() {
        for s in GatewayState::LIVE {
            assert!(GatewayState::parse(s).is_live());
        }
        assert!(!GatewayState::Deleting.is_live());
        assert!(!GatewayState::Failed.is_live());
    }

    #[test]
    fn test_find_tag() {
        let tags = vec![Tag::new("Name", "OnDemandNAT-Gateway"), Tag::new("OnDemandNAT", "True")];
        assert_eq!(find_tag(&tags, "OnDemandNAT"), Some("True"));
        assert_eq!(find_tag(&tags, "LastRequested"), None);
    }
}
