//! Reconciler configuration

use std::time::Duration;

use thiserror::Error;

use crate::resource::Tag;

/// Environment variable holding the target network id
pub const NETWORK_ID_ENV: &str = "VPC_ID";
/// Environment variable overriding the idle threshold, in minutes
pub const IDLE_MINUTES_ENV: &str = "NAT_IDLE_MINUTES";
/// Environment variable overriding the availability wait, in minutes
pub const WAIT_MINUTES_ENV: &str = "NAT_WAIT_MINUTES";

/// Destination of the default route
pub const DEFAULT_ROUTE_CIDR: &str = "0.0.0.0/0";

/// Errors raised while loading configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Tag keys and values that mark resources this tool reads or manages
#[derive(Debug, Clone)]
pub struct TagConventions {
    /// Tag on workloads that need egress (e.g., "NAT-Required")
    pub demand_key: String,
    /// Tag on gateways and route tables managed by this tool
    pub ownership_key: String,
    /// Values that count as true for the demand and ownership tags
    pub truthy_values: Vec<String>,
    /// Tag on gateways recording when demand was last confirmed
    pub last_requested_key: String,
    /// Tag identifying the reserved address (key, value)
    pub address_tag: (String, String),
    /// Tag identifying public subnets (key, value)
    pub public_subnet_tag: (String, String),
    /// Name tag given to new gateways
    pub gateway_name: String,
    /// Extra bookkeeping tags stamped on new gateways
    pub bookkeeping: Vec<Tag>,
}

impl Default for TagConventions {
    fn default() -> Self {
        Self {
            demand_key: "NAT-Required".to_string(),
            ownership_key: "OnDemandNAT".to_string(),
            truthy_values: vec!["True".to_string(), "Yes".to_string()],
            last_requested_key: "LastRequested".to_string(),
            address_tag: ("Name".to_string(), "OnDemandNAT-IPAddr".to_string()),
            public_subnet_tag: ("Public".to_string(), "Yes".to_string()),
            gateway_name: "OnDemandNAT-Gateway".to_string(),
            bookkeeping: vec![
                Tag::new("Project", "Deimos-Infra"),
                Tag::new("UseCase", "AWS-Admin"),
                Tag::new("Application", "OnDemandNAT"),
                Tag::new("Environment", "Infrastructure"),
            ],
        }
    }
}

impl TagConventions {
    /// Case-sensitive check against the truthy value set
    pub fn is_truthy(&self, value: &str) -> bool {
        self.truthy_values.iter().any(|v| v == value)
    }
}

/// Settings for one reconciliation run
#[derive(Debug, Clone)]
pub struct Settings {
    /// Network (VPC) the gateway serves
    pub network_id: String,

    /// Inactivity after which an unused gateway is deleted (default: 45 minutes)
    pub idle_threshold: Duration,

    /// Upper bound on waiting for a new gateway to become available
    /// (default: 10 minutes)
    pub availability_timeout: Duration,

    pub tags: TagConventions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            network_id: String::new(),
            idle_threshold: Duration::from_secs(45 * 60),
            availability_timeout: Duration::from_secs(10 * 60),
            tags: TagConventions::default(),
        }
    }
}

impl Settings {
    pub fn new(network_id: impl Into<String>) -> Self {
        Self {
            network_id: network_id.into(),
            ..Default::default()
        }
    }

    /// Load settings from a key lookup (usually the process environment)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let network_id = lookup(NETWORK_ID_ENV)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing(NETWORK_ID_ENV))?;

        let mut settings = Self::new(network_id);
        if let Some(value) = lookup(IDLE_MINUTES_ENV) {
            settings.idle_threshold = parse_minutes(IDLE_MINUTES_ENV, &value)?;
        }
        if let Some(value) = lookup(WAIT_MINUTES_ENV) {
            settings.availability_timeout = parse_minutes(WAIT_MINUTES_ENV, &value)?;
        }
        Ok(settings)
    }
}

fn parse_minutes(name: &'static str, value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .and_then(|m| m.checked_mul(60))
        .map(Duration::from_secs)
        .ok_or_else(|| ConfigError::Invalid {
            name,
            value: value.to_string(),
        })
}
