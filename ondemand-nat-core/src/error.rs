//! Error types for reconciliation runs

use thiserror::Error;

use crate::config::ConfigError;
use crate::network::NetworkError;

/// Errors that end a reconciliation run
#[derive(Debug, Error)]
pub enum NatError {
    /// No reserved public address carries the gateway address tag
    #[error("No reserved address tagged {key}={value}")]
    NoReservedAddress { key: String, value: String },

    /// No subnet in the network carries the public subnet tag
    #[error("No public subnet tagged {key}={value} in network {network_id}")]
    NoPublicSubnet {
        key: String,
        value: String,
        network_id: String,
    },

    /// The provider accepted a create call but returned no gateway id
    #[error("Gateway created but no ID returned")]
    GatewayIdMissing,

    /// A provider call failed
    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The trigger payload could not be decoded
    #[error("Invalid trigger event: {0}")]
    InvalidEvent(#[from] serde_json::Error),
}

impl NatError {
    /// Precondition failures are configuration problems in the account,
    /// not provider hiccups; re-invoking will not help until they are fixed
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            NatError::NoReservedAddress { .. } | NatError::NoPublicSubnet { .. }
        )
    }
}

/// Result type for reconciliation operations
pub type NatResult<T> = Result<T, NatError>;
