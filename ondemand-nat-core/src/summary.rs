//! Summary - structured result of a reconciliation run

use chrono::TimeDelta;
use serde::{Serialize, Serializer};

use crate::idle::format_duration;

/// What the idle sweep did with a gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Deleted,
    Skipped,
}

/// Idle sweep record for one gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayChange {
    pub gateway_id: String,
    pub action: ChangeAction,
    #[serde(serialize_with = "serialize_duration")]
    pub age: TimeDelta,
    #[serde(serialize_with = "serialize_duration")]
    pub inactive: TimeDelta,
}

/// Result returned by every entry point
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub network_demand: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub launched_gateway_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_refreshed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changes: Option<Vec<GatewayChange>>,
}

impl Summary {
    pub fn new(network_demand: bool) -> Self {
        Self {
            network_demand,
            ..Default::default()
        }
    }

    /// Ids of gateways deleted in this run
    pub fn deleted(&self) -> Vec<&str> {
        self.changes
            .iter()
            .flatten()
            .filter(|c| c.action == ChangeAction::Deleted)
            .map(|c| c.gateway_id.as_str())
            .collect()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "demand: {}", self.network_demand)?;
        if let Some(id) = &self.launched_gateway_id {
            write!(f, ", launched {}", id)?;
        }
        if self.existing_refreshed == Some(true) {
            write!(f, ", refreshed existing")?;
        }
        if let Some(changes) = &self.changes {
            let deleted = self.deleted().len();
            write!(
                f,
                ", {} deleted, {} skipped",
                deleted,
                changes.len() - deleted
            )?;
        }
        Ok(())
    }
}

/// Read-only answer of the status probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub network_demand: bool,
    pub gateway_available: bool,
    pub gateway_ids: Vec<String>,
}

fn serialize_duration<S: Serializer>(d: &TimeDelta, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_duration(*d))
}
