//! On-demand NAT core
//!
//! Decision and reconciliation logic for a shared NAT egress gateway that
//! exists only while some workload in the network needs outbound access.
//!
//! # Overview
//!
//! - **CloudNetwork**: the narrow control-plane interface everything goes through
//! - **DemandProbe**: is any running workload tagged as needing egress?
//! - **GatewayInventory**: which managed gateways exist, and how idle are they?
//! - **GatewayProvisioner** / **RouteReconciler**: launch a gateway and point
//!   the default routes at it
//! - **Reconciler**: the entry points (`reconcile`, `request_on_demand`,
//!   `check_still_required`, `status`)
//!
//! Each invocation is stateless; everything lives in the cloud inventory.
//! Invocations must not overlap (run them from a single-concurrency trigger),
//! otherwise two runs can each launch a gateway.

pub mod clock;
pub mod config;
pub mod demand;
pub mod engine;
pub mod error;
pub mod idle;
pub mod inventory;
pub mod job;
pub mod network;
pub mod provisioner;
pub mod resource;
pub mod routes;
pub mod summary;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types for convenience
pub use config::Settings;
pub use engine::Reconciler;
pub use error::{NatError, NatResult};
pub use job::{JobDescriptor, JobReporter, TriggerEvent, report_outcome};
pub use network::{CloudNetwork, Filter, NetworkError, NetworkErrorKind, NetworkResult};
pub use summary::{ChangeAction, GatewayChange, StatusReport, Summary};
