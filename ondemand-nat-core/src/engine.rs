//! Reconciliation engine - decides between launching, refreshing, sweeping
//! and doing nothing
//!
//! Every entry point reads demand and inventory from the cloud, then picks
//! exactly one branch:
//!
//! | demand | gateways  | action                               |
//! |--------|-----------|--------------------------------------|
//! | yes    | none      | create gateway, repoint routes       |
//! | yes    | some      | refresh LastRequested on each        |
//! | no     | none      | nothing                              |
//! | no     | some      | delete the ones idle past threshold  |
//!
//! No state is kept between runs. Two overlapping runs can both decide to
//! create; callers must serialize invocations.

use std::sync::Arc;

use log::info;

use crate::clock::{Clock, SystemClock};
use crate::config::Settings;
use crate::demand::DemandProbe;
use crate::error::NatResult;
use crate::idle::{IdleAction, IdlePolicy, format_timestamp};
use crate::inventory::GatewayInventory;
use crate::network::CloudNetwork;
use crate::provisioner::GatewayProvisioner;
use crate::resource::{GatewayRecord, Tag};
use crate::routes::RouteReconciler;
use crate::summary::{ChangeAction, GatewayChange, StatusReport, Summary};

pub struct Reconciler {
    network: Arc<dyn CloudNetwork>,
    clock: Arc<dyn Clock>,
    demand: DemandProbe,
    inventory: GatewayInventory,
    provisioner: GatewayProvisioner,
    routes: RouteReconciler,
    policy: IdlePolicy,
    last_requested_key: String,
}

impl Reconciler {
    pub fn new(network: Arc<dyn CloudNetwork>, settings: &Settings) -> Self {
        Self::with_clock(network, settings, Arc::new(SystemClock))
    }

    pub fn with_clock(
        network: Arc<dyn CloudNetwork>,
        settings: &Settings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let id = settings.network_id.as_str();
        Self {
            demand: DemandProbe::new(network.clone(), id, settings.tags.clone()),
            inventory: GatewayInventory::new(network.clone(), id, settings.tags.clone()),
            provisioner: GatewayProvisioner::new(network.clone(), id, settings.tags.clone()),
            routes: RouteReconciler::new(
                network.clone(),
                id,
                settings.tags.clone(),
                settings.availability_timeout,
            ),
            policy: IdlePolicy::new(settings.idle_threshold),
            last_requested_key: settings.tags.last_requested_key.clone(),
            network,
            clock,
        }
    }

    /// Scheduled reconciliation: the full decision table
    pub async fn reconcile(&self) -> NatResult<Summary> {
        let needed = self.demand.is_egress_needed().await?;
        let gateways = self.inventory.list_managed_gateways(self.clock.now()).await?;

        let mut summary = Summary::new(needed);
        match (needed, gateways.is_empty()) {
            (true, true) => {
                summary.launched_gateway_id = Some(self.launch().await?);
            }
            (true, false) => {
                self.refresh(&gateways).await?;
            }
            (false, true) => {
                info!("No demand and no gateway, nothing to do");
            }
            (false, false) => {
                summary.changes = Some(self.sweep(&gateways).await?);
            }
        }

        info!("SUMMARY: {}", summary.to_json());
        Ok(summary)
    }

    /// Synchronous request for egress from a caller that needs it now
    ///
    /// Demand is asserted by the caller, so the probe is skipped.
    pub async fn request_on_demand(&self) -> NatResult<Summary> {
        info!("NAT gateway requested");
        let gateways = self.inventory.list_managed_gateways(self.clock.now()).await?;

        let mut summary = Summary::new(true);
        if gateways.is_empty() {
            info!("New gateway required, launching");
            summary.launched_gateway_id = Some(self.launch().await?);
        } else {
            info!("NAT gateway already provisioned, updating last requested timestamp");
            self.refresh(&gateways).await?;
            summary.existing_refreshed = Some(true);
        }

        info!("SUMMARY: {}", summary.to_json());
        Ok(summary)
    }

    /// Periodic maintenance: refresh or sweep existing gateways, never launch
    pub async fn check_still_required(&self) -> NatResult<Summary> {
        let needed = self.demand.is_egress_needed().await?;
        let gateways = self.inventory.list_managed_gateways(self.clock.now()).await?;

        let mut summary = Summary::new(needed);
        if gateways.is_empty() {
            info!("No gateway running, nothing to do");
        } else if needed {
            info!("Gateway still in use, updating last requested timestamp");
            self.refresh(&gateways).await?;
        } else {
            info!("No gateway user detected, checking gateway ages");
            summary.changes = Some(self.sweep(&gateways).await?);
        }

        info!("SUMMARY: {}", summary.to_json());
        Ok(summary)
    }

    /// Read-only view of demand and gateway presence
    pub async fn status(&self) -> NatResult<StatusReport> {
        let needed = self.demand.is_egress_needed().await?;
        let gateways = self.inventory.list_managed_gateways(self.clock.now()).await?;
        Ok(StatusReport {
            network_demand: needed,
            gateway_available: !gateways.is_empty(),
            gateway_ids: gateways.into_iter().map(|g| g.id).collect(),
        })
    }

    async fn launch(&self) -> NatResult<String> {
        let gateway = self.provisioner.create_gateway(self.clock.now()).await?;
        self.routes.repoint_default_route(&gateway.id).await?;
        Ok(gateway.id)
    }

    async fn refresh(&self, gateways: &[GatewayRecord]) -> NatResult<()> {
        let stamp = [Tag::new(
            &self.last_requested_key,
            format_timestamp(self.clock.now()),
        )];
        for gateway in gateways {
            self.network.tag_resource(&gateway.id, &stamp).await?;
            info!("Refreshed {} on {}", self.last_requested_key, gateway.id);
        }
        Ok(())
    }

    async fn sweep(&self, gateways: &[GatewayRecord]) -> NatResult<Vec<GatewayChange>> {
        let now = self.clock.now();
        let mut changes = Vec::with_capacity(gateways.len());
        for gateway in gateways {
            let verdict = self.policy.evaluate(gateway, now);
            let action = match verdict.action {
                IdleAction::Delete => {
                    self.network.delete_gateway(&gateway.id).await?;
                    info!("Deleted idle gateway {}", gateway.id);
                    ChangeAction::Deleted
                }
                IdleAction::Keep => ChangeAction::Skipped,
            };
            changes.push(GatewayChange {
                gateway_id: gateway.id.clone(),
                action,
                age: verdict.age,
                inactive: verdict.inactive,
            });
        }
        Ok(changes)
    }
}
