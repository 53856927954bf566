//! Deployment lifecycle: the per-model status state machine.
//!
//! ```text
//! Idle --deploy--> Deploying --(settle)--> Active --terminate--> (teardown) --> Idle
//!                                          Active --scale--> (delay) --> Active, nodes += delta
//! ```
//!
//! Every operation either starts a transition (and schedules its completion)
//! or is refused synchronously with a `LifecycleError`. Refusals change no
//! state and write no log entry. Completions re-check the instance id they
//! were scheduled for, so a completion that outlives its instance is a no-op.
//!
//! The controller is the only writer of `DeploymentStatus`.

pub mod error;
pub mod events;
pub mod instance;
pub mod scheduler;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::catalog::{Catalog, DeploymentStatus, ModelSlot, SlotState};
use crate::eventlog::{EventCategory, EventLog};
use crate::sync::lock;

use error::{LifecycleError, LifecycleResult};
use events::StatusChange;
use instance::{DeploymentInstance, InstanceSnapshot};
use scheduler::{Scheduler, TokioScheduler};

/// Timings and sizes for the simulated backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleSettings {
    /// Delay between `deploy` and the model becoming Active.
    pub deploy_settle_ms: u64,
    /// Delay between `terminate` and the model returning to Idle.
    pub teardown_ms: u64,
    /// Delay between `scale` and the new node count taking effect.
    pub scale_ms: u64,
    /// Nodes added per scale request.
    pub scale_delta: u32,
    /// Nodes in a freshly deployed instance.
    pub initial_nodes: u32,
    /// Endpoint URLs are `{endpoint_base}/{model_id}`.
    pub endpoint_base: String,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            deploy_settle_ms: 2500,
            teardown_ms: 2000,
            scale_ms: 2000,
            scale_delta: 2,
            initial_nodes: 4,
            endpoint_base: "https://api.adaptive.ai/v1/inference".into(),
        }
    }
}

impl LifecycleSettings {
    pub fn deploy_settle(&self) -> Duration {
        Duration::from_millis(self.deploy_settle_ms)
    }

    pub fn teardown(&self) -> Duration {
        Duration::from_millis(self.teardown_ms)
    }

    pub fn scale_delay(&self) -> Duration {
        Duration::from_millis(self.scale_ms)
    }
}

/// Owns the status state machine for every catalog model.
///
/// Cheap to clone; clones share the catalog and the event channel.
#[derive(Debug, Clone)]
pub struct DeploymentController {
    catalog: Arc<Catalog>,
    scheduler: Arc<dyn Scheduler>,
    settings: Arc<LifecycleSettings>,
    events: broadcast::Sender<StatusChange>,
}

impl DeploymentController {
    /// Controller backed by tokio timers.
    pub fn new(catalog: Arc<Catalog>, settings: LifecycleSettings) -> Self {
        Self::with_scheduler(catalog, settings, Arc::new(TokioScheduler))
    }

    pub fn with_scheduler(
        catalog: Arc<Catalog>,
        settings: LifecycleSettings,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            catalog,
            scheduler,
            settings: Arc::new(settings),
            events,
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn settings(&self) -> &LifecycleSettings {
        &self.settings
    }

    /// Subscribe to status changes.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusChange> {
        self.events.subscribe()
    }

    pub fn status(&self, model_id: &str) -> LifecycleResult<DeploymentStatus> {
        Ok(lock(&self.slot(model_id)?.state).status)
    }

    /// Snapshot of the open instance, if any.
    pub fn instance(&self, model_id: &str) -> LifecycleResult<Option<InstanceSnapshot>> {
        let slot = self.slot(model_id)?;
        let state = lock(&slot.state);
        Ok(state.instance.as_ref().map(DeploymentInstance::snapshot))
    }

    /// Handle to the open instance's event log, if any.
    pub fn event_log(&self, model_id: &str) -> LifecycleResult<Option<EventLog>> {
        let slot = self.slot(model_id)?;
        let state = lock(&slot.state);
        Ok(state.instance.as_ref().map(|i| i.log.clone()))
    }

    /// Start provisioning an Idle model.
    ///
    /// Calling again while the model is Deploying is accepted and does
    /// nothing; only one settle completion is ever scheduled.
    pub fn deploy(&self, model_id: &str) -> LifecycleResult<()> {
        let slot = self.slot(model_id)?;
        let mut state = lock(&slot.state);
        match state.status {
            DeploymentStatus::Idle => {}
            DeploymentStatus::Deploying => {
                if state.instance.as_ref().is_some_and(|i| i.terminating) {
                    return Err(LifecycleError::TerminationInFlight(model_id.into()));
                }
                debug!(model_id, "deploy already in flight");
                return Ok(());
            }
            status => {
                return Err(LifecycleError::NotIdle {
                    model_id: model_id.into(),
                    status,
                })
            }
        }

        let instance = DeploymentInstance::new(
            model_id,
            self.settings.initial_nodes,
            &self.settings.endpoint_base,
        );
        let instance_id = instance.id;
        instance
            .log
            .append(EventCategory::System, format!("Provisioning instance {model_id}"));
        state.instance = Some(instance);
        self.set_status(model_id, &mut state, DeploymentStatus::Deploying);

        let controller = self.clone();
        let id = model_id.to_string();
        state.transition = Some(self.scheduler.schedule(
            self.settings.deploy_settle(),
            Box::pin(async move { controller.finish_deploy(&id, instance_id) }),
        ));
        info!(model_id, %instance_id, "deploy scheduled");
        Ok(())
    }

    fn finish_deploy(&self, model_id: &str, instance_id: Uuid) {
        let Some(slot) = self.catalog.slot(model_id) else {
            return;
        };
        let mut state = lock(&slot.state);
        let nodes = match state.instance.as_ref() {
            Some(i) if i.id == instance_id && !i.terminating => i.nodes,
            _ => {
                debug!(model_id, %instance_id, "stale deploy completion discarded");
                return;
            }
        };
        if state.status != DeploymentStatus::Deploying {
            debug!(model_id, status = %state.status, "deploy completion ignored");
            return;
        }
        state.transition = None;
        self.append(
            &state,
            EventCategory::System,
            format!("Instance {model_id} active on {nodes} nodes"),
        );
        self.set_status(model_id, &mut state, DeploymentStatus::Active);
        info!(model_id, nodes, "deployment active");
    }

    /// Add `delta` nodes to an Active model after the scale delay.
    ///
    /// Refused while another scale or a teardown is in flight.
    pub fn scale(&self, model_id: &str, delta: u32) -> LifecycleResult<()> {
        let slot = self.slot(model_id)?;
        let mut state = lock(&slot.state);
        if state.status != DeploymentStatus::Active {
            return Err(LifecycleError::NotActive {
                model_id: model_id.into(),
                status: state.status,
            });
        }
        if delta == 0 {
            return Err(LifecycleError::InvalidDelta);
        }
        let Some(instance) = state.instance.as_mut() else {
            return Err(LifecycleError::NoInstance(model_id.into()));
        };
        if instance.terminating {
            return Err(LifecycleError::TerminationInFlight(model_id.into()));
        }
        if instance.scaling {
            return Err(LifecycleError::ScaleInFlight(model_id.into()));
        }

        instance.scaling = true;
        let instance_id = instance.id;
        let target = instance.nodes.saturating_add(delta);
        instance
            .log
            .append(EventCategory::Cluster, format!("Re-scaling nodes to {target}..."));

        let controller = self.clone();
        let id = model_id.to_string();
        state.scaling = Some(self.scheduler.schedule(
            self.settings.scale_delay(),
            Box::pin(async move { controller.finish_scale(&id, instance_id, delta) }),
        ));
        info!(model_id, target, "scale scheduled");
        Ok(())
    }

    /// Scale by the configured default delta.
    pub fn scale_default(&self, model_id: &str) -> LifecycleResult<()> {
        self.scale(model_id, self.settings.scale_delta)
    }

    fn finish_scale(&self, model_id: &str, instance_id: Uuid, delta: u32) {
        let Some(slot) = self.catalog.slot(model_id) else {
            return;
        };
        let mut state = lock(&slot.state);
        let active = state.status == DeploymentStatus::Active;
        let Some(instance) = state.instance.as_mut() else {
            debug!(model_id, "scale completion after teardown discarded");
            return;
        };
        if instance.id != instance_id || !instance.scaling || instance.terminating || !active {
            debug!(model_id, %instance_id, "stale scale completion discarded");
            return;
        }
        instance.nodes = instance.nodes.saturating_add(delta);
        instance.scaling = false;
        let nodes = instance.nodes;
        instance.log.append(
            EventCategory::Cluster,
            format!("Successfully scaled to {nodes} nodes. Performance +15%"),
        );
        state.scaling = None;
        info!(model_id, nodes, "scale complete");
    }

    /// Tear down the open instance; the model returns to Idle after the
    /// teardown delay.
    ///
    /// Any pending deploy-settle or scale completion is cancelled.
    pub fn terminate(&self, model_id: &str) -> LifecycleResult<()> {
        let slot = self.slot(model_id)?;
        let mut guard = lock(&slot.state);
        let state = &mut *guard;
        let Some(instance) = state.instance.as_mut() else {
            return Err(LifecycleError::NoInstance(model_id.into()));
        };
        if instance.terminating {
            return Err(LifecycleError::TerminationInFlight(model_id.into()));
        }

        instance.terminating = true;
        instance.scaling = false;
        let instance_id = instance.id;
        instance
            .log
            .append(EventCategory::System, "Terminating edge nodes...");

        if let Some(pending) = state.scaling.take() {
            pending.cancel();
        }
        if let Some(pending) = state.transition.take() {
            pending.cancel();
        }

        let controller = self.clone();
        let id = model_id.to_string();
        state.transition = Some(self.scheduler.schedule(
            self.settings.teardown(),
            Box::pin(async move { controller.finish_terminate(&id, instance_id) }),
        ));
        info!(model_id, %instance_id, "teardown scheduled");
        Ok(())
    }

    fn finish_terminate(&self, model_id: &str, instance_id: Uuid) {
        let Some(slot) = self.catalog.slot(model_id) else {
            return;
        };
        let mut state = lock(&slot.state);
        match state.instance.as_ref() {
            Some(i) if i.id == instance_id && i.terminating => {}
            _ => {
                debug!(model_id, %instance_id, "stale teardown completion discarded");
                return;
            }
        }
        state.instance = None;
        state.transition = None;
        if let Some(pending) = state.scaling.take() {
            pending.cancel();
        }
        self.set_status(model_id, &mut state, DeploymentStatus::Idle);
        info!(model_id, "deployment terminated");
    }

    /// Mark a deploying or active model as Failed.
    ///
    /// Nothing in the console calls this on its own; it is the entry point
    /// for a backend that reports a failed deployment. The instance is kept
    /// so `terminate` can clean it up.
    pub fn fail(&self, model_id: &str, reason: &str) -> LifecycleResult<()> {
        let slot = self.slot(model_id)?;
        let mut guard = lock(&slot.state);
        let state = &mut *guard;
        if !matches!(
            state.status,
            DeploymentStatus::Deploying | DeploymentStatus::Active
        ) {
            return Err(LifecycleError::NotActive {
                model_id: model_id.into(),
                status: state.status,
            });
        }
        let Some(instance) = state.instance.as_mut() else {
            return Err(LifecycleError::NoInstance(model_id.into()));
        };
        if instance.terminating {
            return Err(LifecycleError::TerminationInFlight(model_id.into()));
        }
        instance.scaling = false;
        instance.log.append(EventCategory::Error, reason);
        if let Some(pending) = state.scaling.take() {
            pending.cancel();
        }
        if let Some(pending) = state.transition.take() {
            pending.cancel();
        }
        self.set_status(model_id, state, DeploymentStatus::Failed);
        warn!(model_id, reason, "deployment failed");
        Ok(())
    }

    /// Replace the instance's event log with a fresh one for a new
    /// workspace session and return a handle to it.
    pub(crate) fn begin_session_log(&self, model_id: &str) -> LifecycleResult<EventLog> {
        let slot = self.slot(model_id)?;
        let mut state = lock(&slot.state);
        if state.status != DeploymentStatus::Active {
            return Err(LifecycleError::NotActive {
                model_id: model_id.into(),
                status: state.status,
            });
        }
        let Some(instance) = state.instance.as_mut() else {
            return Err(LifecycleError::NoInstance(model_id.into()));
        };
        if instance.terminating {
            return Err(LifecycleError::TerminationInFlight(model_id.into()));
        }

        let log = EventLog::new();
        log.append(EventCategory::System, format!("Instance {model_id} initialized"));
        log.append(EventCategory::Auth, "Bearer token verified");
        log.append(
            EventCategory::Model,
            format!("{} warm-started", slot.spec.name),
        );
        instance.log = log.clone();
        Ok(log)
    }

    fn slot(&self, model_id: &str) -> LifecycleResult<&Arc<ModelSlot>> {
        self.catalog
            .slot(model_id)
            .ok_or_else(|| LifecycleError::UnknownModel(model_id.into()))
    }

    fn append(&self, state: &SlotState, category: EventCategory, message: String) {
        if let Some(instance) = state.instance.as_ref() {
            instance.log.append(category, message);
        }
    }

    /// Write a new status and broadcast it. Called with the slot lock held
    /// so observers see changes in the order they happened.
    fn set_status(&self, model_id: &str, state: &mut SlotState, to: DeploymentStatus) {
        let from = state.status;
        state.status = to;
        let _ = self.events.send(StatusChange {
            model_id: model_id.to_string(),
            from,
            to,
        });
    }
}
