//! Catalog navigator: top-level selection between the catalog list and
//! one open workspace.
//!
//! At most one workspace is open. Opening requires an Active model and
//! always starts a fresh session and a fresh event log. Closing drops the
//! session but leaves the deployment running.
//!
//! A workspace never outlives its deployment: terminating the open model
//! closes the workspace once teardown completes, and `send` refuses while
//! the bound model is not Active.
//!
//! Provider calls are made without holding the workspace lock. When a reply
//! comes back the session id is checked; a reply for a session that has
//! since been closed or replaced is discarded.

use std::sync::{Arc, Mutex};

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info};
use uuid::Uuid;

use crate::catalog::{DeploymentStatus, ModelRecord};
use crate::eventlog::EventLogEntry;
use crate::lifecycle::error::LifecycleError;
use crate::lifecycle::events::StatusChange;
use crate::lifecycle::instance::InstanceSnapshot;
use crate::lifecycle::DeploymentController;
use crate::provider::{AdviceProvider, AdviceTip, InferenceProvider};
use crate::session::{InferenceSession, SendOutcome, SessionError, SessionSnapshot};
use crate::sync::lock;

/// Errors surfaced to the console user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsoleError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("no workspace is open")]
    NoWorkspaceOpen,
}

struct OpenWorkspace {
    model_id: String,
    session: InferenceSession,
}

/// Everything the workspace view shows, copied at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceSnapshot {
    pub model: ModelRecord,
    pub session: SessionSnapshot,
    pub instance: Option<InstanceSnapshot>,
    pub log: Vec<EventLogEntry>,
}

/// Owns the selection and routes console commands.
///
/// Cheap to clone; clones share the selection.
#[derive(Clone)]
pub struct CatalogNavigator {
    controller: DeploymentController,
    inference: Arc<dyn InferenceProvider>,
    advice: Arc<dyn AdviceProvider>,
    workspace: Arc<Mutex<Option<OpenWorkspace>>>,
}

impl CatalogNavigator {
    pub fn new(
        controller: DeploymentController,
        inference: Arc<dyn InferenceProvider>,
        advice: Arc<dyn AdviceProvider>,
    ) -> Self {
        Self {
            controller,
            inference,
            advice,
            workspace: Arc::new(Mutex::new(None)),
        }
    }

    pub fn controller(&self) -> &DeploymentController {
        &self.controller
    }

    /// Every catalog model with its live status.
    pub fn models(&self) -> Vec<ModelRecord> {
        self.controller.catalog().records()
    }

    pub fn deploy(&self, model_id: &str) -> Result<(), ConsoleError> {
        Ok(self.controller.deploy(model_id)?)
    }

    /// Scale by the configured default delta.
    pub fn scale(&self, model_id: &str) -> Result<(), ConsoleError> {
        Ok(self.controller.scale_default(model_id)?)
    }

    /// Start teardown. If the model's workspace is open it is closed once
    /// the model is back to Idle.
    pub fn terminate(&self, model_id: &str) -> Result<(), ConsoleError> {
        let changes = self.controller.subscribe();
        self.controller.terminate(model_id)?;

        let open_session = lock(&self.workspace)
            .as_ref()
            .filter(|ws| ws.model_id == model_id)
            .map(|ws| ws.session.id());
        if let Some(session_id) = open_session {
            let nav = self.clone();
            let model_id = model_id.to_string();
            tokio::spawn(async move {
                if let Err(e) = nav.wait_for_idle(changes, &model_id).await {
                    debug!(model_id, "teardown watch ended: {e}");
                }
                nav.close_session(session_id);
            });
        }
        Ok(())
    }

    /// Open the workspace for an Active model. Returns the new session id.
    pub fn open(&self, model_id: &str) -> Result<Uuid, ConsoleError> {
        let spec = self
            .controller
            .catalog()
            .get(model_id)
            .ok_or_else(|| LifecycleError::UnknownModel(model_id.into()))?
            .spec;
        let log = self.controller.begin_session_log(model_id)?;
        let session = InferenceSession::new(spec, log);
        let session_id = session.id();

        let previous = lock(&self.workspace).replace(OpenWorkspace {
            model_id: model_id.to_string(),
            session,
        });
        if let Some(previous) = previous {
            debug!(model_id = %previous.model_id, "replaced open workspace");
        }
        info!(model_id, %session_id, "workspace opened");
        Ok(session_id)
    }

    /// Back to the catalog list. Returns whether a workspace was open.
    pub fn close(&self) -> bool {
        let closed = lock(&self.workspace).take();
        if let Some(ws) = &closed {
            info!(model_id = %ws.model_id, "workspace closed");
        }
        closed.is_some()
    }

    /// Model id of the open workspace, if any.
    pub fn selected(&self) -> Option<String> {
        lock(&self.workspace).as_ref().map(|ws| ws.model_id.clone())
    }

    /// Send a message to the open workspace's session.
    ///
    /// Rejections happen before the provider is called.
    pub async fn send(&self, text: &str) -> Result<SendOutcome, ConsoleError> {
        let (session_id, request) = {
            let mut guard = lock(&self.workspace);
            let ws = guard.as_mut().ok_or(ConsoleError::NoWorkspaceOpen)?;
            let status = self.controller.status(&ws.model_id)?;
            if status != DeploymentStatus::Active {
                return Err(LifecycleError::NotActive {
                    model_id: ws.model_id.clone(),
                    status,
                }
                .into());
            }
            match ws.session.begin(text)? {
                Some(request) => (ws.session.id(), request),
                None => return Ok(SendOutcome::Signal),
            }
        };

        let result = self.inference.infer(request).await;

        let mut guard = lock(&self.workspace);
        match guard.as_mut() {
            Some(ws) if ws.session.id() == session_id => Ok(ws.session.settle(result)),
            _ => {
                debug!(%session_id, "reply for closed session discarded");
                Ok(SendOutcome::Discarded)
            }
        }
    }

    /// Terminate a model and close its workspace once teardown completes.
    ///
    /// Resolves when the model is back to Idle.
    pub async fn open_then_terminate(&self, model_id: &str) -> Result<(), ConsoleError> {
        let changes = self.controller.subscribe();
        self.controller.terminate(model_id)?;
        self.wait_for_idle(changes, model_id).await?;

        let mut guard = lock(&self.workspace);
        if guard.as_ref().is_some_and(|ws| ws.model_id == model_id) {
            *guard = None;
            info!(model_id, "workspace closed after teardown");
        }
        Ok(())
    }

    async fn wait_for_idle(
        &self,
        mut changes: broadcast::Receiver<StatusChange>,
        model_id: &str,
    ) -> Result<(), ConsoleError> {
        loop {
            match changes.recv().await {
                Ok(change) if change.model_id == model_id && change.to == DeploymentStatus::Idle => {
                    return Ok(())
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "status subscriber lagged");
                    if self.controller.status(model_id)? == DeploymentStatus::Idle {
                        return Ok(());
                    }
                }
                Err(RecvError::Closed) => return Ok(()),
            }
        }
    }

    /// Close the workspace only if it still holds `session_id`.
    fn close_session(&self, session_id: Uuid) {
        let mut guard = lock(&self.workspace);
        if guard.as_ref().is_some_and(|ws| ws.session.id() == session_id) {
            if let Some(ws) = guard.take() {
                info!(model_id = %ws.model_id, "workspace closed after teardown");
            }
        }
    }

    /// Snapshot of the open workspace.
    pub fn workspace(&self) -> Option<WorkspaceSnapshot> {
        let guard = lock(&self.workspace);
        let ws = guard.as_ref()?;
        let model = self.controller.catalog().get(&ws.model_id)?;
        let instance = self.controller.instance(&ws.model_id).ok().flatten();
        Some(WorkspaceSnapshot {
            model,
            session: ws.session.snapshot(),
            instance,
            log: ws.session.log().entries(),
        })
    }

    /// Fine-tuning tips for a model tier and dataset description.
    pub async fn advice(&self, tier: &str, dataset: &str) -> Vec<AdviceTip> {
        self.advice.advise(tier, dataset).await
    }
}

impl std::fmt::Debug for CatalogNavigator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogNavigator")
            .field("controller", &self.controller)
            .field("selected", &self.selected())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::lifecycle::LifecycleSettings;
    use crate::provider::OfflineProvider;
    use std::time::Duration;

    fn navigator() -> CatalogNavigator {
        let settings = LifecycleSettings {
            deploy_settle_ms: 10,
            teardown_ms: 10,
            scale_ms: 10,
            ..LifecycleSettings::default()
        };
        let controller = DeploymentController::new(Arc::new(Catalog::builtin()), settings);
        let offline = Arc::new(OfflineProvider::new("test"));
        CatalogNavigator::new(controller, offline.clone(), offline)
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn open_requires_active() {
        let nav = navigator();
        assert!(matches!(
            nav.open("m1").unwrap_err(),
            ConsoleError::Lifecycle(LifecycleError::NotActive { .. })
        ));
        assert_eq!(
            nav.open("ghost").unwrap_err(),
            ConsoleError::Lifecycle(LifecycleError::UnknownModel("ghost".into()))
        );
        assert!(nav.selected().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn reopen_starts_fresh_session() {
        let nav = navigator();
        nav.deploy("m1").unwrap();
        settle().await;

        let first = nav.open("m1").unwrap();
        let _ = nav.send("hello").await.unwrap();
        assert_eq!(nav.workspace().unwrap().session.turns.len(), 1);

        assert!(nav.close());
        assert!(!nav.close());
        assert_eq!(nav.controller().status("m1").unwrap(), DeploymentStatus::Active);

        let second = nav.open("m1").unwrap();
        assert_ne!(first, second);
        let ws = nav.workspace().unwrap();
        assert!(ws.session.turns.is_empty());
        assert_eq!(ws.log.len(), 3);
        assert_eq!(ws.instance.unwrap().nodes, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn send_without_workspace() {
        let nav = navigator();
        assert_eq!(
            nav.send("hello").await.unwrap_err(),
            ConsoleError::NoWorkspaceOpen
        );
    }

    #[tokio::test(start_paused = true)]
    async fn send_refused_once_model_leaves_active() {
        let nav = navigator();
        nav.deploy("m1").unwrap();
        settle().await;
        nav.open("m1").unwrap();
        nav.controller().fail("m1", "node lost").unwrap();

        assert_eq!(
            nav.send("hello").await.unwrap_err(),
            ConsoleError::Lifecycle(LifecycleError::NotActive {
                model_id: "m1".into(),
                status: DeploymentStatus::Failed,
            })
        );
        let ws = nav.workspace().unwrap();
        assert!(ws.session.turns.is_empty());
        assert!(!ws.session.awaiting);
        assert_eq!(ws.log.last().unwrap().message, "node lost");
    }

    #[tokio::test(start_paused = true)]
    async fn offline_provider_logs_crash() {
        let nav = navigator();
        nav.deploy("m1").unwrap();
        settle().await;
        nav.open("m1").unwrap();

        let outcome = nav.send("hello").await.unwrap();
        assert!(matches!(outcome, SendOutcome::ProviderFailed(_)));
        let log = nav.workspace().unwrap().log;
        assert_eq!(log.last().unwrap().message, "Crash detected");
    }

    #[tokio::test(start_paused = true)]
    async fn advice_delegates() {
        let nav = navigator();
        assert!(nav.advice("SLM", "tickets").await.is_empty());
    }
}
