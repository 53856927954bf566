//! Status change events: broadcast channel for the console and observers.
//!
//! Best-effort delivery: a subscriber that falls behind gets `Lagged` and
//! should re-read status from the controller.

use crate::catalog::DeploymentStatus;

/// A model moved from one status to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub model_id: String,
    pub from: DeploymentStatus,
    pub to: DeploymentStatus,
}
