//! Model catalog: the set of known models and their deployment status.
//!
//! The catalog is loaded once (from config or the built-in defaults) and
//! never shrinks. Each model lives in its own slot behind its own lock, so
//! lifecycle operations on different models never contend. Status is only
//! written by `lifecycle::DeploymentController`; everything else reads
//! snapshots.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::lifecycle::instance::DeploymentInstance;
use crate::lifecycle::scheduler::ScheduledHandle;
use crate::sync::lock;

/// Model category. Only `Nlp` models hold conversations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "NLP")]
    Nlp,
    Vision,
    Audio,
    Anomaly,
    Logic,
    Image,
}

impl Category {
    pub fn label(self) -> &'static str {
        match self {
            Category::Nlp => "NLP",
            Category::Vision => "Vision",
            Category::Audio => "Audio",
            Category::Anomaly => "Anomaly",
            Category::Logic => "Logic",
            Category::Image => "Image",
        }
    }

    pub fn is_conversational(self) -> bool {
        self == Category::Nlp
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Deployment status of a catalog model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeploymentStatus {
    #[default]
    Idle,
    Deploying,
    Active,
    /// Reachable only through `DeploymentController::fail`.
    Failed,
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeploymentStatus::Idle => "Idle",
            DeploymentStatus::Deploying => "Deploying",
            DeploymentStatus::Active => "Active",
            DeploymentStatus::Failed => "Failed",
        };
        f.write_str(s)
    }
}

/// Static description of a model as it appears in the catalog file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub id: String,
    pub name: String,
    pub category: Category,
    pub latency: String,
    pub tier: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// A catalog model together with its current status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRecord {
    pub spec: ModelSpec,
    pub status: DeploymentStatus,
}

impl ModelRecord {
    pub fn id(&self) -> &str {
        &self.spec.id
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn category(&self) -> Category {
        self.spec.category
    }
}

/// Errors raised while building a catalog.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("duplicate model id in catalog: {0}")]
    DuplicateId(String),

    #[error("model id must not be empty")]
    EmptyId,
}

/// Mutable per-model state guarded by the slot lock.
#[derive(Debug)]
pub(crate) struct SlotState {
    pub(crate) status: DeploymentStatus,
    pub(crate) instance: Option<DeploymentInstance>,
    /// Pending deploy-settle or teardown completion.
    pub(crate) transition: Option<ScheduledHandle>,
    /// Pending scale completion.
    pub(crate) scaling: Option<ScheduledHandle>,
}

#[derive(Debug)]
pub(crate) struct ModelSlot {
    pub(crate) spec: ModelSpec,
    pub(crate) state: Mutex<SlotState>,
}

impl ModelSlot {
    fn new(spec: ModelSpec) -> Self {
        Self {
            spec,
            state: Mutex::new(SlotState {
                status: DeploymentStatus::Idle,
                instance: None,
                transition: None,
                scaling: None,
            }),
        }
    }

    pub(crate) fn record(&self) -> ModelRecord {
        ModelRecord {
            spec: self.spec.clone(),
            status: lock(&self.state).status,
        }
    }
}

/// Indexed, insertion-ordered collection of model slots.
#[derive(Debug)]
pub struct Catalog {
    order: Vec<String>,
    slots: HashMap<String, Arc<ModelSlot>>,
}

impl Catalog {
    /// Build a catalog. Every model starts `Idle`.
    pub fn new(specs: Vec<ModelSpec>) -> Result<Self, CatalogError> {
        let mut order = Vec::with_capacity(specs.len());
        let mut slots = HashMap::with_capacity(specs.len());
        for spec in specs {
            if spec.id.trim().is_empty() {
                return Err(CatalogError::EmptyId);
            }
            if slots.contains_key(&spec.id) {
                return Err(CatalogError::DuplicateId(spec.id));
            }
            order.push(spec.id.clone());
            slots.insert(spec.id.clone(), Arc::new(ModelSlot::new(spec)));
        }
        Ok(Self { order, slots })
    }

    /// The built-in demo catalog.
    pub fn builtin() -> Self {
        Self {
            order: default_models().iter().map(|m| m.id.clone()).collect(),
            slots: default_models()
                .into_iter()
                .map(|m| (m.id.clone(), Arc::new(ModelSlot::new(m))))
                .collect(),
        }
    }

    pub(crate) fn slot(&self, id: &str) -> Option<&Arc<ModelSlot>> {
        self.slots.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.slots.contains_key(id)
    }

    /// Snapshot of one model.
    pub fn get(&self, id: &str) -> Option<ModelRecord> {
        self.slots.get(id).map(|slot| slot.record())
    }

    /// Snapshot of every model in catalog order.
    pub fn records(&self) -> Vec<ModelRecord> {
        self.order
            .iter()
            .filter_map(|id| self.slots.get(id))
            .map(|slot| slot.record())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Models shipped with the console when no catalog is configured.
pub fn default_models() -> Vec<ModelSpec> {
    vec![
        ModelSpec {
            id: "m1".into(),
            name: "Core LLM v4".into(),
            category: Category::Nlp,
            latency: "12ms".into(),
            tier: "High Performance".into(),
            description: "General purpose high-performance LLM for enterprise chat and logic."
                .into(),
        },
        ModelSpec {
            id: "m2".into(),
            name: "ChangeDetector-Pro".into(),
            category: Category::Vision,
            latency: "45ms".into(),
            tier: "Computer Vision".into(),
            description: "In-house CV model for detecting pixel-level changes in streams.".into(),
        },
        ModelSpec {
            id: "m3".into(),
            name: "CPU-STT Edge".into(),
            category: Category::Audio,
            latency: "8ms".into(),
            tier: "Edge Audio".into(),
            description: "Speech-to-Text running entirely on edge CPU nodes.".into(),
        },
        ModelSpec {
            id: "m4".into(),
            name: "AnomalySense".into(),
            category: Category::Anomaly,
            latency: "2ms".into(),
            tier: "Signal Processing".into(),
            description: "Real-time pattern recognition and anomaly detection in JSON streams."
                .into(),
        },
    ]
}
