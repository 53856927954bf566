//! Deployment instance: the live cluster behind an Active model.

use uuid::Uuid;

use crate::eventlog::EventLog;

/// One open deployment. Exists from `deploy` until teardown completes.
#[derive(Debug)]
pub struct DeploymentInstance {
    pub(crate) id: Uuid,
    pub(crate) model_id: String,
    pub(crate) nodes: u32,
    pub(crate) scaling: bool,
    pub(crate) terminating: bool,
    pub(crate) endpoint: String,
    pub(crate) log: EventLog,
}

impl DeploymentInstance {
    pub(crate) fn new(model_id: &str, initial_nodes: u32, endpoint_base: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            model_id: model_id.to_string(),
            nodes: initial_nodes.max(1),
            scaling: false,
            terminating: false,
            endpoint: format!("{}/{model_id}", endpoint_base.trim_end_matches('/')),
            log: EventLog::new(),
        }
    }

    pub(crate) fn snapshot(&self) -> InstanceSnapshot {
        InstanceSnapshot {
            instance_id: self.id,
            model_id: self.model_id.clone(),
            nodes: self.nodes,
            scaling: self.scaling,
            terminating: self.terminating,
            endpoint: self.endpoint.clone(),
        }
    }
}

/// Read-only view of an instance at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceSnapshot {
    pub instance_id: Uuid,
    pub model_id: String,
    pub nodes: u32,
    pub scaling: bool,
    pub terminating: bool,
    pub endpoint: String,
}

impl InstanceSnapshot {
    /// Estimated throughput in thousands of transactions per second.
    pub fn throughput_ktps(&self) -> f64 {
        f64::from(self.nodes) * 1.5
    }

    /// Sample integration command for the endpoint.
    pub fn curl_example(&self) -> String {
        format!(
            "curl -X POST {} \\\n  -H \"Authorization: Bearer $API_KEY\" \\\n  -d '{{\"input\": \"...\"}}'",
            self.endpoint
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_instance_defaults() {
        let instance = DeploymentInstance::new("m1", 4, "https://api.adaptive.ai/v1/inference/");
        assert_eq!(instance.nodes, 4);
        assert!(!instance.scaling);
        assert!(!instance.terminating);
        assert_eq!(instance.endpoint, "https://api.adaptive.ai/v1/inference/m1");
        assert!(instance.log.is_empty());
    }

    #[test]
    fn node_count_never_below_one() {
        let instance = DeploymentInstance::new("m1", 0, "http://x");
        assert_eq!(instance.nodes, 1);
    }

    #[test]
    fn snapshot_throughput() {
        let snap = DeploymentInstance::new("m2", 6, "http://x").snapshot();
        assert_eq!(snap.model_id, "m2");
        assert!((snap.throughput_ktps() - 9.0).abs() < f64::EPSILON);
        assert!(snap.curl_example().contains("http://x/m2"));
    }
}
