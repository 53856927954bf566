//! Deployment lifecycle end to end, on tokio's paused clock.

use std::sync::Arc;
use std::time::Duration;

use inference_console::catalog::{Catalog, DeploymentStatus};
use inference_console::eventlog::EventCategory;
use inference_console::lifecycle::error::LifecycleError;
use inference_console::lifecycle::{DeploymentController, LifecycleSettings};
use tokio::time::sleep;

fn controller() -> DeploymentController {
    DeploymentController::new(Arc::new(Catalog::builtin()), LifecycleSettings::default())
}

async fn wait_ms(ms: u64) {
    sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn deploy_scale_terminate_log_in_order() {
    let c = controller();
    c.deploy("m1").unwrap();
    let log = c.event_log("m1").unwrap().unwrap();

    wait_ms(2600).await;
    assert_eq!(c.status("m1").unwrap(), DeploymentStatus::Active);

    c.scale_default("m1").unwrap();
    wait_ms(2100).await;
    assert_eq!(c.instance("m1").unwrap().unwrap().nodes, 6);

    c.terminate("m1").unwrap();
    wait_ms(2100).await;
    assert_eq!(c.status("m1").unwrap(), DeploymentStatus::Idle);

    let entries = log.entries();
    let lines: Vec<(EventCategory, &str)> = entries
        .iter()
        .map(|e| (e.category, e.message.as_str()))
        .collect();
    assert_eq!(
        lines,
        vec![
            (EventCategory::System, "Provisioning instance m1"),
            (EventCategory::System, "Instance m1 active on 4 nodes"),
            (EventCategory::Cluster, "Re-scaling nodes to 6..."),
            (
                EventCategory::Cluster,
                "Successfully scaled to 6 nodes. Performance +15%"
            ),
            (EventCategory::System, "Terminating edge nodes..."),
        ]
    );
    assert!(entries.windows(2).all(|w| w[0].at_millis < w[1].at_millis));
}

#[tokio::test(start_paused = true)]
async fn observers_see_only_lifecycle_statuses() {
    let c = controller();
    let mut rx = c.subscribe();

    c.deploy("m1").unwrap();
    c.deploy("m1").unwrap();
    wait_ms(2600).await;
    c.terminate("m1").unwrap();
    wait_ms(2100).await;

    let mut seen = Vec::new();
    while let Ok(change) = rx.try_recv() {
        assert_eq!(change.model_id, "m1");
        seen.push((change.from, change.to));
    }
    assert_eq!(
        seen,
        vec![
            (DeploymentStatus::Idle, DeploymentStatus::Deploying),
            (DeploymentStatus::Deploying, DeploymentStatus::Active),
            (DeploymentStatus::Active, DeploymentStatus::Idle),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn terminate_during_scale_drops_node_update() {
    let c = controller();
    c.deploy("m1").unwrap();
    wait_ms(2600).await;
    let log = c.event_log("m1").unwrap().unwrap();

    c.scale("m1", 2).unwrap();
    wait_ms(500).await;
    c.terminate("m1").unwrap();
    assert!(!c.instance("m1").unwrap().unwrap().scaling);

    wait_ms(5000).await;
    assert_eq!(c.status("m1").unwrap(), DeploymentStatus::Idle);
    assert!(c.instance("m1").unwrap().is_none());
    assert!(log
        .entries()
        .iter()
        .all(|e| !e.message.starts_with("Successfully scaled")));

    // A fresh deployment starts from the configured node count.
    c.deploy("m1").unwrap();
    wait_ms(2600).await;
    assert_eq!(c.instance("m1").unwrap().unwrap().nodes, 4);
}

#[tokio::test(start_paused = true)]
async fn rejected_operations_leave_no_trace() {
    let c = controller();
    c.deploy("m2").unwrap();
    let log = c.event_log("m2").unwrap().unwrap();
    let before = log.len();

    assert!(matches!(
        c.scale("m2", 2).unwrap_err(),
        LifecycleError::NotActive { .. }
    ));
    assert_eq!(log.len(), before);
    assert_eq!(c.status("m2").unwrap(), DeploymentStatus::Deploying);

    wait_ms(2600).await;
    c.scale("m2", 2).unwrap();
    let before = log.len();
    assert_eq!(
        c.scale("m2", 2).unwrap_err(),
        LifecycleError::ScaleInFlight("m2".into())
    );
    assert_eq!(log.len(), before);

    wait_ms(2100).await;
    assert_eq!(c.instance("m2").unwrap().unwrap().nodes, 6);
}

#[tokio::test(start_paused = true)]
async fn instance_reports_endpoint_and_throughput() {
    let c = controller();
    c.deploy("m4").unwrap();
    wait_ms(2600).await;

    let snap = c.instance("m4").unwrap().unwrap();
    assert_eq!(snap.endpoint, "https://api.adaptive.ai/v1/inference/m4");
    assert_eq!(snap.throughput_ktps(), 6.0);
    assert!(snap.curl_example().contains(&snap.endpoint));
}
