//! Cluster lifecycle tests against the in-memory Omni state

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use omni_provider::config::{ResolvedConfig, SecretString};
use omni_provider::resources::{
    ClusterModel, MachineSetTemplateModel, MachinesTemplateModel,
};
use omni_provider::state::{
    ClusterPhase, ClusterStatus, MACHINE_STATUS_TYPE, MachineStatus, MachineStatusSpec,
    ResourceMetadata, ResourcePhase,
};
use omni_provider::{
    ConfiguredProvider, MockOmniState, OmniProvider, PollConfig, ProviderError, Resource,
};
use url::Url;

fn poll_config() -> PollConfig {
    PollConfig {
        timeout: Duration::from_secs(5),
        initial_interval: Duration::from_millis(1),
        max_interval: Duration::from_millis(5),
        multiplier: 2.0,
        max_attempts: None,
    }
}

fn provider(mock: &Arc<MockOmniState>) -> ConfiguredProvider<MockOmniState> {
    let resolved = ResolvedConfig {
        endpoint: Url::parse("https://omni.example.com").unwrap(),
        service_account_key: SecretString::new("key"),
        poll: poll_config(),
    };
    OmniProvider::new("test").configure_resolved(resolved, mock.clone())
}

fn machine_status(id: &str) -> MachineStatus {
    MachineStatus {
        metadata: ResourceMetadata {
            id: id.to_string(),
            namespace: "default".to_string(),
            resource_type: MACHINE_STATUS_TYPE.to_string(),
            phase: ResourcePhase::Running,
            version: 1,
            created: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
            updated: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
            labels: Default::default(),
        },
        spec: MachineStatusSpec {
            cluster: "prod".to_string(),
            ..Default::default()
        },
    }
}

/// Render the fragments the way a configuration would, through the template resources
async fn planned_cluster(configured: &ConfiguredProvider<MockOmniState>) -> ClusterModel {
    let control_plane = configured
        .machine_set_template()
        .create(MachineSetTemplateModel {
            kind: "controlplane".to_string(),
            machines: vec!["cp-1".to_string()],
            ..Default::default()
        })
        .await
        .unwrap();

    let workers = configured
        .machine_set_template()
        .create(MachineSetTemplateModel {
            name: "general".to_string(),
            kind: "worker".to_string(),
            machines: vec!["w-1".to_string()],
            ..Default::default()
        })
        .await
        .unwrap();

    let machine = configured
        .machines_template()
        .create(MachinesTemplateModel {
            name: "cp-1".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    ClusterModel {
        cluster_template:
            "kind: Cluster\nname: prod\nkubernetes:\n  version: v1.30.1\ntalos:\n  version: v1.7.4\n"
                .to_string(),
        control_plane_template: control_plane.yaml,
        workers_template: vec![workers.yaml],
        machines_template: vec![machine.yaml],
        ..Default::default()
    }
}

#[tokio::test]
async fn test_create_syncs_and_waits_for_ready() {
    let mock = Arc::new(MockOmniState::new());
    mock.push_cluster_status_error("prod", ProviderError::not_found("ClusterStatus", "prod"));
    mock.push_cluster_status("prod", ClusterStatus::pending(ClusterPhase::ScalingUp));

    let configured = provider(&mock);
    let plan = planned_cluster(&configured).await;
    let created = configured.cluster().create(plan).await.unwrap();

    assert_eq!(created.id, "prod");
    assert_eq!(created.delete_machine_links, Some(false));
    assert_eq!(created.created_at, created.last_updated);
    assert_eq!(created.yaml.matches("---\n").count(), 3);
    assert_eq!(mock.template("prod").as_deref(), Some(created.yaml.as_str()));

    let counts = mock.operation_counts();
    assert_eq!(counts.syncs, 1);
    assert_eq!(counts.status_gets, 3);
}

#[tokio::test]
async fn test_create_reports_invalid_cluster_template() {
    let mock = Arc::new(MockOmniState::new());
    let configured = provider(&mock);

    let plan = ClusterModel {
        cluster_template: "kind: Cluster\nname: [".to_string(),
        control_plane_template: "kind: ControlPlane\n".to_string(),
        ..Default::default()
    };
    let diagnostics = configured.cluster().create(plan).await.unwrap_err();

    assert_eq!(
        diagnostics.iter().next().unwrap().summary,
        "Invalid cluster template"
    );
    assert_eq!(mock.operation_counts().syncs, 0);
}

#[tokio::test]
async fn test_read_keeps_equivalent_fragments() {
    let mock = Arc::new(MockOmniState::new());
    let configured = provider(&mock);
    let created = configured
        .cluster()
        .create(planned_cluster(&configured).await)
        .await
        .unwrap();

    // Omni re-orders keys on export
    mock.insert_template(
        "prod",
        "kind: Cluster\ntalos:\n  version: v1.7.4\nkubernetes:\n  version: v1.30.1\nname: prod\n---\nkind: ControlPlane\nmachines: [cp-1]\n---\nkind: Workers\nname: general\nmachines: [w-1, w-2]\n---\nkind: Machine\nname: cp-1\n",
    );

    let read = configured.cluster().read(created.clone()).await.unwrap();

    assert_eq!(read.cluster_template, created.cluster_template);
    assert_eq!(read.control_plane_template, created.control_plane_template);
    assert_ne!(read.workers_template, created.workers_template);
    assert!(read.workers_template[0].contains("w-2"));
    assert_eq!(read.machines_template, created.machines_template);
    assert!(read.yaml.contains("w-2"));
}

#[tokio::test]
async fn test_read_surfaces_export_failure() {
    let mock = Arc::new(MockOmniState::new());
    let configured = provider(&mock);

    let diagnostics = configured
        .cluster()
        .read(configured.cluster().import("missing"))
        .await
        .unwrap_err();
    assert_eq!(
        diagnostics.iter().next().unwrap().summary,
        "Problem exporting template"
    );
}

#[tokio::test]
async fn test_read_surfaces_split_failure() {
    let mock = Arc::new(MockOmniState::new());
    let configured = provider(&mock);
    let created = configured
        .cluster()
        .create(planned_cluster(&configured).await)
        .await
        .unwrap();

    mock.insert_template("prod", "kind: Cluster\nname: prod\n---\nkind: Workers\nname: [\n");

    let diagnostics = configured.cluster().read(created).await.unwrap_err();
    assert_eq!(
        diagnostics.iter().next().unwrap().summary,
        "Error splitting exported template"
    );
}

#[tokio::test]
async fn test_update_failure_leaves_state_alone() {
    let mock = Arc::new(MockOmniState::new());
    let configured = provider(&mock);
    let created = configured
        .cluster()
        .create(planned_cluster(&configured).await)
        .await
        .unwrap();

    mock.fail_sync("rpc error: code = Unavailable");
    let mut plan = created.clone();
    plan.workers_template.clear();

    let diagnostics = configured
        .cluster()
        .update(plan, created.clone())
        .await
        .unwrap_err();
    assert_eq!(
        diagnostics.iter().next().unwrap().summary,
        "Error syncing template"
    );
    assert_eq!(mock.template("prod").as_deref(), Some(created.yaml.as_str()));
}

#[tokio::test]
async fn test_update_keeps_identity() {
    let mock = Arc::new(MockOmniState::new());
    let configured = provider(&mock);
    let created = configured
        .cluster()
        .create(planned_cluster(&configured).await)
        .await
        .unwrap();

    let mut plan = created.clone();
    plan.id = String::new();
    plan.created_at = String::new();
    plan.workers_template.clear();

    let updated = configured
        .cluster()
        .update(plan, created.clone())
        .await
        .unwrap();

    assert_eq!(updated.id, "prod");
    assert_eq!(updated.created_at, created.created_at);
    assert!(!updated.yaml.contains("kind: Workers"));
    assert_eq!(mock.operation_counts().syncs, 2);
}

#[tokio::test]
async fn test_update_waits_for_renamed_cluster() {
    let mock = Arc::new(MockOmniState::new());
    let configured = provider(&mock);
    let created = configured
        .cluster()
        .create(planned_cluster(&configured).await)
        .await
        .unwrap();

    mock.push_cluster_status("renamed", ClusterStatus::pending(ClusterPhase::ScalingUp));
    mock.push_cluster_status_error("renamed", ProviderError::Api("broken".to_string()));

    let mut plan = created.clone();
    plan.cluster_template = created.cluster_template.replace("name: prod", "name: renamed");

    let diagnostics = configured
        .cluster()
        .update(plan, created.clone())
        .await
        .unwrap_err();
    assert_eq!(
        diagnostics.iter().next().unwrap().summary,
        "Error waiting for cluster to become ready"
    );
    assert!(mock.template("renamed").is_some());
    // one lookup for create, two for the renamed cluster
    assert_eq!(mock.operation_counts().status_gets, 3);
}

#[tokio::test]
async fn test_delete_removes_machine_links() {
    let mock = Arc::new(
        MockOmniState::new().with_machines(vec![machine_status("cp-1"), machine_status("other")]),
    );
    let configured = provider(&mock);

    let mut plan = planned_cluster(&configured).await;
    plan.delete_machine_links = Some(true);
    let created = configured.cluster().create(plan).await.unwrap();

    mock.push_destroy_status("prod", "DestroyingMachineSets");
    configured.cluster().delete(created).await.unwrap();

    assert!(mock.template("prod").is_none());
    assert_eq!(mock.torn_down_links(), vec!["cp-1"]);
    assert_eq!(mock.destroyed_links(), vec!["cp-1"]);
    assert_eq!(mock.operation_counts().destroy_status_gets, 2);
}

#[tokio::test]
async fn test_delete_keeps_machine_links_by_default() {
    let mock = Arc::new(MockOmniState::new().with_machines(vec![machine_status("cp-1")]));
    let configured = provider(&mock);
    let created = configured
        .cluster()
        .create(planned_cluster(&configured).await)
        .await
        .unwrap();

    configured.cluster().delete(created).await.unwrap();

    assert!(mock.torn_down_links().is_empty());
    assert_eq!(mock.operation_counts().deletes, 1);
}

#[tokio::test]
async fn test_delete_fails_when_destroy_status_lookup_breaks() {
    let mock = Arc::new(MockOmniState::new());
    let configured = provider(&mock);
    let created = configured
        .cluster()
        .create(planned_cluster(&configured).await)
        .await
        .unwrap();

    mock.push_destroy_status_error("prod", ProviderError::Api("connection reset".to_string()));
    let diagnostics = configured.cluster().delete(created).await.unwrap_err();

    assert_eq!(
        diagnostics.iter().next().unwrap().summary,
        "Error waiting for cluster deletion"
    );
}

#[tokio::test]
async fn test_cancelled_create() {
    let mock = Arc::new(MockOmniState::new());
    for _ in 0..1000 {
        mock.push_cluster_status("prod", ClusterStatus::pending(ClusterPhase::ScalingUp));
    }

    let configured = provider(&mock);
    let token = configured.poller().cancellation_token();
    token.cancel();

    let diagnostics = configured
        .cluster()
        .create(planned_cluster(&configured).await)
        .await
        .unwrap_err();
    assert!(diagnostics.iter().next().unwrap().detail.contains("cancelled"));
}
