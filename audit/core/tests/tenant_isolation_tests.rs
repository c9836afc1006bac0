// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::json;
use tenant_audit_core::application::{
    create_repositories, AuditService, IntegrityChecker, ProvisionRequest, StoreRegistry,
    TenantProvisioningService,
};
use tenant_audit_core::domain::repository::{SledConfig, StorageBackend};
use tenant_audit_core::infrastructure::EventBus;
use tenant_audit_core::{EventQuery, NewAuditEvent, TenantId};

struct Core {
    audit: AuditService,
    provisioning: TenantProvisioningService,
}

fn build(backend: &StorageBackend) -> Core {
    let repos = create_repositories(backend).unwrap();
    let bus = Arc::new(EventBus::new(128));
    let registry = Arc::new(StoreRegistry::new(repos.provider.clone()));
    let checker = Arc::new(
        IntegrityChecker::new(repos.directory.clone(), repos.platform.clone(), bus.clone())
            .with_storage(registry.clone()),
    );
    Core {
        provisioning: TenantProvisioningService::new(
            repos.directory.clone(),
            repos.platform.clone(),
            registry.clone(),
            bus.clone(),
        ),
        audit: AuditService::new(repos.directory, registry, checker, bus, 1000),
    }
}

fn tenant(id: &str) -> TenantId {
    TenantId::parse(id).unwrap()
}

fn set(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|v| v.to_string()).collect()
}

async fn provision(core: &Core, ids: &[&str]) {
    for id in ids {
        core.provisioning
            .provision(&tenant(id), ProvisionRequest::default())
            .await
            .unwrap();
    }
    core.audit.run_integrity_check().await.unwrap().ensure_clean().unwrap();
}

#[tokio::test]
async fn test_scenario_query_by_creator() {
    let core = build(&StorageBackend::InMemory);
    provision(&core, &["u1"]).await;

    let content = json!({ "action": "events.get", "message": "hello" });
    core.audit
        .record_event(
            &tenant("u1"),
            NewAuditEvent::new("log/test", "u1")
                .with_stream_ids([":_audit:test"])
                .with_content(content.clone()),
        )
        .await
        .unwrap();

    let found = core
        .audit
        .get_events(&tenant("u1"), &EventQuery::all().field("createdBy", "u1"))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].content, content);
}

#[tokio::test]
async fn test_scenario_distinct_actions_and_accesses() {
    let core = build(&StorageBackend::InMemory);
    provision(&core, &["u1"]).await;

    for tags in [
        ["access-toto", "action-events.get"],
        ["access-titi", "action-events.create"],
        ["access-titi", "action-events.get"],
    ] {
        core.audit
            .record_event(&tenant("u1"), NewAuditEvent::new("log/test", "u1").with_stream_ids(tags))
            .await
            .unwrap();
    }

    assert_eq!(
        core.audit.get_all_actions(&tenant("u1")).await.unwrap(),
        set(&["events.get", "events.create"])
    );
    assert_eq!(
        core.audit.get_all_accesses(&tenant("u1")).await.unwrap(),
        set(&["toto", "titi"])
    );
}

#[tokio::test]
async fn test_appends_never_leak_across_tenants() {
    let core = build(&StorageBackend::InMemory);
    provision(&core, &["u1", "u2"]).await;

    core.audit
        .record_event(
            &tenant("u1"),
            NewAuditEvent::new("log/test", "u1")
                .with_stream_ids(["action-secret.read", "access-root"])
                .with_content(json!({ "path": "/etc/shadow" })),
        )
        .await
        .unwrap();

    assert!(core.audit.get_events(&tenant("u2"), &EventQuery::all()).await.unwrap().is_empty());
    assert!(core.audit.get_all_actions(&tenant("u2")).await.unwrap().is_empty());
    assert!(core.audit.get_all_accesses(&tenant("u2")).await.unwrap().is_empty());
    assert_eq!(core.audit.get_events(&tenant("u1"), &EventQuery::all()).await.unwrap().len(), 1);

    core.audit.run_integrity_check().await.unwrap().ensure_clean().unwrap();
}

#[tokio::test]
async fn test_conjunctive_query_preserves_append_order() {
    let core = build(&StorageBackend::InMemory);
    provision(&core, &["u1"]).await;

    let rows = [
        ("log/test", json!({ "action": "a", "n": 0 })),
        ("log/other", json!({ "action": "a", "n": 1 })),
        ("log/test", json!({ "action": "b", "n": 2 })),
        ("log/test", json!({ "action": "a", "n": 3 })),
    ];
    for (event_type, content) in rows {
        core.audit
            .record_event(&tenant("u1"), NewAuditEvent::new(event_type, "u1").with_content(content))
            .await
            .unwrap();
    }

    let found = core
        .audit
        .get_events(
            &tenant("u1"),
            &EventQuery::all().field("type", "log/test").field("action", "a"),
        )
        .await
        .unwrap();
    let ns: Vec<_> = found.iter().map(|e| e.content["n"].as_i64().unwrap()).collect();
    assert_eq!(ns, vec![0, 3]);

    let all = core.audit.get_events(&tenant("u1"), &EventQuery::all()).await.unwrap();
    assert_eq!(all.len(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_tenants_stay_isolated() {
    let core = Arc::new(build(&StorageBackend::InMemory));
    let ids = ["t0", "t1", "t2", "t3"];
    provision(&core, &ids).await;

    let mut handles = Vec::new();
    for id in ids {
        let core = core.clone();
        let id = id.to_string();
        handles.push(tokio::spawn(async move {
            for n in 0..10 {
                core.audit
                    .record_event(
                        &tenant(&id),
                        NewAuditEvent::new("log/test", id.as_str())
                            .with_stream_ids([format!("action-{}.{}", id, n % 2)]),
                    )
                    .await
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    for id in ids {
        let events = core.audit.get_events(&tenant(id), &EventQuery::all()).await.unwrap();
        assert_eq!(events.len(), 10);
        assert!(events.iter().all(|e| e.created_by == id));
        let expected: BTreeSet<String> = [format!("{}.0", id), format!("{}.1", id)].into();
        assert_eq!(core.audit.get_all_actions(&tenant(id)).await.unwrap(), expected);
    }
}

#[tokio::test]
async fn test_derived_sets_do_not_depend_on_append_order() {
    let core = build(&StorageBackend::InMemory);
    provision(&core, &["forward", "reverse"]).await;

    let tags: [&[&str]; 4] = [
        &["action-events.get", "access-toto"],
        &["action-events.create", "access-titi"],
        &["action-events.get", "access-titi"],
        &["access-tata"],
    ];
    for (id, order) in [("forward", [0, 1, 2, 3]), ("reverse", [3, 2, 1, 0])] {
        for i in order {
            core.audit
                .record_event(
                    &tenant(id),
                    NewAuditEvent::new("log/test", id).with_stream_ids(tags[i].iter().copied()),
                )
                .await
                .unwrap();
        }
    }

    let actions = core.audit.get_all_actions(&tenant("forward")).await.unwrap();
    assert_eq!(actions, set(&["events.get", "events.create"]));
    assert_eq!(core.audit.get_all_actions(&tenant("reverse")).await.unwrap(), actions);

    let accesses = core.audit.get_all_accesses(&tenant("forward")).await.unwrap();
    assert_eq!(accesses, set(&["toto", "titi", "tata"]));
    assert_eq!(core.audit.get_all_accesses(&tenant("reverse")).await.unwrap(), accesses);
}

#[tokio::test]
async fn test_sled_backend_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let backend = StorageBackend::Sled(SledConfig {
        path: dir.path().join("audit-db"),
    });

    {
        let core = build(&backend);
        provision(&core, &["u1"]).await;
        core.audit
            .record_event(
                &tenant("u1"),
                NewAuditEvent::new("log/test", "u1").with_stream_ids(["action-login", "access-web"]),
            )
            .await
            .unwrap();
        core.audit.shutdown().await.unwrap();
    }

    let core = build(&backend);
    core.audit.run_integrity_check().await.unwrap().ensure_clean().unwrap();
    assert_eq!(core.audit.get_all_actions(&tenant("u1")).await.unwrap(), set(&["login"]));
    assert_eq!(core.audit.get_all_accesses(&tenant("u1")).await.unwrap(), set(&["web"]));
    assert_eq!(core.audit.get_events(&tenant("u1"), &EventQuery::all()).await.unwrap().len(), 1);
}
