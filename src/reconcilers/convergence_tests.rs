// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the convergence engine, driven against the in-memory cluster.

#[cfg(test)]
mod tests {
    use crate::builders::routes::RouteType;
    use crate::builders::{app, keycloak, secrets, Platform};
    use crate::credentials::PasswordGenerator;
    use crate::crd::{Horreum, HorreumPhase, HorreumSpec};
    use crate::errors::{ClusterAction, ClusterError, ReconcileError};
    use crate::reconcilers::convergence::{secret_value, Convergence};
    use crate::reconcilers::exposure::Component;
    use crate::reconcilers::fake_cluster::{horreum, Call, FakeCluster, Op};
    use crate::reconcilers::managed::{Desired, ManagedResource, ResourceKind};
    use k8s_openapi::api::core::v1::{ConfigMap, Secret};
    use k8s_openapi::ByteString;
    use std::collections::BTreeMap;

    fn demo() -> Horreum {
        horreum("demo", HorreumSpec::default())
    }

    fn upload(hr: &Horreum) -> Desired {
        Desired::compared(ManagedResource::ConfigMap(app::upload_config_map(
            hr,
            RouteType::Reencrypt,
        )))
    }

    fn config_map_data(resource: Option<ManagedResource>) -> BTreeMap<String, String> {
        match resource {
            Some(ManagedResource::ConfigMap(ConfigMap { data: Some(data), .. })) => data,
            other => panic!("expected a config map with data, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_resource_is_created() {
        let fake = FakeCluster::new();
        let passwords = PasswordGenerator::seeded(1);
        let hr = demo();
        let mut engine = Convergence::new(&fake, &passwords, &hr, "demo-admin");

        let observed = engine.ensure_same(upload(&hr)).await.unwrap();

        assert!(observed.is_none());
        assert_eq!(
            fake.creates(),
            vec![(ResourceKind::ConfigMap, "demo-hyperfoil-upload".to_string())]
        );
        assert_eq!(engine.status.phase(), HorreumPhase::Pending);
        assert_eq!(
            engine.status.reason(),
            "Creating ConfigMap demo-hyperfoil-upload"
        );

        let stored = fake
            .object(ResourceKind::ConfigMap, "demo-hyperfoil-upload")
            .unwrap();
        let owner = &stored.meta().owner_references.as_ref().unwrap()[0];
        assert_eq!(owner.name, "demo");
        assert_eq!(owner.uid, "uid-demo");
    }

    #[tokio::test]
    async fn test_matching_resource_is_left_alone() {
        let fake = FakeCluster::new();
        let passwords = PasswordGenerator::seeded(1);
        let hr = demo();
        let mut first = Convergence::new(&fake, &passwords, &hr, "demo-admin");
        first.ensure_same(upload(&hr)).await.unwrap();
        fake.clear_calls();

        let mut engine = Convergence::new(&fake, &passwords, &hr, "demo-admin");
        let observed = engine.ensure_same(upload(&hr)).await.unwrap();

        assert!(observed.is_some());
        assert_eq!(
            fake.calls(),
            vec![Call::Get(
                ResourceKind::ConfigMap,
                "demo-hyperfoil-upload".to_string()
            )]
        );
        assert_eq!(engine.status.phase(), HorreumPhase::Ready);
    }

    #[tokio::test]
    async fn test_drifted_resource_is_recreated() {
        let fake = FakeCluster::new();
        let passwords = PasswordGenerator::seeded(1);
        let hr = demo();
        Convergence::new(&fake, &passwords, &hr, "demo-admin")
            .ensure_same(upload(&hr))
            .await
            .unwrap();
        fake.update(ResourceKind::ConfigMap, "demo-hyperfoil-upload", |resource| {
            if let ManagedResource::ConfigMap(cm) = resource {
                cm.data = Some(BTreeMap::from([(
                    "50-upload-to-horreum".to_string(),
                    "echo edited".to_string(),
                )]));
            }
        });
        fake.clear_calls();

        let mut engine = Convergence::new(&fake, &passwords, &hr, "demo-admin");
        let observed = engine.ensure_same(upload(&hr)).await.unwrap();

        assert!(observed.is_none());
        assert_eq!(
            fake.deletes(),
            vec![(ResourceKind::ConfigMap, "demo-hyperfoil-upload".to_string())]
        );
        assert_eq!(fake.creates().len(), 1);
        assert_eq!(
            engine.status.reason(),
            "Recreating ConfigMap demo-hyperfoil-upload"
        );
        let data = config_map_data(fake.object(ResourceKind::ConfigMap, "demo-hyperfoil-upload"));
        assert_ne!(data["50-upload-to-horreum"], "echo edited");
    }

    #[tokio::test]
    async fn test_create_only_resource_is_never_compared() {
        let fake = FakeCluster::new();
        let passwords = PasswordGenerator::seeded(1);
        let hr = demo();
        let desired = || {
            Desired::create_only(ManagedResource::ConfigMap(app::service_ca_config_map(
                &hr, None,
            )))
        };
        Convergence::new(&fake, &passwords, &hr, "demo-admin")
            .ensure_same(desired())
            .await
            .unwrap();
        // The platform injects the bundle after creation.
        fake.update(ResourceKind::ConfigMap, "service-ca.crt", |resource| {
            if let ManagedResource::ConfigMap(cm) = resource {
                cm.data = Some(BTreeMap::from([(
                    "service-ca.crt".to_string(),
                    "INJECTED".to_string(),
                )]));
            }
        });
        fake.clear_calls();

        let mut engine = Convergence::new(&fake, &passwords, &hr, "demo-admin");
        engine.ensure_same(desired()).await.unwrap();

        assert!(fake.creates().is_empty());
        assert!(fake.deletes().is_empty());
        assert_eq!(engine.status.phase(), HorreumPhase::Ready);
    }

    #[tokio::test]
    async fn test_conflict_while_recreating_is_pending() {
        let fake = FakeCluster::new();
        let passwords = PasswordGenerator::seeded(1);
        let hr = demo();
        Convergence::new(&fake, &passwords, &hr, "demo-admin")
            .ensure_same(upload(&hr))
            .await
            .unwrap();
        fake.update(ResourceKind::ConfigMap, "demo-hyperfoil-upload", |resource| {
            if let ManagedResource::ConfigMap(cm) = resource {
                cm.data = None;
            }
        });
        fake.fail_on(
            Op::Create,
            "demo-hyperfoil-upload",
            ClusterError::Api {
                code: 409,
                message: "object is being deleted".to_string(),
            },
        );

        let mut engine = Convergence::new(&fake, &passwords, &hr, "demo-admin");
        let observed = engine.ensure_same(upload(&hr)).await.unwrap();

        assert!(observed.is_none());
        assert_eq!(engine.status.phase(), HorreumPhase::Pending);
        assert_eq!(
            engine.status.reason(),
            "Recreating ConfigMap demo-hyperfoil-upload"
        );
    }

    #[tokio::test]
    async fn test_get_failure_aborts() {
        let fake = FakeCluster::new();
        let passwords = PasswordGenerator::seeded(1);
        let hr = demo();
        fake.fail_on(
            Op::Get,
            "demo-hyperfoil-upload",
            ClusterError::Api {
                code: 500,
                message: "etcd unavailable".to_string(),
            },
        );

        let mut engine = Convergence::new(&fake, &passwords, &hr, "demo-admin");
        let error = engine.ensure_same(upload(&hr)).await.unwrap_err();

        assert!(matches!(
            error,
            ReconcileError::Cluster {
                action: ClusterAction::Find,
                kind: ResourceKind::ConfigMap,
                ..
            }
        ));
        assert!(fake.creates().is_empty());
    }

    #[tokio::test]
    async fn test_generated_passwords_are_filled_on_create() {
        let fake = FakeCluster::new();
        let passwords = PasswordGenerator::seeded(7);
        let hr = demo();
        let mut engine = Convergence::new(&fake, &passwords, &hr, "demo-admin");

        engine
            .ensure_same(secrets::app_user_secret(&hr, "demo-app", "app"))
            .await
            .unwrap();

        let Some(ManagedResource::Secret(secret)) = fake.object(ResourceKind::Secret, "demo-app")
        else {
            panic!("secret was not created");
        };
        assert_eq!(secret_value(&secret, "username").as_deref(), Some("demo-app"));
        let password = secret_value(&secret, "password").unwrap();
        let db_secret = secret_value(&secret, "dbsecret").unwrap();
        assert_eq!(password.len(), 16);
        assert_eq!(db_secret.len(), 16);
        assert_ne!(password, db_secret);
    }

    #[tokio::test]
    async fn test_existing_secret_keeps_its_password() {
        let fake = FakeCluster::new();
        let passwords = PasswordGenerator::seeded(7);
        let hr = demo();
        let desired = || secrets::credential_secret(&hr, "demo-admin", "app");
        Convergence::new(&fake, &passwords, &hr, "demo-admin")
            .ensure_same(desired())
            .await
            .unwrap();
        let before = match fake.object(ResourceKind::Secret, "demo-admin") {
            Some(ManagedResource::Secret(s)) => secret_value(&s, "password"),
            _ => None,
        };

        let mut engine = Convergence::new(&fake, &passwords, &hr, "demo-admin");
        engine.ensure_same(desired()).await.unwrap();

        let after = match fake.object(ResourceKind::Secret, "demo-admin") {
            Some(ManagedResource::Secret(s)) => secret_value(&s, "password"),
            _ => None,
        };
        assert!(before.is_some());
        assert_eq!(before, after);
        assert_eq!(engine.status.phase(), HorreumPhase::Ready);
    }

    #[tokio::test]
    async fn test_secret_missing_password_is_error() {
        let fake = FakeCluster::new();
        let passwords = PasswordGenerator::seeded(7);
        let hr = demo();
        fake.insert(ManagedResource::Secret(Secret {
            metadata: kube::api::ObjectMeta {
                name: Some("demo-admin".to_string()),
                namespace: Some("perf".to_string()),
                ..Default::default()
            },
            data: Some(BTreeMap::from([(
                "username".to_string(),
                ByteString(b"demo-admin".to_vec()),
            )])),
            ..Default::default()
        }));

        let mut engine = Convergence::new(&fake, &passwords, &hr, "demo-admin");
        engine
            .ensure_same(secrets::credential_secret(&hr, "demo-admin", "app"))
            .await
            .unwrap();

        assert_eq!(engine.status.phase(), HorreumPhase::Error);
        assert_eq!(
            engine.status.reason(),
            "Secret demo-admin missing data password"
        );
    }

    #[tokio::test]
    async fn test_ensure_deleted() {
        let fake = FakeCluster::new();
        let passwords = PasswordGenerator::seeded(1);
        let hr = demo();
        let mut engine = Convergence::new(&fake, &passwords, &hr, "demo-admin");

        engine
            .ensure_deleted(ResourceKind::Pod, "demo-grafana")
            .await
            .unwrap();
        assert!(fake.deletes().is_empty());

        engine.ensure_same(upload(&hr)).await.unwrap();
        engine
            .ensure_deleted(ResourceKind::ConfigMap, "demo-hyperfoil-upload")
            .await
            .unwrap();
        assert_eq!(
            fake.deletes(),
            vec![(ResourceKind::ConfigMap, "demo-hyperfoil-upload".to_string())]
        );
        assert!(!fake.contains(ResourceKind::ConfigMap, "demo-hyperfoil-upload"));
    }

    #[tokio::test]
    async fn test_ensure_deleted_keeps_objects_it_does_not_own() {
        let fake = FakeCluster::new();
        let passwords = PasswordGenerator::seeded(1);
        let hr = demo();
        let mut engine = Convergence::new(&fake, &passwords, &hr, "demo-admin");
        fake.insert_tls_secret("team-grafana-creds");

        engine
            .ensure_deleted(ResourceKind::Secret, "team-grafana-creds")
            .await
            .unwrap();

        assert!(fake.deletes().is_empty());
        assert!(fake.contains(ResourceKind::Secret, "team-grafana-creds"));
    }

    #[tokio::test]
    async fn test_require_secret() {
        let fake = FakeCluster::new();
        let passwords = PasswordGenerator::seeded(1);
        let hr = demo();
        let mut engine = Convergence::new(&fake, &passwords, &hr, "demo-admin");

        assert!(engine.require_secret("demo-app-certs").await.unwrap().is_none());
        assert_eq!(engine.status.reason(), "Waiting for secret demo-app-certs");

        fake.insert_tls_secret("demo-app-certs");
        assert!(engine.require_secret("demo-app-certs").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_tls_material() {
        let fake = FakeCluster::new();
        let passwords = PasswordGenerator::seeded(1);
        let hr = demo();
        let engine = Convergence::new(&fake, &passwords, &hr, "demo-admin");

        assert!(engine.tls_material(None).await.unwrap().is_none());
        assert!(engine.tls_material(Some("")).await.unwrap().is_none());

        let error = engine.tls_material(Some("horreum-tls")).await.unwrap_err();
        assert!(matches!(error, ReconcileError::MissingSecret { ref name } if name == "horreum-tls"));

        fake.insert_tls_secret("horreum-tls");
        let material = engine.tls_material(Some("horreum-tls")).await.unwrap().unwrap();
        assert_eq!(material.certificate.as_deref(), Some("CERT"));
        assert_eq!(material.key.as_deref(), Some("KEY"));
        assert_eq!(material.ca_certificate.as_deref(), Some("CA"));
    }

    #[tokio::test]
    async fn test_expose_node_port() {
        let fake = FakeCluster::new();
        let passwords = PasswordGenerator::seeded(1);
        let hr = demo();
        let mut engine = Convergence::new(&fake, &passwords, &hr, "demo-admin");

        let url = engine
            .expose(
                Component::Keycloak,
                keycloak::service(&hr, Platform::default()),
                None,
                "https",
                "node1.example.com",
            )
            .await
            .unwrap();

        assert_eq!(url.as_deref(), Some("https://node1.example.com:30001"));
        assert_eq!(
            engine.status.current().keycloak_url.as_deref(),
            Some("https://node1.example.com:30001")
        );
        assert_eq!(engine.status.reason(), "Creating Service demo-keycloak");
    }

    #[tokio::test]
    async fn test_expose_existing_service_is_read_once() {
        let fake = FakeCluster::new();
        let passwords = PasswordGenerator::seeded(1);
        let hr = demo();
        let service = || keycloak::service(&hr, Platform::default());
        let mut engine = Convergence::new(&fake, &passwords, &hr, "demo-admin");
        engine
            .expose(Component::Keycloak, service(), None, "https", "node1.example.com")
            .await
            .unwrap();
        fake.clear_calls();

        let mut engine = Convergence::new(&fake, &passwords, &hr, "demo-admin");
        let url = engine
            .expose(Component::Keycloak, service(), None, "https", "node1.example.com")
            .await
            .unwrap();

        assert_eq!(url.as_deref(), Some("https://node1.example.com:30001"));
        assert_eq!(
            fake.calls(),
            vec![Call::Get(ResourceKind::Service, "demo-keycloak".to_string())]
        );
    }

    async fn expose_app(
        engine: &mut Convergence<'_>,
        hr: &Horreum,
        platform: Platform,
    ) -> Option<String> {
        engine
            .expose(
                Component::App,
                app::service(hr, RouteType::Reencrypt, platform),
                Some(app::route(hr, RouteType::Reencrypt, None)),
                "https",
                "",
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_expose_through_route() {
        let fake = FakeCluster::new();
        let passwords = PasswordGenerator::seeded(1);
        let hr = demo();
        let openshift = Platform {
            routes_available: true,
            ..Default::default()
        };
        let mut engine = Convergence::new(&fake, &passwords, &hr, "demo-admin");
        assert!(expose_app(&mut engine, &hr, openshift).await.is_none());
        assert_eq!(engine.status.reason(), "Waiting for Horreum service URL");

        fake.admit_routes();
        let mut engine = Convergence::new(&fake, &passwords, &hr, "demo-admin");
        assert_eq!(
            expose_app(&mut engine, &hr, openshift).await.as_deref(),
            Some("https://demo.apps.example.com")
        );
        assert_eq!(engine.status.phase(), HorreumPhase::Ready);
        assert_eq!(
            engine.status.current().public_url.as_deref(),
            Some("https://demo.apps.example.com")
        );
    }

    #[tokio::test]
    async fn test_expose_load_balancer() {
        let fake = FakeCluster::new();
        let passwords = PasswordGenerator::seeded(1);
        let mut spec = HorreumSpec::default();
        spec.service_type = Some("LoadBalancer".to_string());
        let hr = horreum("demo", spec);
        let service = || app::service(&hr, RouteType::Reencrypt, Platform::default());

        let mut engine = Convergence::new(&fake, &passwords, &hr, "demo-admin");
        let url = engine
            .expose(Component::App, service(), None, "https", "")
            .await
            .unwrap();
        assert!(url.is_none());
        assert_eq!(engine.status.reason(), "Waiting for Horreum service URL");

        fake.assign_load_balancer("demo", "lb.example.com");
        let mut engine = Convergence::new(&fake, &passwords, &hr, "demo-admin");
        let url = engine
            .expose(Component::App, service(), None, "https", "")
            .await
            .unwrap();
        assert_eq!(url.as_deref(), Some("https://lb.example.com:30001"));
    }

    #[tokio::test]
    async fn test_persist_only_writes_changes() {
        let fake = FakeCluster::new();
        let passwords = PasswordGenerator::seeded(1);
        let mut hr = demo();

        let engine = Convergence::new(&fake, &passwords, &hr, "demo-admin");
        engine.persist().await.unwrap();
        assert_eq!(fake.statuses().len(), 1);
        assert_eq!(fake.calls(), vec![Call::UpdateStatus("demo".to_string())]);

        hr.status = fake.last_status();
        let engine = Convergence::new(&fake, &passwords, &hr, "demo-admin");
        engine.persist().await.unwrap();
        assert_eq!(fake.statuses().len(), 1);
    }

    #[tokio::test]
    async fn test_persist_failure() {
        let fake = FakeCluster::new();
        let passwords = PasswordGenerator::seeded(1);
        let hr = demo();
        fake.fail_on(
            Op::UpdateStatus,
            "demo",
            ClusterError::Other("connection reset".to_string()),
        );

        let engine = Convergence::new(&fake, &passwords, &hr, "demo-admin");
        let error = engine.persist().await.unwrap_err();
        assert_eq!(error.to_string(), "Cannot update status of Horreum demo");
    }

    #[test]
    fn test_secret_value_prefers_data() {
        let secret = Secret {
            data: Some(BTreeMap::from([(
                "password".to_string(),
                ByteString(b"from-data".to_vec()),
            )])),
            string_data: Some(BTreeMap::from([
                ("password".to_string(), "from-string-data".to_string()),
                ("username".to_string(), "admin".to_string()),
            ])),
            ..Default::default()
        };

        assert_eq!(secret_value(&secret, "password").as_deref(), Some("from-data"));
        assert_eq!(secret_value(&secret, "username").as_deref(), Some("admin"));
        assert!(secret_value(&secret, "missing").is_none());
    }
}
