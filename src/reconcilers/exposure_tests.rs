// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `exposure.rs`

#[cfg(test)]
mod tests {
    use crate::builders::routes::{route_tls, RouteType};
    use crate::reconcilers::exposure::*;
    use crate::route::{OpenShiftRouteSpec, OpenShiftRouteStatus, Route, RouteIngress};
    use k8s_openapi::api::core::v1::{
        LoadBalancerIngress, LoadBalancerStatus, PortStatus, Service, ServicePort, ServiceSpec,
        ServiceStatus,
    };

    fn node_port_service(node_port: Option<i32>) -> Service {
        Service {
            spec: Some(ServiceSpec {
                type_: Some("NodePort".to_string()),
                ports: Some(vec![ServicePort {
                    port: 443,
                    node_port,
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn with_ingress(mut service: Service, ingress: LoadBalancerIngress) -> Service {
        service.status = Some(ServiceStatus {
            load_balancer: Some(LoadBalancerStatus {
                ingress: Some(vec![ingress]),
            }),
            ..Default::default()
        });
        service
    }

    #[test]
    fn test_component_display() {
        assert_eq!(Component::App.to_string(), "Horreum");
        assert_eq!(Component::Keycloak.to_string(), "Keycloak");
        assert_eq!(Component::Grafana.to_string(), "Grafana");
        assert_eq!(Component::Report.to_string(), "Report");
    }

    #[test]
    fn test_node_port_url() {
        let service = node_port_service(Some(31443));
        assert_eq!(
            node_port_url("https", "node1.example.com", &service).as_deref(),
            Some("https://node1.example.com:31443")
        );
    }

    #[test]
    fn test_unassigned_node_port() {
        assert!(node_port(&node_port_service(None)).is_none());
        assert!(node_port(&node_port_service(Some(0))).is_none());
        assert!(node_port(&Service::default()).is_none());
    }

    #[test]
    fn test_load_balancer_prefers_hostname_and_ingress_port() {
        let service = with_ingress(
            node_port_service(Some(31443)),
            LoadBalancerIngress {
                hostname: Some("lb.example.com".to_string()),
                ip: Some("192.0.2.10".to_string()),
                ports: Some(vec![PortStatus {
                    port: 443,
                    protocol: "TCP".to_string(),
                    error: None,
                }]),
                ..Default::default()
            },
        );
        assert_eq!(
            load_balancer_url("https", &service).as_deref(),
            Some("https://lb.example.com:443")
        );
    }

    #[test]
    fn test_load_balancer_falls_back_to_ip_and_node_port() {
        let service = with_ingress(
            node_port_service(Some(31443)),
            LoadBalancerIngress {
                hostname: Some(String::new()),
                ip: Some("192.0.2.10".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(
            load_balancer_url("http", &service).as_deref(),
            Some("http://192.0.2.10:31443")
        );
    }

    #[test]
    fn test_load_balancer_without_ingress() {
        assert!(load_balancer_url("https", &node_port_service(Some(31443))).is_none());
        let no_address = with_ingress(node_port_service(Some(31443)), LoadBalancerIngress::default());
        assert!(load_balancer_url("https", &no_address).is_none());
    }

    fn admitted_route(host: Option<&str>, route_type: RouteType) -> Route {
        let mut route = Route::new(
            "demo",
            OpenShiftRouteSpec {
                tls: route_tls(route_type, None),
                ..Default::default()
            },
        );
        route.status = Some(OpenShiftRouteStatus {
            ingress: vec![RouteIngress {
                host: host.map(str::to_string),
                ..Default::default()
            }],
        });
        route
    }

    #[test]
    fn test_route_url_scheme_follows_tls() {
        assert_eq!(
            route_url(&admitted_route(Some("demo.apps.example.com"), RouteType::Reencrypt))
                .as_deref(),
            Some("https://demo.apps.example.com")
        );
        assert_eq!(
            route_url(&admitted_route(Some("demo.apps.example.com"), RouteType::Http)).as_deref(),
            Some("http://demo.apps.example.com")
        );
    }

    #[test]
    fn test_route_without_host() {
        assert!(route_url(&admitted_route(None, RouteType::Edge)).is_none());
        assert!(route_url(&Route::new("demo", OpenShiftRouteSpec::default())).is_none());
    }
}
