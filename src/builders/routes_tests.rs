// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `routes.rs`

#[cfg(test)]
mod tests {
    use crate::builders::routes::*;
    use crate::builders::Platform;
    use crate::crd::{HorreumSpec, RouteSpec};
    use crate::reconcilers::fake_cluster::horreum;
    use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

    fn spec_of(route_type: &str) -> RouteSpec {
        RouteSpec {
            r#type: Some(route_type.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_route_types() {
        assert_eq!(RouteType::parse(&RouteSpec::default()).unwrap(), RouteType::Reencrypt);
        assert_eq!(RouteType::parse(&spec_of("")).unwrap(), RouteType::Reencrypt);
        assert_eq!(RouteType::parse(&spec_of("http")).unwrap(), RouteType::Http);
        assert_eq!(RouteType::parse(&spec_of("edge")).unwrap(), RouteType::Edge);
        assert_eq!(
            RouteType::parse(&spec_of("passthrough")).unwrap(),
            RouteType::Passthrough
        );
        assert_eq!(
            RouteType::parse_or(&RouteSpec::default(), RouteType::Edge).unwrap(),
            RouteType::Edge
        );
    }

    #[test]
    fn test_unknown_route_type_is_configuration_error() {
        let err = RouteType::parse(&spec_of("tunnel")).unwrap_err();

        assert!(err.is_configuration());
        assert_eq!(err.to_string(), "Invalid route type: tunnel");
    }

    #[test]
    fn test_scheme_follows_pod_protocol() {
        assert_eq!(RouteType::Http.scheme(), "http");
        assert_eq!(RouteType::Edge.scheme(), "http");
        assert_eq!(RouteType::Reencrypt.scheme(), "https");
        assert_eq!(RouteType::Passthrough.scheme(), "https");
        assert_eq!(RouteType::Edge.inner_protocol(), "http://");
        assert!(RouteType::Reencrypt.terminates_at_router());
        assert!(!RouteType::Passthrough.terminates_at_router());
    }

    #[test]
    fn test_http_route_has_no_tls() {
        assert!(route_tls(RouteType::Http, None).is_none());
    }

    #[test]
    fn test_passthrough_never_carries_certificates() {
        let material = TlsMaterial {
            certificate: Some("CERT".to_string()),
            key: Some("KEY".to_string()),
            ca_certificate: None,
        };
        let tls = route_tls(RouteType::Passthrough, Some(&material)).unwrap();

        assert_eq!(tls.termination, "passthrough");
        assert!(tls.certificate.is_none());
        assert!(tls.key.is_none());
    }

    #[test]
    fn test_edge_route_carries_material() {
        let material = TlsMaterial {
            certificate: Some("CERT".to_string()),
            key: Some("KEY".to_string()),
            ca_certificate: Some("CA".to_string()),
        };
        let tls = route_tls(RouteType::Edge, Some(&material)).unwrap();

        assert_eq!(tls.termination, "edge");
        assert_eq!(tls.insecure_edge_termination_policy.as_deref(), Some("Redirect"));
        assert_eq!(tls.certificate.as_deref(), Some("CERT"));
        assert_eq!(tls.key.as_deref(), Some("KEY"));
        assert_eq!(tls.ca_certificate.as_deref(), Some("CA"));
    }

    #[test]
    fn test_route_without_host_requests_subdomain() {
        let hr = horreum("demo", HorreumSpec::default());
        let route = route(&hr, &RouteSpec::default(), RouteType::Reencrypt, "-keycloak", "keycloak", None);

        assert_eq!(route.metadata.name.as_deref(), Some("demo-keycloak"));
        assert_eq!(route.metadata.namespace.as_deref(), Some("perf"));
        assert!(route.spec.host.is_none());
        assert_eq!(route.spec.subdomain.as_deref(), Some("demo-keycloak"));
        assert_eq!(route.spec.to.kind, "Service");
        assert_eq!(route.spec.to.name, "demo-keycloak");
    }

    #[test]
    fn test_route_with_host_has_no_subdomain() {
        let hr = horreum("demo", HorreumSpec::default());
        let spec = RouteSpec {
            host: Some("horreum.example.com".to_string()),
            ..Default::default()
        };
        let route = route(&hr, &spec, RouteType::Edge, "", "app", None);

        assert_eq!(route.metadata.name.as_deref(), Some("demo"));
        assert_eq!(route.spec.host.as_deref(), Some("horreum.example.com"));
        assert!(route.spec.subdomain.is_none());
    }

    #[test]
    fn test_service_type_defaults() {
        let openshift = Platform {
            routes_available: true,
            ..Default::default()
        };

        assert_eq!(service_type(None, openshift), "ClusterIP");
        assert_eq!(service_type(Some(""), Platform::default()), "NodePort");
        assert_eq!(service_type(Some("LoadBalancer"), openshift), "LoadBalancer");
        assert!(is_node_port(None, Platform::default()));
        assert!(!is_node_port(None, openshift));
    }

    #[test]
    fn test_service_port_follows_route_type() {
        let plain = service_port(RouteType::Edge, 8080, 8443);
        assert_eq!(plain.port, 80);
        assert_eq!(plain.target_port, Some(IntOrString::Int(8080)));

        let tls = service_port(RouteType::Reencrypt, 8080, 8443);
        assert_eq!(tls.port, 443);
        assert_eq!(tls.name.as_deref(), Some("https"));
        assert_eq!(tls.target_port, Some(IntOrString::Int(8443)));
    }
}
