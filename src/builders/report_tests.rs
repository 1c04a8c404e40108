// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `report.rs`

#[cfg(test)]
mod tests {
    use crate::builders::report::*;
    use crate::builders::routes::RouteType;
    use crate::builders::Platform;
    use crate::crd::HorreumSpec;
    use crate::reconcilers::fake_cluster::horreum;

    #[test]
    fn test_route_type_rules() {
        let hr = horreum("demo", HorreumSpec::default());
        assert_eq!(route_type(&hr).unwrap(), RouteType::Edge);

        let mut spec = HorreumSpec::default();
        spec.report.route.r#type = Some("reencrypt".to_string());
        assert!(route_type(&horreum("demo", spec)).unwrap_err().is_configuration());
    }

    #[test]
    fn test_pod_keeps_reports_on_claim() {
        let mut spec = HorreumSpec::default();
        spec.report.persistent_volume_claim = Some("reports".to_string());
        let report_pod = pod(&horreum("demo", spec));
        let pod_spec = report_pod.spec.unwrap();

        assert_eq!(report_pod.metadata.name.as_deref(), Some("demo-report"));
        assert_eq!(
            pod_spec.volumes.unwrap()[0]
                .persistent_volume_claim
                .as_ref()
                .map(|c| c.claim_name.as_str()),
            Some("reports")
        );
    }

    #[test]
    fn test_service_uses_requested_type() {
        let mut spec = HorreumSpec::default();
        spec.report.service_type = Some("LoadBalancer".to_string());
        let report_service = service(&horreum("demo", spec), Platform::default());

        assert_eq!(
            report_service.spec.unwrap().type_.as_deref(),
            Some("LoadBalancer")
        );
    }
}
