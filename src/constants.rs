// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the Horreum operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group of the `Horreum` CRD
pub const API_GROUP: &str = "hyperfoil.io";

/// API version of the `Horreum` CRD
pub const API_VERSION: &str = "v1alpha1";

/// Fully qualified API version (group/version)
pub const API_GROUP_VERSION: &str = "hyperfoil.io/v1alpha1";

/// Kind name for `Horreum` resource
pub const KIND_HORREUM: &str = "Horreum";

/// API group serving OpenShift routes
pub const ROUTE_API_GROUP: &str = "route.openshift.io";

/// Field manager used for status patches
pub const FIELD_MANAGER: &str = "horreum-operator";

// ============================================================================
// Role Suffixes
// ============================================================================

/// Suffix of the Horreum application pod
pub const SUFFIX_APP: &str = "-app";

/// Suffix of the Keycloak pod, service and route
pub const SUFFIX_KEYCLOAK: &str = "-keycloak";

/// Suffix of the PostgreSQL pod and service
pub const SUFFIX_DB: &str = "-db";

/// Suffix of the Grafana pod, service and route
pub const SUFFIX_GRAFANA: &str = "-grafana";

/// Suffix of the report pod, service and route
pub const SUFFIX_REPORT: &str = "-report";

// ============================================================================
// Default Images
// ============================================================================

/// Default Horreum application image
pub const DEFAULT_APP_IMAGE: &str = "quay.io/hyperfoil/horreum:latest";

/// Default Keycloak image (pre-configured with the Horreum realm)
pub const DEFAULT_KEYCLOAK_IMAGE: &str = "quay.io/hyperfoil/horreum-keycloak:latest";

/// Default upstream PostgreSQL image
pub const DEFAULT_POSTGRES_IMAGE: &str = "docker.io/library/postgres:14.4";

/// PostgreSQL image used when Red Hat images are selected
pub const REDHAT_POSTGRES_IMAGE: &str = "registry.redhat.io/rhel8/postgresql-12:latest";

/// Default Grafana image
pub const DEFAULT_GRAFANA_IMAGE: &str = "docker.io/grafana/grafana:latest";

/// Default Hyperfoil report image
pub const DEFAULT_REPORT_IMAGE: &str = "quay.io/hyperfoil/hyperfoil-report:latest";

// ============================================================================
// Database Constants
// ============================================================================

/// Default PostgreSQL port
pub const DEFAULT_DB_PORT: i32 = 5432;

/// Default name of the Horreum database
pub const DEFAULT_APP_DB_NAME: &str = "horreum";

/// Default name of the Keycloak database
pub const DEFAULT_KEYCLOAK_DB_NAME: &str = "keycloak";

/// UID the Red Hat PostgreSQL image runs as
pub const REDHAT_POSTGRES_UID: i64 = 26;

/// UID the upstream PostgreSQL image runs as
pub const UPSTREAM_POSTGRES_UID: i64 = 999;

// ============================================================================
// Network Constants
// ============================================================================

/// Horreum plain HTTP container port
pub const APP_HTTP_PORT: i32 = 8080;

/// Horreum HTTPS container port
pub const APP_HTTPS_PORT: i32 = 8443;

/// Keycloak HTTPS container port
pub const KEYCLOAK_HTTPS_PORT: i32 = 8443;

/// Grafana container port
pub const GRAFANA_PORT: i32 = 3000;

/// Report server container port
pub const REPORT_PORT: i32 = 8080;

/// Service port for plain HTTP
pub const SERVICE_HTTP_PORT: i32 = 80;

/// Service port for HTTPS
pub const SERVICE_HTTPS_PORT: i32 = 443;

// ============================================================================
// Secret Constants
// ============================================================================

/// Key holding the user name in basic-auth secrets
pub const SECRET_USERNAME_KEY: &str = "username";

/// Key holding the password in basic-auth secrets
pub const SECRET_PASSWORD_KEY: &str = "password";

/// Key holding the database signing secret in the app secret
pub const SECRET_DB_SECRET_KEY: &str = "dbsecret";

/// Key holding the certificate in TLS secrets
pub const TLS_CERT_KEY: &str = "tls.crt";

/// Key holding the private key in TLS secrets
pub const TLS_PRIVATE_KEY_KEY: &str = "tls.key";

/// Key holding the CA certificate in TLS secrets
pub const TLS_CA_CERT_KEY: &str = "ca.crt";

/// Type of generated credential secrets
pub const SECRET_TYPE_BASIC_AUTH: &str = "kubernetes.io/basic-auth";

/// Length of generated passwords
pub const GENERATED_PASSWORD_LENGTH: usize = 16;

/// Name of the config map the platform injects the service CA bundle into
pub const SERVICE_CA_CONFIGMAP: &str = "service-ca.crt";

/// Annotation asking the platform to inject the service CA bundle
pub const INJECT_CABUNDLE_ANNOTATION: &str = "service.beta.openshift.io/inject-cabundle";

/// Annotation asking the platform to issue a serving certificate for a service
pub const SERVING_CERT_ANNOTATION: &str = "service.beta.openshift.io/serving-cert-secret-name";

/// Annotation on the `Horreum` resource carrying extra JVM options for the app
pub const JAVA_OPTIONS_ANNOTATION: &str = "java-options";

// ============================================================================
// Service Types
// ============================================================================

/// `ClusterIP` service type
pub const SERVICE_TYPE_CLUSTER_IP: &str = "ClusterIP";

/// `NodePort` service type
pub const SERVICE_TYPE_NODE_PORT: &str = "NodePort";

/// `LoadBalancer` service type
pub const SERVICE_TYPE_LOAD_BALANCER: &str = "LoadBalancer";

// ============================================================================
// Controller Requeue Constants
// ============================================================================

/// Requeue duration for controller errors (30 seconds)
pub const ERROR_REQUEUE_DURATION_SECS: u64 = 30;

/// Requeue duration while waiting for asynchronous progress (10 seconds)
pub const PENDING_REQUEUE_DURATION_SECS: u64 = 10;

/// Requeue duration once everything is ready (5 minutes)
pub const READY_REQUEUE_DURATION_SECS: u64 = 300;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Port for Prometheus metrics HTTP server
pub const METRICS_SERVER_PORT: u16 = 8080;

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Bind address for metrics HTTP server
pub const METRICS_SERVER_BIND_ADDRESS: &str = "0.0.0.0";
