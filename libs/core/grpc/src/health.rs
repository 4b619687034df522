//! Standard gRPC health service (`grpc.health.v1.Health`).
//!
//! The empty service name is what Kubernetes and most load balancers query,
//! so it is marked `SERVING` as soon as the service is created.

use tonic_health::ServingStatus;
use tonic_health::pb::health_server::{Health, HealthServer};
use tonic_health::server::HealthReporter;
use tracing::info;

/// Health reporter plus the names of the services registered alongside it.
#[derive(Clone)]
pub struct HealthRegistry {
    reporter: HealthReporter,
    services: Vec<String>,
}

impl HealthRegistry {
    /// Create the health service with `""` reporting `SERVING`.
    pub async fn new() -> (Self, HealthServer<impl Health>) {
        let (reporter, service) = tonic_health::server::health_reporter();
        reporter.set_service_status("", ServingStatus::Serving).await;

        let registry = Self {
            reporter,
            services: Vec::new(),
        };
        (registry, service)
    }

    /// Remember a registered service so its status follows the server lifecycle.
    pub fn track(&mut self, service_name: &str) {
        if !self.services.iter().any(|s| s == service_name) {
            self.services.push(service_name.to_string());
        }
    }

    /// Names of the tracked services, in registration order.
    pub fn services(&self) -> &[String] {
        &self.services
    }

    /// The underlying reporter, for callers that manage extra statuses.
    pub fn reporter(&self) -> &HealthReporter {
        &self.reporter
    }

    pub async fn mark_serving(&self, service_name: &str) {
        self.reporter
            .set_service_status(service_name, ServingStatus::Serving)
            .await;
    }

    /// Mark every tracked service and the empty name as serving.
    pub async fn mark_all_serving(&self) {
        for service_name in &self.services {
            self.mark_serving(service_name).await;
        }
        self.mark_serving("").await;

        info!(services = ?self.services, "Services marked as serving");
    }

    /// Mark every tracked service and the empty name as not serving.
    pub async fn mark_all_not_serving(&self) {
        for service_name in &self.services {
            self.reporter
                .set_service_status(service_name, ServingStatus::NotServing)
                .await;
        }
        self.reporter
            .set_service_status("", ServingStatus::NotServing)
            .await;

        info!(services = ?self.services, "Services marked as not serving");
    }
}
