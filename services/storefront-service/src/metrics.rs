use anyhow::Result;
use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct ApiMetrics {
    registry: Registry,
    login_attempts: IntCounterVec,
    registrations: IntCounterVec,
    product_mutations: IntCounterVec,
}

impl ApiMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let login_attempts = IntCounterVec::new(
            Opts::new(
                "storefront_login_attempts_total",
                "Count of login attempts grouped by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(login_attempts.clone()))?;

        let registrations = IntCounterVec::new(
            Opts::new(
                "storefront_registrations_total",
                "Count of account registrations grouped by role",
            ),
            &["role"],
        )?;
        registry.register(Box::new(registrations.clone()))?;

        let product_mutations = IntCounterVec::new(
            Opts::new(
                "storefront_product_mutations_total",
                "Count of catalog writes grouped by operation",
            ),
            &["op"],
        )?;
        registry.register(Box::new(product_mutations.clone()))?;

        Ok(Self {
            registry,
            login_attempts,
            registrations,
            product_mutations,
        })
    }

    pub fn login_attempt(&self, outcome: &str) {
        self.login_attempts.with_label_values(&[outcome]).inc();
    }

    pub fn registration(&self, role: &str) {
        self.registrations.with_label_values(&[role]).inc();
    }

    pub fn product_mutation(&self, op: &str) {
        self.product_mutations.with_label_values(&[op]).inc();
    }

    pub fn render(&self) -> Result<Response> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        let response = Response::builder()
            .status(StatusCode::OK)
            .header(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; version=0.0.4"),
            )
            .body(Body::from(buffer))?;
        Ok(response)
    }
}
