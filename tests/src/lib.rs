//! Shared fixtures for the end-to-end scenarios

use async_trait::async_trait;
use mosaic_core::{ModuleWizard, MosaicConfig, ProviderError, WorkflowSession};
use mosaic_wizards::catalog::{build_session, Providers};
use mosaic_wizards::providers::{ScoringProvider, ScoringReport, ScoringRequest};
use mosaic_wizards::testing::{fake_providers, FakeScoringProvider};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Notify;

/// Session over the default catalog with fake providers
pub fn session() -> WorkflowSession {
    session_with(fake_providers())
}

/// Session over the default catalog with the given providers
pub fn session_with(providers: Providers) -> WorkflowSession {
    mosaic_monitoring::init_test_tracing();
    let config = MosaicConfig {
        stage_timeout_ms: 2_000,
        ..MosaicConfig::default()
    };
    match build_session(providers, &config) {
        Ok(session) => session,
        Err(e) => panic!("default catalog must build: {}", e),
    }
}

/// Set every value on the wizard
pub fn fill(wizard: &mut ModuleWizard, values: &[(&str, Value)]) {
    for (name, value) in values {
        wizard.set_field(*name, value.clone());
    }
}

/// Valid data for all six contract steps
pub fn contract_values() -> Vec<(&'static str, Value)> {
    vec![
        ("propertyAddress", json!("Москва, ул. Тверская, 7, кв. 12")),
        ("propertyType", json!("apartment")),
        ("propertyRent", json!(65000)),
        ("landlordName", json!("Сидоров Сергей Петрович")),
        ("landlordPassport", json!("4501 234567")),
        ("tenantName", json!("Иванов Иван Иванович")),
        ("tenantPassport", json!("4502 345678")),
        ("tenantPhone", json!("+7 900 123-45-67")),
        ("startDate", json!("2024-02-01")),
        ("endDate", json!("2025-01-31")),
        ("monthlyRent", json!(65000)),
        ("deposit", json!(65000)),
        ("paymentDay", json!(5)),
        ("utilitiesIncluded", json!(true)),
        ("agreement", json!(true)),
    ]
}

/// Signature wizard data for a contract
pub fn signature_values(document_id: &str) -> Vec<(&'static str, Value)> {
    vec![
        ("documentId", json!(document_id)),
        ("documentTitle", json!("Договор аренды жилого помещения")),
        ("signerId", json!("tenant-1")),
        ("signerName", json!("Иванов Иван Иванович")),
        ("channel", json!("sms")),
    ]
}

/// Scoring provider that answers only once released
pub struct GatedScoringProvider {
    release: Arc<Notify>,
    inner: FakeScoringProvider,
}

impl GatedScoringProvider {
    /// Create the provider and the handle that releases it
    pub fn new() -> (Self, Arc<Notify>) {
        let release = Arc::new(Notify::new());
        (
            Self {
                release: release.clone(),
                inner: FakeScoringProvider::new(),
            },
            release,
        )
    }
}

#[async_trait]
impl ScoringProvider for GatedScoringProvider {
    async fn score_person(&self, request: &ScoringRequest) -> Result<ScoringReport, ProviderError> {
        self.release.notified().await;
        self.inner.score_person(request).await
    }
}
