//! Deterministic fake providers
//!
//! Stand-ins for the external services: same input, same answer. Each fake
//! can be given a latency and a forced failure so timeout, rejection and
//! cancellation paths can be driven from tests and the demo.

use crate::providers::{
    ContentOptimizer, ContractDraft, ContractProvider, GeneratedContract, InventoryProvider,
    InventoryReceipt, InventoryReport, ListingDraft, ListingPublisher, OptimizedListing,
    PublishResult, RiskLevel, ScoringProvider, ScoringReport, ScoringRequest, SignatureChannel,
    SignatureConfirmation, SignatureProvider,
};
use async_trait::async_trait;
use mosaic_core::ProviderError;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Latency and failure injected into a fake
#[derive(Debug, Clone, Default)]
pub struct FakeBehavior {
    /// Sleep before answering
    pub delay: Option<Duration>,
    /// Answer with this error instead
    pub failure: Option<ProviderError>,
}

impl FakeBehavior {
    async fn apply(&self) -> Result<(), ProviderError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

macro_rules! behavior_builders {
    ($fake:ty) => {
        impl $fake {
            /// Answer after `delay`
            pub fn with_delay(mut self, delay: Duration) -> Self {
                self.behavior.delay = Some(delay);
                self
            }

            /// Always fail with `error`
            pub fn failing(mut self, error: ProviderError) -> Self {
                self.behavior.failure = Some(error);
                self
            }
        }
    };
}

/// Score derived from the passport number
///
/// Always within 600..=1000.
pub fn deterministic_score(passport_number: &str) -> u32 {
    let sum: u32 = passport_number.bytes().map(u32::from).sum();
    600 + sum % 401
}

/// Risk bucket for a score
pub fn risk_level_for(score: u32) -> RiskLevel {
    if score >= 800 {
        RiskLevel::Low
    } else if score >= 700 {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}

/// Scoring bureau fake
#[derive(Debug, Default)]
pub struct FakeScoringProvider {
    behavior: FakeBehavior,
}

impl FakeScoringProvider {
    /// Create the fake
    pub fn new() -> Self {
        Self::default()
    }
}

behavior_builders!(FakeScoringProvider);

#[async_trait]
impl ScoringProvider for FakeScoringProvider {
    async fn score_person(&self, request: &ScoringRequest) -> Result<ScoringReport, ProviderError> {
        self.behavior.apply().await?;
        let score = deterministic_score(&request.passport_number);
        let mut factors = BTreeMap::new();
        factors.insert("paymentHistory".to_string(), json!(score / 10));
        factors.insert("openLoans".to_string(), json!(score % 3));
        Ok(ScoringReport {
            score,
            risk_level: risk_level_for(score),
            factors,
            bureau_data: json!({ "bureau": "fake", "requestedFor": request.full_name }),
        })
    }
}

/// Contract generator fake; numbers contracts sequentially
#[derive(Debug, Default)]
pub struct FakeContractProvider {
    behavior: FakeBehavior,
    issued: AtomicU32,
}

impl FakeContractProvider {
    /// Create the fake
    pub fn new() -> Self {
        Self::default()
    }
}

behavior_builders!(FakeContractProvider);

#[async_trait]
impl ContractProvider for FakeContractProvider {
    async fn generate(&self, _draft: &ContractDraft) -> Result<GeneratedContract, ProviderError> {
        self.behavior.apply().await?;
        let number = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let contract_number = format!("RC-{:06}", number);
        Ok(GeneratedContract {
            document_url: format!("https://documents.invalid/{}.pdf", contract_number),
            contract_number,
        })
    }
}

/// Inventory storage fake
#[derive(Debug, Default)]
pub struct FakeInventoryProvider {
    behavior: FakeBehavior,
    issued: AtomicU32,
}

impl FakeInventoryProvider {
    /// Create the fake
    pub fn new() -> Self {
        Self::default()
    }
}

behavior_builders!(FakeInventoryProvider);

#[async_trait]
impl InventoryProvider for FakeInventoryProvider {
    async fn submit_report(&self, report: &InventoryReport) -> Result<InventoryReceipt, ProviderError> {
        self.behavior.apply().await?;
        let number = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(InventoryReceipt {
            report_id: format!("INV-{:06}", number),
            // rooms plus the two meter readings
            item_count: report.rooms.len() + 2,
        })
    }
}

/// Signature service fake
///
/// Accepts exactly one code and remembers the codes it "sent".
#[derive(Debug)]
pub struct FakeSignatureProvider {
    behavior: FakeBehavior,
    valid_code: String,
    sent: Mutex<Vec<(String, SignatureChannel)>>,
}

impl Default for FakeSignatureProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeSignatureProvider {
    /// Code the fake accepts unless configured otherwise
    pub const DEFAULT_CODE: &'static str = "123456";

    /// Create the fake
    pub fn new() -> Self {
        Self {
            behavior: FakeBehavior::default(),
            valid_code: Self::DEFAULT_CODE.to_string(),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Accept `code` instead of the default
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.valid_code = code.into();
        self
    }

    /// Signers and channels a code was sent to
    pub fn sent(&self) -> Vec<(String, SignatureChannel)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

behavior_builders!(FakeSignatureProvider);

#[async_trait]
impl SignatureProvider for FakeSignatureProvider {
    async fn send_verification_code(
        &self,
        signer_id: &str,
        channel: SignatureChannel,
    ) -> Result<(), ProviderError> {
        self.behavior.apply().await?;
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((signer_id.to_string(), channel));
        }
        Ok(())
    }

    async fn confirm_signature(
        &self,
        _document_id: &str,
        code: &str,
    ) -> Result<SignatureConfirmation, ProviderError> {
        self.behavior.apply().await?;
        Ok(SignatureConfirmation {
            signed: code == self.valid_code,
        })
    }
}

/// Content optimizer fake
#[derive(Debug, Default)]
pub struct FakeContentOptimizer {
    behavior: FakeBehavior,
}

impl FakeContentOptimizer {
    /// Create the fake
    pub fn new() -> Self {
        Self::default()
    }
}

behavior_builders!(FakeContentOptimizer);

#[async_trait]
impl ContentOptimizer for FakeContentOptimizer {
    async fn optimize(&self, draft: &ListingDraft) -> Result<OptimizedListing, ProviderError> {
        self.behavior.apply().await?;
        let tags = draft
            .title
            .split_whitespace()
            .filter(|w| w.chars().count() > 3)
            .map(|w| w.to_lowercase())
            .collect();
        Ok(OptimizedListing {
            title: draft.title.trim().to_string(),
            description: format!("{} {}", draft.description.trim(), draft.property_address),
            tags,
            highlights: vec![format!("{} per month", draft.price)],
        })
    }
}

/// Listing publisher fake; publishes on every requested platform
#[derive(Debug, Default)]
pub struct FakeListingPublisher {
    behavior: FakeBehavior,
}

impl FakeListingPublisher {
    /// Create the fake
    pub fn new() -> Self {
        Self::default()
    }
}

behavior_builders!(FakeListingPublisher);

#[async_trait]
impl ListingPublisher for FakeListingPublisher {
    async fn publish(
        &self,
        _listing: &OptimizedListing,
        platform_ids: &[String],
    ) -> Result<Vec<PublishResult>, ProviderError> {
        self.behavior.apply().await?;
        Ok(platform_ids
            .iter()
            .map(|platform| PublishResult {
                platform_id: platform.clone(),
                published: true,
                listing_url: Some(format!("https://{}.invalid/listing/1", platform)),
                views: 0,
                contacts: 0,
            })
            .collect())
    }
}

/// A full set of fakes, shared as trait objects
pub fn fake_providers() -> crate::catalog::Providers {
    crate::catalog::Providers {
        contract: Arc::new(FakeContractProvider::new()),
        scoring: Arc::new(FakeScoringProvider::new()),
        inventory: Arc::new(FakeInventoryProvider::new()),
        signature: Arc::new(FakeSignatureProvider::new()),
        optimizer: Arc::new(FakeContentOptimizer::new()),
        publisher: Arc::new(FakeListingPublisher::new()),
    }
}
