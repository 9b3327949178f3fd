//! External provider interfaces
//!
//! Every wizard concludes with a call to one of these collaborators. They
//! are injected into the stages, so real integrations and the fakes in
//! [`crate::testing`] are interchangeable.

use async_trait::async_trait;
use mosaic_core::ProviderError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "testing")]
use mockall::automock;

/// Data collected by the contract wizard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractDraft {
    /// Rented property address
    pub property_address: String,
    /// Apartment, house, room, ...
    pub property_type: String,
    /// Landlord full name
    pub landlord_name: String,
    /// Landlord passport, digits only
    pub landlord_passport: String,
    /// Tenant full name
    pub tenant_name: String,
    /// Tenant passport, digits only
    pub tenant_passport: String,
    /// Tenant phone
    pub tenant_phone: String,
    /// First day of the lease, YYYY-MM-DD
    pub start_date: String,
    /// Last day of the lease, YYYY-MM-DD
    pub end_date: String,
    /// Monthly rent
    pub monthly_rent: f64,
    /// Security deposit
    pub deposit: Option<f64>,
    /// Day of month the rent is due
    pub payment_day: u8,
    /// Whether utilities are part of the rent
    pub utilities_included: bool,
}

/// A generated rental contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedContract {
    /// Registry number of the contract
    pub contract_number: String,
    /// Where the rendered document can be downloaded
    pub document_url: String,
}

/// Produces contract documents
#[cfg_attr(feature = "testing", automock)]
#[async_trait]
pub trait ContractProvider: Send + Sync {
    /// Render and register a contract
    async fn generate(&self, draft: &ContractDraft) -> Result<GeneratedContract, ProviderError>;
}

/// Person to score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringRequest {
    /// Full name
    pub full_name: String,
    /// Passport number, digits only
    pub passport_number: String,
    /// Birth date, YYYY-MM-DD
    pub birth_date: String,
}

/// Tenant risk bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Reliable tenant
    Low,
    /// Some concerns
    Medium,
    /// Needs a guarantor or deposit
    High,
}

/// Credit bureau answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringReport {
    /// Score in 0..=1000
    pub score: u32,
    /// Risk bucket
    pub risk_level: RiskLevel,
    /// Factor name to contribution
    #[serde(default)]
    pub factors: BTreeMap<String, Value>,
    /// Raw bureau payload
    #[serde(default)]
    pub bureau_data: Value,
}

/// Tenant scoring bureau
#[cfg_attr(feature = "testing", automock)]
#[async_trait]
pub trait ScoringProvider: Send + Sync {
    /// Score a person
    async fn score_person(&self, request: &ScoringRequest) -> Result<ScoringReport, ProviderError>;
}

/// Channel used to deliver a verification code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureChannel {
    /// Text message
    Sms,
    /// E-mail
    Email,
    /// Public services portal
    Gosuslugi,
}

impl SignatureChannel {
    /// Channel ids accepted by the signature wizard
    pub const IDS: [&'static str; 3] = ["sms", "email", "gosuslugi"];

    /// Wire id of the channel
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureChannel::Sms => "sms",
            SignatureChannel::Email => "email",
            SignatureChannel::Gosuslugi => "gosuslugi",
        }
    }
}

impl fmt::Display for SignatureChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureChannel {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "sms" => Ok(SignatureChannel::Sms),
            "email" => Ok(SignatureChannel::Email),
            "gosuslugi" => Ok(SignatureChannel::Gosuslugi),
            other => Err(ProviderError::Rejected(format!(
                "unsupported signature channel: {}",
                other
            ))),
        }
    }
}

/// Outcome of a signature confirmation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureConfirmation {
    /// Whether the document is now signed
    pub signed: bool,
}

/// Electronic signature service
#[cfg_attr(feature = "testing", automock)]
#[async_trait]
pub trait SignatureProvider: Send + Sync {
    /// Send a one-time code to the signer
    async fn send_verification_code(
        &self,
        signer_id: &str,
        channel: SignatureChannel,
    ) -> Result<(), ProviderError>;

    /// Sign the document with the code the signer received
    async fn confirm_signature(
        &self,
        document_id: &str,
        code: &str,
    ) -> Result<SignatureConfirmation, ProviderError>;
}

/// Listing as entered by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingDraft {
    /// Listing headline
    pub title: String,
    /// Property address
    pub property_address: String,
    /// Asking rent
    pub price: f64,
    /// Free text description
    pub description: String,
}

/// Listing after content optimization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizedListing {
    /// Improved headline
    pub title: String,
    /// Improved description
    pub description: String,
    /// Search tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// Selling points
    #[serde(default)]
    pub highlights: Vec<String>,
}

/// Rewrites listing text
#[cfg_attr(feature = "testing", automock)]
#[async_trait]
pub trait ContentOptimizer: Send + Sync {
    /// Optimize a draft
    async fn optimize(&self, draft: &ListingDraft) -> Result<OptimizedListing, ProviderError>;
}

/// Result of publishing on one platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResult {
    /// Platform id
    pub platform_id: String,
    /// Whether the listing went live
    pub published: bool,
    /// Public listing URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing_url: Option<String>,
    /// Views so far
    #[serde(default)]
    pub views: u32,
    /// Contacts so far
    #[serde(default)]
    pub contacts: u32,
}

/// Publishes listings on classified platforms
#[cfg_attr(feature = "testing", automock)]
#[async_trait]
pub trait ListingPublisher: Send + Sync {
    /// Publish on every requested platform
    async fn publish(
        &self,
        listing: &OptimizedListing,
        platform_ids: &[String],
    ) -> Result<Vec<PublishResult>, ProviderError>;
}

/// Move-in inspection report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryReport {
    /// Inspected property
    pub property_address: String,
    /// Inspection date, YYYY-MM-DD
    pub inspection_date: String,
    /// Inspected rooms
    pub rooms: Vec<String>,
    /// Electricity meter reading
    pub electricity_reading: f64,
    /// Water meter reading
    pub water_reading: f64,
    /// Inspector full name
    pub inspector_name: String,
}

/// Acknowledgement of a stored report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryReceipt {
    /// Report id
    pub report_id: String,
    /// Number of recorded items
    pub item_count: usize,
}

/// Stores inventory reports
#[cfg_attr(feature = "testing", automock)]
#[async_trait]
pub trait InventoryProvider: Send + Sync {
    /// Store a report
    async fn submit_report(&self, report: &InventoryReport) -> Result<InventoryReceipt, ProviderError>;
}
