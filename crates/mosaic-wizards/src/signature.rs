//! Electronic signature
//!
//! Submitting the last step sends a one-time code to the signer. The
//! wizard then waits for the code; only a well-formed six digit code is
//! forwarded to the provider.

use crate::fields;
use crate::providers::{SignatureChannel, SignatureProvider};
use async_trait::async_trait;
use chrono::Utc;
use mosaic_core::{
    FieldMap, FieldRule, ProviderError, StepDefinition, WizardDefinition, WizardKit, WizardStage,
};
use mosaic_monitoring::LogExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// Wizard id
pub const WIZARD_ID: &str = "signature";

/// Field holding the one-time code
pub const CODE_FIELD: &str = "verificationCode";

/// Length of the one-time code
pub const CODE_DIGITS: usize = 6;

/// Document, signer and channel, followed by code confirmation
pub fn definition() -> WizardDefinition {
    WizardDefinition::new(
        WIZARD_ID,
        "Electronic signature",
        vec![
            StepDefinition::new("document", "Document").required(&["documentId", "documentTitle"]),
            StepDefinition::new("signer", "Signer").required(&["signerId", "signerName"]),
            StepDefinition::new("channel", "Channel")
                .required(&["channel"])
                .rule(FieldRule::OneOf {
                    field: "channel".into(),
                    options: SignatureChannel::IDS.iter().map(|c| c.to_string()).collect(),
                }),
        ],
    )
    .with_confirmation(
        StepDefinition::new("verification", "Verification")
            .required(&[CODE_FIELD])
            .rule(FieldRule::DigitCount {
                field: CODE_FIELD.into(),
                digits: CODE_DIGITS,
            }),
    )
}

/// Sends the code, then confirms the signature
pub struct SignatureStage {
    provider: Arc<dyn SignatureProvider>,
}

impl SignatureStage {
    /// Create the stage
    pub fn new(provider: Arc<dyn SignatureProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl WizardStage for SignatureStage {
    async fn execute(&self, values: &FieldMap) -> Result<Value, ProviderError> {
        let signer_id = fields::text(values, "signerId")?;
        let channel: SignatureChannel = fields::text(values, "channel")?.parse()?;

        self.provider
            .send_verification_code(&signer_id, channel)
            .await
            .log_err("Sending verification code failed")?;

        info!(signer = %signer_id, %channel, "Verification code sent");
        Ok(json!({
            "codeSent": true,
            "signerId": signer_id,
            "channel": channel,
        }))
    }

    async fn confirm(&self, values: &FieldMap, _dispatch: &Value) -> Result<Value, ProviderError> {
        let document_id = fields::text(values, "documentId")?;
        let code: String = fields::digits(values, CODE_FIELD)?;

        let confirmation = self
            .provider
            .confirm_signature(&document_id, &code)
            .await
            .log_err("Signature confirmation failed")?;

        if !confirmation.signed {
            warn!(document = %document_id, "Signature declined");
            return Err(ProviderError::Rejected("signature was not accepted".to_string()));
        }

        info!(document = %document_id, "Document signed");
        Ok(json!({
            "documentId": document_id,
            "signed": true,
            "signedAt": Utc::now().to_rfc3339(),
        }))
    }
}

/// Definition and stage together
pub fn kit(provider: Arc<dyn SignatureProvider>) -> WizardKit {
    WizardKit::new(definition(), Arc::new(SignatureStage::new(provider)))
}
