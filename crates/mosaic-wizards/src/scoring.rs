//! Tenant scoring

use crate::fields;
use crate::providers::{ScoringProvider, ScoringRequest};
use async_trait::async_trait;
use mosaic_core::{
    FieldMap, FieldRule, ProviderError, StepDefinition, WizardDefinition, WizardKit, WizardStage,
};
use mosaic_monitoring::LogExt;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// Wizard id
pub const WIZARD_ID: &str = "scoring";

/// Highest score a bureau may report
pub const MAX_SCORE: u32 = 1000;

/// Person details, then consent to the bureau request
pub fn definition() -> WizardDefinition {
    WizardDefinition::new(
        WIZARD_ID,
        "Tenant scoring",
        vec![
            StepDefinition::new("person", "Person")
                .required(&["fullName", "passport", "birthDate"])
                .rule(FieldRule::DigitCount {
                    field: "passport".into(),
                    digits: 10,
                })
                .rule(FieldRule::Date {
                    field: "birthDate".into(),
                }),
            StepDefinition::new("consent", "Consent")
                .required(&["consent"])
                .rule(FieldRule::Accepted {
                    field: "consent".into(),
                }),
        ],
    )
}

/// Build the bureau request from wizard values
pub fn request(values: &FieldMap) -> Result<ScoringRequest, ProviderError> {
    Ok(ScoringRequest {
        full_name: fields::text(values, "fullName")?,
        passport_number: fields::digits(values, "passport")?,
        birth_date: fields::text(values, "birthDate")?,
    })
}

/// Scores the tenant
pub struct ScoringStage {
    provider: Arc<dyn ScoringProvider>,
}

impl ScoringStage {
    /// Create the stage
    pub fn new(provider: Arc<dyn ScoringProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl WizardStage for ScoringStage {
    async fn execute(&self, values: &FieldMap) -> Result<Value, ProviderError> {
        let request = request(values)?;
        let report = self
            .provider
            .score_person(&request)
            .await
            .log_err("Scoring request failed")?;

        if report.score > MAX_SCORE {
            return Err(ProviderError::InvalidResponse(format!(
                "score {} out of range",
                report.score
            )));
        }

        info!(score = report.score, risk_level = ?report.risk_level, "Tenant scored");
        Ok(serde_json::to_value(report)?)
    }
}

/// Definition and stage together
pub fn kit(provider: Arc<dyn ScoringProvider>) -> WizardKit {
    WizardKit::new(definition(), Arc::new(ScoringStage::new(provider)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{MockScoringProvider, RiskLevel, ScoringReport};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn values() -> FieldMap {
        let mut values = FieldMap::new();
        values.insert("fullName".into(), json!("Иванов Иван"));
        values.insert("passport".into(), json!("1234 567890"));
        values.insert("birthDate".into(), json!("1990-01-01"));
        values.insert("consent".into(), json!(true));
        values
    }

    fn report(score: u32) -> ScoringReport {
        ScoringReport {
            score,
            risk_level: RiskLevel::Medium,
            factors: BTreeMap::new(),
            bureau_data: Value::Null,
        }
    }

    #[test]
    fn test_birth_date_format() {
        use mosaic_core::{DefaultStepValidator, StepValidator};

        let definition = definition();
        let person = &definition.steps[0];
        let mut input = values();
        assert!(DefaultStepValidator.validate(person, &input).valid);

        input.insert("birthDate".into(), json!("yesterday"));
        assert_eq!(
            DefaultStepValidator.validate(person, &input).error_for("birthDate"),
            Some("Invalid date, expected YYYY-MM-DD")
        );
    }

    #[tokio::test]
    async fn test_request_uses_digits_only() {
        let mut provider = MockScoringProvider::new();
        provider
            .expect_score_person()
            .withf(|r| r.passport_number == "1234567890" && r.full_name == "Иванов Иван")
            .times(1)
            .returning(|_| Ok(report(740)));

        let data = ScoringStage::new(Arc::new(provider))
            .execute(&values())
            .await
            .unwrap();
        assert_eq!(data["score"], json!(740));
        assert_eq!(data["riskLevel"], json!("medium"));
    }

    #[tokio::test]
    async fn test_out_of_range_score_is_invalid() {
        let mut provider = MockScoringProvider::new();
        provider.expect_score_person().returning(|_| Ok(report(1001)));

        let result = ScoringStage::new(Arc::new(provider)).execute(&values()).await;
        assert!(matches!(result, Err(ProviderError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_provider_error_passes_through() {
        let mut provider = MockScoringProvider::new();
        provider
            .expect_score_person()
            .returning(|_| Err(ProviderError::Rejected("bureau unavailable".into())));

        let result = ScoringStage::new(Arc::new(provider)).execute(&values()).await;
        assert_eq!(result, Err(ProviderError::Rejected("bureau unavailable".into())));
    }
}
