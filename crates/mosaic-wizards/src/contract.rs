//! Rental contract builder

use crate::fields;
use crate::providers::{ContractDraft, ContractProvider};
use async_trait::async_trait;
use mosaic_core::{
    FieldMap, FieldRule, ProviderError, StepDefinition, WizardDefinition, WizardKit, WizardStage,
};
use mosaic_monitoring::LogExt;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// Wizard id
pub const WIZARD_ID: &str = "contract";

/// The six contract steps
pub fn definition() -> WizardDefinition {
    WizardDefinition::new(
        WIZARD_ID,
        "Rental contract",
        vec![
            StepDefinition::new("property", "Property")
                .required(&["propertyAddress", "propertyType"])
                .optional(&["propertyRent"])
                .rule(FieldRule::Positive {
                    field: "propertyRent".into(),
                }),
            StepDefinition::new("landlord", "Landlord")
                .required(&["landlordName", "landlordPassport"])
                .rule(FieldRule::DigitCount {
                    field: "landlordPassport".into(),
                    digits: 10,
                }),
            StepDefinition::new("tenant", "Tenant")
                .required(&["tenantName", "tenantPassport", "tenantPhone"])
                .rule(FieldRule::DigitCount {
                    field: "tenantPassport".into(),
                    digits: 10,
                }),
            StepDefinition::new("terms", "Terms")
                .required(&["startDate", "endDate", "monthlyRent"])
                .optional(&["deposit"])
                .rule(FieldRule::DateOrder {
                    start: "startDate".into(),
                    end: "endDate".into(),
                })
                .rule(FieldRule::Positive {
                    field: "monthlyRent".into(),
                })
                .rule(FieldRule::Positive {
                    field: "deposit".into(),
                })
                .prefill("monthlyRent", "propertyRent"),
            StepDefinition::new("conditions", "Conditions")
                .required(&["paymentDay"])
                .optional(&["utilitiesIncluded"])
                .rule(FieldRule::Range {
                    field: "paymentDay".into(),
                    min: 1.0,
                    max: 28.0,
                })
                .rule(FieldRule::WholeNumber {
                    field: "paymentDay".into(),
                }),
            StepDefinition::new("review", "Review")
                .required(&["agreement"])
                .rule(FieldRule::Accepted {
                    field: "agreement".into(),
                }),
        ],
    )
}

/// Build the provider request from wizard values
pub fn draft(values: &FieldMap) -> Result<ContractDraft, ProviderError> {
    Ok(ContractDraft {
        property_address: fields::text(values, "propertyAddress")?,
        property_type: fields::text(values, "propertyType")?,
        landlord_name: fields::text(values, "landlordName")?,
        landlord_passport: fields::digits(values, "landlordPassport")?,
        tenant_name: fields::text(values, "tenantName")?,
        tenant_passport: fields::digits(values, "tenantPassport")?,
        tenant_phone: fields::text(values, "tenantPhone")?,
        start_date: fields::text(values, "startDate")?,
        end_date: fields::text(values, "endDate")?,
        monthly_rent: fields::number(values, "monthlyRent")?,
        deposit: fields::optional_number(values, "deposit"),
        payment_day: fields::whole_number(values, "paymentDay")?,
        utilities_included: fields::flag(values, "utilitiesIncluded"),
    })
}

/// Generates the contract document
pub struct ContractStage {
    provider: Arc<dyn ContractProvider>,
}

impl ContractStage {
    /// Create the stage
    pub fn new(provider: Arc<dyn ContractProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl WizardStage for ContractStage {
    async fn execute(&self, values: &FieldMap) -> Result<Value, ProviderError> {
        let draft = draft(values)?;
        let contract = self
            .provider
            .generate(&draft)
            .await
            .log_err("Contract generation failed")?;

        if contract.contract_number.trim().is_empty() {
            return Err(ProviderError::InvalidResponse(
                "contract number is empty".to_string(),
            ));
        }

        info!(contract_number = %contract.contract_number, "Contract generated");
        Ok(serde_json::to_value(contract)?)
    }
}

/// Definition and stage together
pub fn kit(provider: Arc<dyn ContractProvider>) -> WizardKit {
    WizardKit::new(definition(), Arc::new(ContractStage::new(provider)))
}
