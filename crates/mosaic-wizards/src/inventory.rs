//! Property inventory (move-in inspection)

use crate::fields;
use crate::providers::{InventoryProvider, InventoryReport};
use async_trait::async_trait;
use mosaic_core::{
    FieldMap, FieldRule, ProviderError, StepDefinition, WizardDefinition, WizardKit, WizardStage,
};
use mosaic_monitoring::LogExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

/// Wizard id
pub const WIZARD_ID: &str = "inventory";

/// Property, rooms, meter readings, review
pub fn definition() -> WizardDefinition {
    WizardDefinition::new(
        WIZARD_ID,
        "Property inventory",
        vec![
            StepDefinition::new("property", "Property")
                .required(&["propertyAddress", "inspectionDate"])
                .rule(FieldRule::Date {
                    field: "inspectionDate".into(),
                }),
            StepDefinition::new("rooms", "Rooms")
                .required(&["rooms"])
                .rule(FieldRule::MinItems {
                    field: "rooms".into(),
                    min: 1,
                }),
            StepDefinition::new("meters", "Meters")
                .required(&["electricityReading", "waterReading"])
                .rule(FieldRule::Positive {
                    field: "electricityReading".into(),
                })
                .rule(FieldRule::Positive {
                    field: "waterReading".into(),
                }),
            StepDefinition::new("review", "Review").required(&["inspectorName"]),
        ],
    )
}

/// Build the report from wizard values
pub fn report(values: &FieldMap) -> Result<InventoryReport, ProviderError> {
    Ok(InventoryReport {
        property_address: fields::text(values, "propertyAddress")?,
        inspection_date: fields::text(values, "inspectionDate")?,
        rooms: fields::list(values, "rooms")?,
        electricity_reading: fields::number(values, "electricityReading")?,
        water_reading: fields::number(values, "waterReading")?,
        inspector_name: fields::text(values, "inspectorName")?,
    })
}

/// Stores the inspection report
pub struct InventoryStage {
    provider: Arc<dyn InventoryProvider>,
}

impl InventoryStage {
    /// Create the stage
    pub fn new(provider: Arc<dyn InventoryProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl WizardStage for InventoryStage {
    async fn execute(&self, values: &FieldMap) -> Result<Value, ProviderError> {
        let report = report(values)?;
        let receipt = self
            .provider
            .submit_report(&report)
            .await
            .log_err("Inventory submission failed")?;

        if receipt.report_id.trim().is_empty() {
            return Err(ProviderError::InvalidResponse("report id is empty".to_string()));
        }

        info!(report_id = %receipt.report_id, items = receipt.item_count, "Inventory stored");
        Ok(json!({
            "reportId": receipt.report_id,
            "itemCount": receipt.item_count,
            "rooms": report.rooms,
        }))
    }
}

/// Definition and stage together
pub fn kit(provider: Arc<dyn InventoryProvider>) -> WizardKit {
    WizardKit::new(definition(), Arc::new(InventoryStage::new(provider)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{InventoryReceipt, MockInventoryProvider};
    use mosaic_core::{DefaultStepValidator, StepValidator};

    #[test]
    fn test_rooms_need_an_entry() {
        let definition = definition();
        let rooms = &definition.steps[1];
        let mut values = FieldMap::new();
        values.insert("rooms".into(), json!([]));
        let result = DefaultStepValidator.validate(rooms, &values);
        assert_eq!(result.error_for("rooms"), Some("This field is required"));

        values.insert("rooms".into(), json!(["kitchen"]));
        assert!(DefaultStepValidator.validate(rooms, &values).valid);
    }

    #[test]
    fn test_inspection_date_format() {
        let definition = definition();
        let property = &definition.steps[0];
        let mut values = FieldMap::new();
        values.insert("propertyAddress".into(), json!("Казань, ул. Баумана, 3"));
        values.insert("inspectionDate".into(), json!("01.02.2024"));
        assert_eq!(
            DefaultStepValidator.validate(property, &values).error_for("inspectionDate"),
            Some("Invalid date, expected YYYY-MM-DD")
        );

        values.insert("inspectionDate".into(), json!("2024-02-01"));
        assert!(DefaultStepValidator.validate(property, &values).valid);
    }

    #[tokio::test]
    async fn test_stage_submits_report() {
        let mut provider = MockInventoryProvider::new();
        provider
            .expect_submit_report()
            .withf(|r| r.rooms == vec!["kitchen".to_string(), "bedroom".to_string()])
            .returning(|r| {
                Ok(InventoryReceipt {
                    report_id: "INV-1".to_string(),
                    item_count: r.rooms.len(),
                })
            });

        let mut values = FieldMap::new();
        values.insert("propertyAddress".into(), json!("Казань, ул. Баумана, 3"));
        values.insert("inspectionDate".into(), json!("2024-02-01"));
        values.insert("rooms".into(), json!(["kitchen", "bedroom"]));
        values.insert("electricityReading".into(), json!("10432.5"));
        values.insert("waterReading".into(), json!(321));
        values.insert("inspectorName".into(), json!("Козлова Мария"));

        let data = InventoryStage::new(Arc::new(provider))
            .execute(&values)
            .await
            .unwrap();
        assert_eq!(data["reportId"], json!("INV-1"));
        assert_eq!(data["itemCount"], json!(2));
    }
}
