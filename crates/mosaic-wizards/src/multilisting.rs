//! Multi-platform listing

use crate::fields;
use crate::providers::{ContentOptimizer, ListingDraft, ListingPublisher, PublishResult};
use async_trait::async_trait;
use mosaic_core::{
    FieldMap, FieldRule, ProviderError, StepDefinition, WizardDefinition, WizardKit, WizardStage,
};
use mosaic_monitoring::LogExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

/// Wizard id
pub const WIZARD_ID: &str = "multilisting";

/// Platforms a listing can be published on
pub const PLATFORMS: [&str; 4] = ["avito", "cian", "domclick", "yandex"];

/// Listing, description, platform choice, review
pub fn definition() -> WizardDefinition {
    WizardDefinition::new(
        WIZARD_ID,
        "Multi-listing",
        vec![
            StepDefinition::new("listing", "Listing")
                .required(&["title", "propertyAddress", "price"])
                .rule(FieldRule::Positive {
                    field: "price".into(),
                }),
            StepDefinition::new("description", "Description").required(&["description"]),
            StepDefinition::new("platforms", "Platforms")
                .required(&["platforms"])
                .rule(FieldRule::MinItems {
                    field: "platforms".into(),
                    min: 1,
                })
                .rule(FieldRule::OneOf {
                    field: "platforms".into(),
                    options: PLATFORMS.iter().map(|p| p.to_string()).collect(),
                }),
            StepDefinition::new("review", "Review")
                .required(&["publishConsent"])
                .rule(FieldRule::Accepted {
                    field: "publishConsent".into(),
                }),
        ],
    )
}

/// Build the draft from wizard values
pub fn draft(values: &FieldMap) -> Result<ListingDraft, ProviderError> {
    Ok(ListingDraft {
        title: fields::text(values, "title")?,
        property_address: fields::text(values, "propertyAddress")?,
        price: fields::number(values, "price")?,
        description: fields::text(values, "description")?,
    })
}

/// Optimizes the text, then publishes it
pub struct MultilistingStage {
    optimizer: Arc<dyn ContentOptimizer>,
    publisher: Arc<dyn ListingPublisher>,
}

impl MultilistingStage {
    /// Create the stage
    pub fn new(optimizer: Arc<dyn ContentOptimizer>, publisher: Arc<dyn ListingPublisher>) -> Self {
        Self {
            optimizer,
            publisher,
        }
    }
}

fn check_publications(requested: &[String], results: &[PublishResult]) -> Result<(), ProviderError> {
    if results.is_empty() {
        return Err(ProviderError::InvalidResponse(
            "publisher returned no results".to_string(),
        ));
    }
    if let Some(unexpected) = results
        .iter()
        .find(|r| !requested.iter().any(|p| p == &r.platform_id))
    {
        return Err(ProviderError::InvalidResponse(format!(
            "result for unrequested platform {}",
            unexpected.platform_id
        )));
    }
    Ok(())
}

#[async_trait]
impl WizardStage for MultilistingStage {
    async fn execute(&self, values: &FieldMap) -> Result<Value, ProviderError> {
        let draft = draft(values)?;
        let platforms = fields::list(values, "platforms")?;

        let optimized = self
            .optimizer
            .optimize(&draft)
            .await
            .log_err("Listing optimization failed")?;
        let results = self
            .publisher
            .publish(&optimized, &platforms)
            .await
            .log_err("Listing publication failed")?;

        check_publications(&platforms, &results)?;

        let published = results.iter().filter(|r| r.published).count();
        info!(requested = platforms.len(), published, "Listing published");
        Ok(json!({
            "listing": optimized,
            "publications": results,
            "publishedCount": published,
        }))
    }
}

/// Definition and stage together
pub fn kit(optimizer: Arc<dyn ContentOptimizer>, publisher: Arc<dyn ListingPublisher>) -> WizardKit {
    WizardKit::new(
        definition(),
        Arc::new(MultilistingStage::new(optimizer, publisher)),
    )
}
