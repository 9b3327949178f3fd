//! Default module catalog
//!
//! The deal builder offers five modules. The contract is required; the
//! inventory and signature build on it; the multi-listing module is a paid
//! extra that stays locked until unlocked.

use crate::providers::{
    ContentOptimizer, ContractProvider, InventoryProvider, ListingPublisher, ScoringProvider,
    SignatureProvider,
};
use crate::{contract, inventory, multilisting, scoring, signature};
use mosaic_core::{
    AsyncStageRunner, CoreError, ModuleDescriptor, ModuleGraph, MosaicConfig, WorkflowSession,
};
use std::sync::Arc;
use tracing::info;

/// Module ids of the default catalog
pub mod modules {
    /// Rental contract
    pub const CONTRACT: &str = "contract";
    /// Tenant scoring
    pub const SCORING: &str = "scoring";
    /// Property inventory
    pub const INVENTORY: &str = "inventory";
    /// Electronic signature
    pub const SIGNATURE: &str = "signature";
    /// Multi-platform listing
    pub const MULTILISTING: &str = "multilisting";
}

/// The five modules with their prices and prerequisites
pub fn default_modules() -> Vec<ModuleDescriptor> {
    vec![
        ModuleDescriptor::new(modules::CONTRACT, "Rental contract", 1000).required(),
        ModuleDescriptor::new(modules::SCORING, "Tenant scoring", 500),
        ModuleDescriptor::new(modules::INVENTORY, "Property inventory", 700)
            .depends_on(&[modules::CONTRACT]),
        ModuleDescriptor::new(modules::SIGNATURE, "Electronic signature", 300)
            .depends_on(&[modules::CONTRACT]),
        ModuleDescriptor::new(modules::MULTILISTING, "Multi-listing", 1500).locked_by_default(),
    ]
}

/// Graph over [`default_modules`]
pub fn default_graph() -> Result<ModuleGraph, CoreError> {
    ModuleGraph::new(default_modules())
}

/// External collaborators used by the default wizards
#[derive(Clone)]
pub struct Providers {
    /// Contract generator
    pub contract: Arc<dyn ContractProvider>,
    /// Scoring bureau
    pub scoring: Arc<dyn ScoringProvider>,
    /// Inventory storage
    pub inventory: Arc<dyn InventoryProvider>,
    /// Signature service
    pub signature: Arc<dyn SignatureProvider>,
    /// Listing text optimizer
    pub optimizer: Arc<dyn ContentOptimizer>,
    /// Listing publisher
    pub publisher: Arc<dyn ListingPublisher>,
}

/// Session over the default catalog with every wizard registered
pub fn build_session(
    providers: Providers,
    config: &MosaicConfig,
) -> Result<WorkflowSession, CoreError> {
    let runner = AsyncStageRunner::from_config(config);
    let mut session = WorkflowSession::new(default_graph()?, runner);

    session.register(modules::CONTRACT, contract::kit(providers.contract))?;
    session.register(modules::SCORING, scoring::kit(providers.scoring))?;
    session.register(modules::INVENTORY, inventory::kit(providers.inventory))?;
    session.register(modules::SIGNATURE, signature::kit(providers.signature))?;
    session.register(
        modules::MULTILISTING,
        multilisting::kit(providers.optimizer, providers.publisher),
    )?;

    info!(session = %session.id(), timeout_ms = config.stage_timeout_ms, "Workflow session ready");
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fake_providers;
    use mosaic_core::{CoreError, ModuleId, ModuleStatus};

    #[test]
    fn test_initial_statuses() {
        let graph = default_graph().unwrap();
        let status = |id: &str| graph.status_of(&ModuleId::from(id)).unwrap();

        assert_eq!(status(modules::CONTRACT), ModuleStatus::Available);
        assert_eq!(status(modules::SCORING), ModuleStatus::Available);
        assert_eq!(status(modules::INVENTORY), ModuleStatus::Locked);
        assert_eq!(status(modules::SIGNATURE), ModuleStatus::Locked);
        assert_eq!(status(modules::MULTILISTING), ModuleStatus::Locked);
        assert_eq!(graph.missing_required(), vec![ModuleId::from(modules::CONTRACT)]);
    }

    #[test]
    fn test_premium_module_unlocks() {
        let mut session = build_session(fake_providers(), &MosaicConfig::default()).unwrap();
        let listing = ModuleId::from(modules::MULTILISTING);

        assert!(matches!(session.open(&listing), Err(CoreError::ModuleLocked(_))));
        session.aggregator_mut().unlock(&listing).unwrap();
        assert!(session.open(&listing).is_ok());
    }

    #[test]
    fn test_every_module_has_a_wizard() {
        let mut session = build_session(fake_providers(), &MosaicConfig::default()).unwrap();
        session
            .aggregator_mut()
            .record(&ModuleId::from(modules::CONTRACT), serde_json::json!({}))
            .unwrap();
        session
            .aggregator_mut()
            .unlock(&ModuleId::from(modules::MULTILISTING))
            .unwrap();

        for descriptor in default_modules() {
            let wizard = session.open(&descriptor.id).unwrap();
            assert_eq!(wizard.module_id(), &descriptor.id);
        }
    }
}
