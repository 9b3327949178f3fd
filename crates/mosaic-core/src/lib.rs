//!
//! Mosaic Core - Wizard and workflow engine for the Mosaic deal builder
//!
//! This crate defines the step-by-step wizard state machine, the async
//! stage runner that concludes a wizard, and the module graph that gates
//! which wizards may be opened. Concrete wizards live in `mosaic-wizards`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Domain layer - definitions, instances and the module graph
pub mod domain;

/// Application services - controller, runner, aggregator and session
pub mod application;

/// Field value helpers
pub mod types;

/// Error types
pub mod error;

/// Runtime configuration
pub mod config;

// Re-export key types
pub use config::MosaicConfig;
pub use error::{CoreError, ProviderError, StageErrorKind};
pub use types::FieldMap;

pub use domain::events::DomainEvent;
pub use domain::identifiers::{InstanceId, ModuleId, StepId, WizardId};
pub use domain::module_graph::{ModuleDescriptor, ModuleGraph, ModuleStatus};
pub use domain::validation::{DefaultStepValidator, FieldRule, StepValidator, ValidationResult};
pub use domain::wizard_definition::{StepDefinition, WizardDefinition};
pub use domain::wizard_instance::{StagePhase, StageTicket, WizardInstance, WizardStatus};
pub use domain::workflow_result::WorkflowResult;

pub use application::stage_runner::{AsyncStageRunner, StageResult, WizardStage};
pub use application::wizard_controller::{Progress, Resolution, WizardController};
pub use application::workflow_aggregator::WorkflowAggregator;
pub use application::workflow_session::{
    ModuleWizard, PendingCall, StageOutcome, WizardKit, WorkflowSession,
};
