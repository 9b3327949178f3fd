/// Async stage runner
pub mod stage_runner;

/// Wizard controller
pub mod wizard_controller;

/// Workflow aggregator
pub mod workflow_aggregator;

/// Workflow session
pub mod workflow_session;
