/// Identifier value objects
pub mod identifiers;

/// Domain events
pub mod events;

/// Step validation rules and the validator seam
pub mod validation;

/// Wizard and step definitions
pub mod wizard_definition;

/// Wizard instance state
pub mod wizard_instance;

/// Module dependency graph
pub mod module_graph;

/// Finalized workflow snapshot
pub mod workflow_result;
