use crate::domain::identifiers::{StepId, WizardId};
use crate::domain::validation::FieldRule;
use crate::CoreError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A field collected by a step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Field name, the key in the wizard value map
    pub name: String,

    /// Whether a blank value blocks the step
    pub required: bool,
}

/// Copy `source` into `target` when a step is entered and `target` is blank
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prefill {
    /// Field of the entered step
    pub target: String,

    /// Field collected by an earlier step
    pub source: String,
}

/// Represents one step of a wizard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
    /// ID of the step
    pub id: StepId,

    /// Human-readable label
    pub label: String,

    /// Fields this step collects
    pub fields: Vec<FieldDefinition>,

    /// Cross-field rules checked after the required-field policy
    #[serde(default)]
    pub rules: Vec<FieldRule>,

    /// Values carried over from earlier steps on entry
    #[serde(default)]
    pub prefill: Vec<Prefill>,
}

impl StepDefinition {
    /// Create a step with no fields
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: StepId(id.into()),
            label: label.into(),
            fields: Vec::new(),
            rules: Vec::new(),
            prefill: Vec::new(),
        }
    }

    /// Add required fields
    pub fn required(mut self, names: &[&str]) -> Self {
        self.fields.extend(names.iter().map(|n| FieldDefinition {
            name: n.to_string(),
            required: true,
        }));
        self
    }

    /// Add optional fields
    pub fn optional(mut self, names: &[&str]) -> Self {
        self.fields.extend(names.iter().map(|n| FieldDefinition {
            name: n.to_string(),
            required: false,
        }));
        self
    }

    /// Attach a cross-field rule
    pub fn rule(mut self, rule: FieldRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Prefill `target` from `source` when the step is entered
    pub fn prefill(mut self, target: &str, source: &str) -> Self {
        self.prefill.push(Prefill {
            target: target.to_string(),
            source: source.to_string(),
        });
        self
    }

    /// Whether the step declares the field
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }
}

/// Static description of a wizard type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardDefinition {
    /// ID of the wizard
    pub id: WizardId,

    /// Human-readable name
    pub name: String,

    /// Ordered steps; never empty once validated
    pub steps: Vec<StepDefinition>,

    /// Optional verification step run after the submit stage succeeds
    #[serde(default)]
    pub confirmation: Option<StepDefinition>,
}

impl WizardDefinition {
    /// Create a wizard definition
    pub fn new(id: impl Into<String>, name: impl Into<String>, steps: Vec<StepDefinition>) -> Self {
        Self {
            id: WizardId(id.into()),
            name: name.into(),
            steps,
            confirmation: None,
        }
    }

    /// Require a verification step after the submit stage
    pub fn with_confirmation(mut self, confirmation: StepDefinition) -> Self {
        self.confirmation = Some(confirmation);
        self
    }

    /// Number of steps
    #[inline]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// True when there are no steps (only possible before validation)
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Index of the final step
    #[inline]
    pub fn last_index(&self) -> usize {
        self.steps.len().saturating_sub(1)
    }

    /// Step at `index`
    #[inline]
    pub fn step(&self, index: usize) -> Option<&StepDefinition> {
        self.steps.get(index)
    }

    /// Position of a step by ID
    pub fn step_index(&self, id: &StepId) -> Option<usize> {
        self.steps.iter().position(|s| &s.id == id)
    }

    /// Validate the wizard definition
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.steps.is_empty() {
            return Err(CoreError::InvalidDefinition(format!(
                "Wizard {} must have at least one step",
                self.id
            )));
        }

        let mut step_ids = HashSet::new();
        for step in &self.steps {
            if !step_ids.insert(&step.id) {
                return Err(CoreError::InvalidDefinition(format!(
                    "Duplicate step ID in wizard {}: {}",
                    self.id, step.id
                )));
            }
        }

        let declared: HashSet<&str> = self
            .steps
            .iter()
            .chain(self.confirmation.iter())
            .flat_map(|s| s.fields.iter().map(|f| f.name.as_str()))
            .collect();

        for step in self.steps.iter().chain(self.confirmation.iter()) {
            for rule in &step.rules {
                if let Some(missing) = rule.fields().into_iter().find(|f| !declared.contains(f)) {
                    return Err(CoreError::InvalidDefinition(format!(
                        "Step {} has a rule on undeclared field: {}",
                        step.id, missing
                    )));
                }
            }
        }

        for (index, step) in self.steps.iter().enumerate() {
            for prefill in &step.prefill {
                if !step.has_field(&prefill.target) {
                    return Err(CoreError::InvalidDefinition(format!(
                        "Step {} prefills a field it does not collect: {}",
                        step.id, prefill.target
                    )));
                }
                let from_earlier = self.steps[..index]
                    .iter()
                    .any(|s| s.has_field(&prefill.source));
                if !from_earlier {
                    return Err(CoreError::InvalidDefinition(format!(
                        "Step {} prefills from a field no earlier step collects: {}",
                        step.id, prefill.source
                    )));
                }
            }
        }

        if let Some(confirmation) = &self.confirmation {
            if confirmation.fields.is_empty() {
                return Err(CoreError::InvalidDefinition(format!(
                    "Confirmation step of wizard {} collects no fields",
                    self.id
                )));
            }
        }

        Ok(())
    }
}
