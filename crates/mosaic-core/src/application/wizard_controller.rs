//! Wizard controller
//!
//! Drives a [`WizardInstance`] through its definition: forward moves are
//! gated by the step validator, backward moves never are. The controller
//! never performs I/O itself; the last step hands out a [`StageTicket`]
//! which a runner executes and which is later fed back through
//! [`WizardController::resolve`].

use crate::application::stage_runner::StageResult;
use crate::domain::events::{
    StageFailed, StageSubmitted, StageSucceeded, StaleResultDropped, StepAdvanced, StepRejected,
    StepReverted, WizardAborted,
};
use crate::domain::validation::{StepValidator, ValidationResult};
use crate::domain::wizard_definition::{StepDefinition, WizardDefinition};
use crate::domain::wizard_instance::{StagePhase, StageTicket, WizardInstance, WizardStatus};
use crate::types::{is_blank, is_field_blank, FieldMap};
use crate::{CoreError, DomainEvent, StageErrorKind};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Position within the wizard, 1-based for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Current step number, starting at 1
    pub current: usize,

    /// Total number of steps
    pub total: usize,
}

/// How a stage result was applied
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Wizard completed with this data
    Completed(Value),

    /// Submit stage succeeded; a confirmation code is expected next
    AwaitingConfirmation,

    /// Stage failed; the user may retry
    Failed(StageErrorKind),

    /// Result belonged to an aborted or superseded submission and was ignored
    Stale,
}

/// Drives one wizard instance
pub struct WizardController {
    definition: Arc<WizardDefinition>,
    validator: Arc<dyn StepValidator>,
    instance: WizardInstance,
}

impl std::fmt::Debug for WizardController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WizardController")
            .field("wizard", &self.definition.id)
            .field("instance", &self.instance.id)
            .field("status", &self.instance.status)
            .field("step", &self.instance.current_step)
            .finish()
    }
}

impl WizardController {
    /// Create a controller over a fresh instance
    pub fn new(
        definition: Arc<WizardDefinition>,
        validator: Arc<dyn StepValidator>,
    ) -> Result<Self, CoreError> {
        definition.validate()?;
        let instance = WizardInstance::new(definition.id.clone());
        debug!(wizard = %definition.id, instance = %instance.id, "Wizard opened");
        Ok(Self {
            definition,
            validator,
            instance,
        })
    }

    /// The wizard definition
    pub fn definition(&self) -> &WizardDefinition {
        &self.definition
    }

    /// The underlying instance state
    pub fn instance(&self) -> &WizardInstance {
        &self.instance
    }

    /// Current status
    #[inline]
    pub fn status(&self) -> WizardStatus {
        self.instance.status
    }

    /// Index of the current step
    #[inline]
    pub fn current_index(&self) -> usize {
        self.instance.current_step
    }

    /// Definition of the current step
    pub fn current_step(&self) -> &StepDefinition {
        &self.definition.steps[self.instance.current_step]
    }

    /// Current position and total step count
    pub fn progress(&self) -> Progress {
        Progress {
            current: self.instance.current_step + 1,
            total: self.definition.len(),
        }
    }

    /// Accumulated values
    pub fn values(&self) -> &FieldMap {
        &self.instance.values
    }

    /// Current field errors
    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.instance.errors
    }

    /// Whether the instance waits for a confirmation code
    pub fn awaiting_confirmation(&self) -> bool {
        self.instance.awaiting_confirmation
    }

    /// Drain recorded domain events
    pub fn take_events(&mut self) -> Vec<Box<dyn DomainEvent>> {
        self.instance.take_events()
    }

    /// Update a field value
    ///
    /// Clears the error of that field only; validation runs on `next`.
    /// Ignored (and logged) once the instance no longer accepts input.
    pub fn set_field(&mut self, name: impl Into<String>, value: Value) -> bool {
        if self.instance.status != WizardStatus::InProgress {
            warn!(
                instance = %self.instance.id,
                status = ?self.instance.status,
                "Ignoring field update outside of step input"
            );
            return false;
        }
        let name = name.into();
        self.instance.errors.remove(&name);
        self.instance.values.insert(name, value);
        self.instance.update_timestamp();
        true
    }

    /// Validate the current step and move forward
    ///
    /// On the last step a valid `next` submits the wizard and the status
    /// becomes `AwaitingAsync`. Returns false and stays put when the step is
    /// invalid or the instance is not taking input.
    pub fn next(&mut self) -> bool {
        if self.instance.status != WizardStatus::InProgress {
            self.reject_transition("next");
            return false;
        }

        if self.instance.current_step >= self.definition.last_index() {
            return matches!(self.submit(), Ok(true));
        }

        if !self.validate_current() {
            return false;
        }

        let from = self.instance.current_step;
        let to = from + 1;
        self.enter_step(to);
        self.instance.highest_reached = self.instance.highest_reached.max(to);
        self.instance.record_event(Box::new(StepAdvanced {
            instance_id: self.instance.id.clone(),
            from: self.definition.steps[from].id.clone(),
            to: self.definition.steps[to].id.clone(),
            timestamp: Utc::now(),
        }));
        debug!(instance = %self.instance.id, from, to, "Step advanced");
        true
    }

    /// Move one step back without validation
    ///
    /// Floored at the first step. Returns whether the position changed.
    pub fn prev(&mut self) -> bool {
        if self.instance.status != WizardStatus::InProgress {
            self.reject_transition("prev");
            return false;
        }
        if self.instance.current_step == 0 {
            return false;
        }

        let from = self.instance.current_step;
        self.instance.current_step = from - 1;
        self.instance.update_timestamp();
        self.instance.record_event(Box::new(StepReverted {
            instance_id: self.instance.id.clone(),
            from: self.definition.steps[from].id.clone(),
            to: self.definition.steps[from - 1].id.clone(),
            timestamp: Utc::now(),
        }));
        true
    }

    /// Jump to a step reached before
    ///
    /// Only indices up to the highest validly reached step are allowed.
    /// Anything else leaves the instance untouched and returns
    /// `InvalidTransition`.
    pub fn go_to(&mut self, index: usize) -> Result<(), CoreError> {
        if self.instance.status != WizardStatus::InProgress {
            self.reject_transition("go_to");
            return Err(CoreError::InvalidTransition(format!(
                "go_to while {:?}",
                self.instance.status
            )));
        }
        if index > self.instance.highest_reached {
            self.reject_transition("go_to");
            return Err(CoreError::InvalidTransition(format!(
                "step {} not reached yet (highest {})",
                index, self.instance.highest_reached
            )));
        }

        if index != self.instance.current_step {
            self.enter_step(index);
        }
        Ok(())
    }

    /// Validate every step and hand the wizard to its stage
    ///
    /// Values of earlier steps may have changed since they were passed, so
    /// all steps are checked again. `Ok(false)` means some step is invalid:
    /// errors are set and the wizard moves back to the first invalid step.
    pub fn submit(&mut self) -> Result<bool, CoreError> {
        if self.instance.status != WizardStatus::InProgress {
            self.reject_transition("submit");
            return Err(CoreError::InvalidTransition(format!(
                "submit while {:?}",
                self.instance.status
            )));
        }
        if self.instance.current_step != self.definition.last_index() {
            self.reject_transition("submit");
            return Err(CoreError::InvalidTransition(format!(
                "submit from step {} of {}",
                self.instance.current_step + 1,
                self.definition.len()
            )));
        }

        let invalid: Vec<usize> = (0..=self.definition.last_index())
            .filter(|&i| !self.validate_step(i))
            .collect();
        if let Some(&index) = invalid.first() {
            if index != self.instance.current_step {
                debug!(instance = %self.instance.id, step = index, "Submit sent back to invalid step");
                self.instance.current_step = index;
                self.instance.update_timestamp();
            }
            return Ok(false);
        }

        self.instance.retryable = false;
        self.instance.last_error = None;
        self.issue(StagePhase::Submit);
        Ok(true)
    }

    /// Supply the confirmation code after the submit stage succeeded
    ///
    /// A malformed code sets errors and returns `Ok(false)` without
    /// contacting the provider; the instance keeps waiting.
    pub fn confirm(&mut self, code: Value) -> Result<bool, CoreError> {
        let confirmation = match &self.definition.confirmation {
            Some(step) => step.clone(),
            None => {
                return Err(CoreError::InvalidTransition(format!(
                    "wizard {} has no confirmation step",
                    self.definition.id
                )))
            }
        };
        if !self.instance.awaiting_confirmation || self.instance.has_pending_stage() {
            self.reject_transition("confirm");
            return Err(CoreError::InvalidTransition(
                "no confirmation expected".to_string(),
            ));
        }

        let field = confirmation.fields[0].name.clone();
        self.instance.values.insert(field, code);

        let result = self.validator.validate(&confirmation, &self.instance.values);
        self.apply_validation(&confirmation, &result);
        if !result.valid {
            return Ok(false);
        }

        self.issue(StagePhase::Confirm);
        Ok(true)
    }

    /// Hand out the outstanding ticket for execution
    ///
    /// Each ticket can be claimed once, so a submission is never executed
    /// twice.
    pub fn claim_stage(&mut self) -> Result<StageTicket, CoreError> {
        match self.instance.pending.as_mut() {
            Some(pending) if !pending.claimed => {
                pending.claimed = true;
                Ok(pending.ticket.clone())
            }
            Some(_) => Err(CoreError::StageAlreadyRunning(self.instance.id.to_string())),
            None => Err(CoreError::InvalidTransition(
                "no stage submitted".to_string(),
            )),
        }
    }

    /// Apply a stage result
    ///
    /// Results for aborted instances or superseded tickets are dropped and
    /// reported as [`Resolution::Stale`].
    pub fn resolve(&mut self, ticket: &StageTicket, result: StageResult) -> Resolution {
        if !self.instance.accepts(ticket) {
            warn!(
                instance = %self.instance.id,
                ticket_generation = ticket.generation,
                current_generation = self.instance.generation,
                "Dropping stale stage result"
            );
            self.instance.record_event(Box::new(StaleResultDropped {
                instance_id: self.instance.id.clone(),
                ticket_generation: ticket.generation,
                current_generation: self.instance.generation,
                timestamp: Utc::now(),
            }));
            return Resolution::Stale;
        }

        self.instance.pending = None;
        self.instance.update_timestamp();

        match result {
            StageResult::Ok { data } => {
                self.instance.retryable = false;
                self.instance.last_error = None;
                self.instance.record_event(Box::new(StageSucceeded {
                    instance_id: self.instance.id.clone(),
                    phase: ticket.phase,
                    timestamp: Utc::now(),
                }));

                if ticket.phase == StagePhase::Submit && self.definition.confirmation.is_some() {
                    self.instance.stage_data = Some(data);
                    self.instance.awaiting_confirmation = true;
                    info!(instance = %self.instance.id, "Awaiting confirmation");
                    return Resolution::AwaitingConfirmation;
                }

                if ticket.phase == StagePhase::Submit {
                    self.instance.stage_data = Some(data.clone());
                }
                self.instance.awaiting_confirmation = false;
                self.instance.output = Some(data.clone());
                self.instance.status = WizardStatus::Completed;
                info!(instance = %self.instance.id, wizard = %self.definition.id, "Wizard completed");
                Resolution::Completed(data)
            }
            StageResult::Failed { error_kind } => {
                self.instance.retryable = true;
                self.instance.last_error = Some(error_kind);
                self.instance.record_event(Box::new(StageFailed {
                    instance_id: self.instance.id.clone(),
                    phase: ticket.phase,
                    kind: error_kind,
                    timestamp: Utc::now(),
                }));

                match ticket.phase {
                    StagePhase::Submit => {
                        // back to the last step so the user can amend and retry
                        self.instance.status = WizardStatus::InProgress;
                        self.instance.current_step = self.definition.last_index();
                    }
                    StagePhase::Confirm => {
                        if let Some(field) = self
                            .definition
                            .confirmation
                            .as_ref()
                            .map(|c| c.fields[0].name.clone())
                        {
                            self.instance.values.remove(&field);
                        }
                    }
                }
                Resolution::Failed(error_kind)
            }
        }
    }

    /// Cancel the wizard
    ///
    /// Any stage still in flight is invalidated. Returns false when the
    /// instance had already finished.
    pub fn abort(&mut self) -> bool {
        if self.instance.is_terminal() {
            self.reject_transition("abort");
            return false;
        }

        let had_pending_stage = self.instance.has_pending_stage();
        self.instance.status = WizardStatus::Aborted;
        self.instance.generation += 1;
        self.instance.pending = None;
        self.instance.awaiting_confirmation = false;
        self.instance.update_timestamp();
        self.instance.record_event(Box::new(WizardAborted {
            instance_id: self.instance.id.clone(),
            had_pending_stage,
            timestamp: Utc::now(),
        }));
        info!(instance = %self.instance.id, had_pending_stage, "Wizard aborted");
        true
    }

    /// Data returned by the submit stage, if any
    pub fn stage_data(&self) -> Option<&Value> {
        self.instance.stage_data.as_ref()
    }

    fn issue(&mut self, phase: StagePhase) {
        let ticket = self.instance.issue_ticket(phase);
        self.instance.record_event(Box::new(StageSubmitted {
            instance_id: self.instance.id.clone(),
            phase,
            generation: ticket.generation,
            timestamp: Utc::now(),
        }));
        debug!(instance = %self.instance.id, ?phase, generation = ticket.generation, "Stage submitted");
    }

    fn validate_current(&mut self) -> bool {
        self.validate_step(self.instance.current_step)
    }

    fn validate_step(&mut self, index: usize) -> bool {
        let definition = self.definition.clone();
        let step = &definition.steps[index];
        let result = self.validator.validate(step, &self.instance.values);
        self.apply_validation(step, &result);

        if !result.valid {
            self.instance.record_event(Box::new(StepRejected {
                instance_id: self.instance.id.clone(),
                step_id: step.id.clone(),
                error_count: result.errors.len(),
                timestamp: Utc::now(),
            }));
            debug!(
                instance = %self.instance.id,
                step = %step.id,
                errors = result.errors.len(),
                "Step rejected"
            );
        }
        result.valid
    }

    /// Replace the errors owned by `step` with the fresh result
    fn apply_validation(&mut self, step: &StepDefinition, result: &ValidationResult) {
        let errors = &mut self.instance.errors;
        for field in &step.fields {
            errors.remove(&field.name);
        }
        for rule in &step.rules {
            for field in rule.fields() {
                errors.remove(field);
            }
        }
        errors.extend(result.errors.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    fn enter_step(&mut self, index: usize) {
        self.instance.current_step = index;
        let definition = self.definition.clone();
        for prefill in &definition.steps[index].prefill {
            if !is_field_blank(&self.instance.values, &prefill.target) {
                continue;
            }
            if let Some(source) = self.instance.values.get(&prefill.source).cloned() {
                if !is_blank(&source) {
                    self.instance.values.insert(prefill.target.clone(), source);
                }
            }
        }
        self.instance.update_timestamp();
    }

    fn reject_transition(&self, operation: &str) {
        warn!(
            instance = %self.instance.id,
            status = ?self.instance.status,
            step = self.instance.current_step,
            operation,
            "Invalid transition ignored"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::validation::{DefaultStepValidator, FieldRule};
    use serde_json::json;

    fn lease() -> Arc<WizardDefinition> {
        Arc::new(WizardDefinition::new(
            "lease",
            "Lease",
            vec![
                StepDefinition::new("property", "Property")
                    .required(&["propertyAddress"])
                    .optional(&["propertyRent"]),
                StepDefinition::new("terms", "Terms")
                    .required(&["startDate", "endDate", "monthlyRent"])
                    .rule(FieldRule::DateOrder {
                        start: "startDate".into(),
                        end: "endDate".into(),
                    })
                    .rule(FieldRule::Positive {
                        field: "monthlyRent".into(),
                    })
                    .prefill("monthlyRent", "propertyRent"),
                StepDefinition::new("review", "Review")
                    .required(&["agreement"])
                    .rule(FieldRule::Accepted {
                        field: "agreement".into(),
                    }),
            ],
        ))
    }

    fn controller() -> WizardController {
        WizardController::new(lease(), Arc::new(DefaultStepValidator)).unwrap()
    }

    fn fill_terms(ctl: &mut WizardController) {
        ctl.set_field("startDate", json!("2024-01-01"));
        ctl.set_field("endDate", json!("2024-12-31"));
        ctl.set_field("monthlyRent", json!(50000));
    }

    #[test]
    fn test_next_blocks_on_invalid_step() {
        let mut ctl = controller();
        assert!(!ctl.next());
        assert_eq!(ctl.current_index(), 0);
        assert_eq!(ctl.errors().get("propertyAddress").map(String::as_str), Some("This field is required"));

        ctl.set_field("propertyAddress", json!("Невский пр., 28"));
        assert!(ctl.errors().is_empty());
        assert!(ctl.next());
        assert_eq!(ctl.current_index(), 1);
        assert_eq!(ctl.progress(), Progress { current: 2, total: 3 });
    }

    #[test]
    fn test_set_field_clears_only_touched_error() {
        let mut ctl = controller();
        ctl.set_field("propertyAddress", json!("addr"));
        assert!(ctl.next());
        assert!(!ctl.next());
        assert_eq!(ctl.errors().len(), 3);

        ctl.set_field("startDate", json!("2024-01-01"));
        assert_eq!(ctl.errors().len(), 2);
        assert!(ctl.errors().contains_key("endDate"));
        assert!(ctl.errors().contains_key("monthlyRent"));
    }

    #[test]
    fn test_prev_is_never_blocked() {
        let mut ctl = controller();
        assert!(!ctl.prev());

        ctl.set_field("propertyAddress", json!("addr"));
        assert!(ctl.next());
        assert!(!ctl.next());
        assert!(ctl.prev());
        assert_eq!(ctl.current_index(), 0);
    }

    #[test]
    fn test_prev_next_round_trip_preserves_errors() {
        let mut ctl = controller();
        ctl.set_field("propertyAddress", json!("addr"));
        assert!(ctl.next());
        ctl.set_field("startDate", json!("2024-05-01"));
        ctl.set_field("endDate", json!("2024-04-01"));
        assert!(!ctl.next());

        let index_before = ctl.current_index();
        let errors_before = ctl.errors().clone();

        assert!(ctl.prev());
        assert!(ctl.next());
        assert_eq!(ctl.current_index(), index_before);
        assert_eq!(ctl.errors(), &errors_before);
    }

    #[test]
    fn test_prefill_from_earlier_step() {
        let mut ctl = controller();
        ctl.set_field("propertyAddress", json!("addr"));
        ctl.set_field("propertyRent", json!(42000));
        assert!(ctl.next());
        assert_eq!(ctl.values()["monthlyRent"], json!(42000));

        // a user value is never overwritten
        ctl.set_field("monthlyRent", json!(40000));
        assert!(ctl.prev());
        ctl.set_field("propertyRent", json!(45000));
        assert!(ctl.next());
        assert_eq!(ctl.values()["monthlyRent"], json!(40000));
    }

    #[test]
    fn test_go_to_only_reached_steps() {
        let mut ctl = controller();
        assert!(matches!(ctl.go_to(2), Err(CoreError::InvalidTransition(_))));
        assert_eq!(ctl.current_index(), 0);

        ctl.set_field("propertyAddress", json!("addr"));
        assert!(ctl.next());
        fill_terms(&mut ctl);
        assert!(ctl.next());
        assert_eq!(ctl.current_index(), 2);

        assert!(ctl.go_to(0).is_ok());
        assert_eq!(ctl.current_index(), 0);
        assert!(ctl.go_to(2).is_ok());
        assert_eq!(ctl.current_index(), 2);
        assert!(ctl.go_to(3).is_err());
        assert_eq!(ctl.current_index(), 2);
    }

    #[test]
    fn test_submit_only_from_last_step() {
        let mut ctl = controller();
        assert!(matches!(ctl.submit(), Err(CoreError::InvalidTransition(_))));
        assert_eq!(ctl.status(), WizardStatus::InProgress);
    }

    fn at_review(ctl: &mut WizardController) {
        ctl.set_field("propertyAddress", json!("addr"));
        assert!(ctl.next());
        fill_terms(ctl);
        assert!(ctl.next());
    }

    #[test]
    fn test_next_on_last_step_submits() {
        let mut ctl = controller();
        at_review(&mut ctl);

        ctl.set_field("agreement", json!(false));
        assert!(!ctl.next());
        assert_eq!(ctl.status(), WizardStatus::InProgress);

        ctl.set_field("agreement", json!(true));
        assert!(ctl.next());
        assert_eq!(ctl.status(), WizardStatus::AwaitingAsync);
        assert_eq!(ctl.current_index(), 2);

        // input is frozen while the stage is pending
        assert!(!ctl.next());
        assert!(!ctl.prev());
        assert!(!ctl.set_field("agreement", json!(false)));
    }

    #[test]
    fn test_submit_revalidates_earlier_steps() {
        let mut ctl = controller();
        at_review(&mut ctl);
        ctl.set_field("agreement", json!(true));
        ctl.set_field("propertyAddress", json!(""));
        ctl.set_field("monthlyRent", json!("NaN"));

        assert!(!ctl.next());
        assert_eq!(ctl.status(), WizardStatus::InProgress);
        assert_eq!(ctl.current_index(), 0);
        assert!(ctl.instance().pending.is_none());
        assert_eq!(ctl.errors().get("propertyAddress").map(String::as_str), Some("This field is required"));
        assert_eq!(ctl.errors().get("monthlyRent").map(String::as_str), Some("Must be a number"));

        ctl.set_field("propertyAddress", json!("addr"));
        ctl.set_field("monthlyRent", json!(50000));
        assert!(ctl.go_to(2).is_ok());
        assert!(ctl.next());
        assert_eq!(ctl.status(), WizardStatus::AwaitingAsync);
        assert!(ctl.errors().is_empty());
    }

    #[test]
    fn test_ticket_claimed_once() {
        let mut ctl = controller();
        at_review(&mut ctl);
        ctl.set_field("agreement", json!(true));
        assert!(ctl.next());

        let ticket = ctl.claim_stage().unwrap();
        assert_eq!(ticket.phase, StagePhase::Submit);
        assert!(matches!(ctl.claim_stage(), Err(CoreError::StageAlreadyRunning(_))));
    }

    #[test]
    fn test_resolve_success_completes() {
        let mut ctl = controller();
        at_review(&mut ctl);
        ctl.set_field("agreement", json!(true));
        assert!(ctl.next());
        let ticket = ctl.claim_stage().unwrap();

        let resolution = ctl.resolve(&ticket, StageResult::Ok { data: json!({"contractNumber": "Д-1"}) });
        assert_eq!(resolution, Resolution::Completed(json!({"contractNumber": "Д-1"})));
        assert_eq!(ctl.status(), WizardStatus::Completed);
        assert_eq!(ctl.values()["monthlyRent"], json!(50000));
        assert!(!ctl.abort());
    }

    #[test]
    fn test_resolve_failure_returns_to_last_step() {
        let mut ctl = controller();
        at_review(&mut ctl);
        ctl.set_field("agreement", json!(true));
        assert!(ctl.next());
        let ticket = ctl.claim_stage().unwrap();

        let resolution = ctl.resolve(
            &ticket,
            StageResult::Failed {
                error_kind: StageErrorKind::Timeout,
            },
        );
        assert_eq!(resolution, Resolution::Failed(StageErrorKind::Timeout));
        assert_eq!(ctl.status(), WizardStatus::InProgress);
        assert_eq!(ctl.current_index(), 2);
        assert!(ctl.instance().retryable);
        assert_eq!(ctl.instance().last_error, Some(StageErrorKind::Timeout));

        // retry issues a fresh ticket; the old one is stale
        assert!(ctl.next());
        let retry = ctl.claim_stage().unwrap();
        assert!(retry.generation > ticket.generation);
        assert_eq!(
            ctl.resolve(&ticket, StageResult::Ok { data: json!(1) }),
            Resolution::Stale
        );
        assert_eq!(
            ctl.resolve(&retry, StageResult::Ok { data: json!(2) }),
            Resolution::Completed(json!(2))
        );
    }

    #[test]
    fn test_abort_makes_pending_result_stale() {
        let mut ctl = controller();
        at_review(&mut ctl);
        ctl.set_field("agreement", json!(true));
        assert!(ctl.next());
        let ticket = ctl.claim_stage().unwrap();
        ctl.take_events();

        assert!(ctl.abort());
        assert_eq!(ctl.status(), WizardStatus::Aborted);

        let resolution = ctl.resolve(&ticket, StageResult::Ok { data: json!({}) });
        assert_eq!(resolution, Resolution::Stale);
        assert_eq!(ctl.status(), WizardStatus::Aborted);
        assert!(ctl.instance().output.is_none());

        let types: Vec<_> = ctl.take_events().iter().map(|e| e.event_type()).collect();
        assert_eq!(types, vec!["wizard.aborted", "wizard.stale_result_dropped"]);
    }

    #[test]
    fn test_confirmation_flow() {
        let definition = Arc::new(
            WizardDefinition::new(
                "sign",
                "Sign",
                vec![StepDefinition::new("document", "Document").required(&["documentId"])],
            )
            .with_confirmation(
                StepDefinition::new("verify", "Verify")
                    .required(&["verificationCode"])
                    .rule(FieldRule::DigitCount {
                        field: "verificationCode".into(),
                        digits: 6,
                    }),
            ),
        );
        let mut ctl = WizardController::new(definition, Arc::new(DefaultStepValidator)).unwrap();

        assert!(ctl.confirm(json!("123456")).is_err());

        ctl.set_field("documentId", json!("doc-1"));
        assert!(ctl.next());
        let send = ctl.claim_stage().unwrap();
        assert_eq!(
            ctl.resolve(&send, StageResult::Ok { data: json!({"sent": true}) }),
            Resolution::AwaitingConfirmation
        );
        assert_eq!(ctl.status(), WizardStatus::AwaitingAsync);
        assert!(ctl.awaiting_confirmation());

        assert!(!ctl.confirm(json!("1234")).unwrap());
        assert_eq!(ctl.status(), WizardStatus::AwaitingAsync);
        assert!(ctl.errors().contains_key("verificationCode"));
        assert!(ctl.claim_stage().is_err());

        assert!(ctl.confirm(json!("654321")).unwrap());
        assert!(ctl.errors().is_empty());
        let confirm = ctl.claim_stage().unwrap();
        assert_eq!(confirm.phase, StagePhase::Confirm);

        assert_eq!(
            ctl.resolve(&confirm, StageResult::Failed { error_kind: StageErrorKind::Rejected }),
            Resolution::Failed(StageErrorKind::Rejected)
        );
        assert!(ctl.awaiting_confirmation());
        assert!(!ctl.values().contains_key("verificationCode"));

        assert!(ctl.confirm(json!("111111")).unwrap());
        let confirm = ctl.claim_stage().unwrap();
        assert_eq!(
            ctl.resolve(&confirm, StageResult::Ok { data: json!({"signed": true}) }),
            Resolution::Completed(json!({"signed": true}))
        );
        assert_eq!(ctl.stage_data(), Some(&json!({"sent": true})));
    }

    #[test]
    fn test_invalid_definition_rejected() {
        let definition = Arc::new(WizardDefinition::new("empty", "Empty", Vec::new()));
        assert!(WizardController::new(definition, Arc::new(DefaultStepValidator)).is_err());
    }
}
