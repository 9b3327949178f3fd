use crate::domain::identifiers::{InstanceId, StepId, WizardId};
use crate::domain::wizard_instance::StagePhase;
use crate::StageErrorKind;
use chrono::{DateTime, Utc};
use std::fmt::Debug;

/// Domain event trait for everything a wizard instance records
pub trait DomainEvent: Debug + Send + Sync {
    /// Returns the type of the event as a string
    fn event_type(&self) -> &'static str;

    /// Returns the wizard instance ID this event is associated with
    fn instance_id(&self) -> &InstanceId;

    /// Returns the timestamp when the event occurred
    fn timestamp(&self) -> DateTime<Utc>;
}

macro_rules! domain_event {
    ($event:ty, $name:literal) => {
        impl DomainEvent for $event {
            fn event_type(&self) -> &'static str {
                $name
            }

            fn instance_id(&self) -> &InstanceId {
                &self.instance_id
            }

            fn timestamp(&self) -> DateTime<Utc> {
                self.timestamp
            }
        }
    };
}

/// Event: Wizard instance created
#[derive(Debug)]
pub struct WizardStarted {
    /// The unique identifier of the wizard instance
    pub instance_id: InstanceId,

    /// The wizard definition the instance runs
    pub wizard_id: WizardId,

    /// The timestamp when the instance was created
    pub timestamp: DateTime<Utc>,
}

domain_event!(WizardStarted, "wizard.started");

/// Event: Step validated and left forward
#[derive(Debug)]
pub struct StepAdvanced {
    /// The unique identifier of the wizard instance
    pub instance_id: InstanceId,
    /// Step that passed validation
    pub from: StepId,
    /// Step now current
    pub to: StepId,
    /// The timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
}

domain_event!(StepAdvanced, "wizard.step_advanced");

/// Event: Step failed validation, instance stayed put
#[derive(Debug)]
pub struct StepRejected {
    /// The unique identifier of the wizard instance
    pub instance_id: InstanceId,
    /// Step that failed
    pub step_id: StepId,
    /// Number of fields with errors
    pub error_count: usize,
    /// The timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
}

domain_event!(StepRejected, "wizard.step_rejected");

/// Event: Backward navigation
#[derive(Debug)]
pub struct StepReverted {
    /// The unique identifier of the wizard instance
    pub instance_id: InstanceId,
    /// Step left
    pub from: StepId,
    /// Step now current
    pub to: StepId,
    /// The timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
}

domain_event!(StepReverted, "wizard.step_reverted");

/// Event: Async stage handed off
#[derive(Debug)]
pub struct StageSubmitted {
    /// The unique identifier of the wizard instance
    pub instance_id: InstanceId,
    /// Which stage call was issued
    pub phase: StagePhase,
    /// Generation the eventual result must match
    pub generation: u64,
    /// The timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
}

domain_event!(StageSubmitted, "wizard.stage_submitted");

/// Event: Async stage resolved successfully
#[derive(Debug)]
pub struct StageSucceeded {
    /// The unique identifier of the wizard instance
    pub instance_id: InstanceId,
    /// Which stage call resolved
    pub phase: StagePhase,
    /// The timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
}

domain_event!(StageSucceeded, "wizard.stage_succeeded");

/// Event: Async stage resolved with a failure
#[derive(Debug)]
pub struct StageFailed {
    /// The unique identifier of the wizard instance
    pub instance_id: InstanceId,
    /// Which stage call failed
    pub phase: StagePhase,
    /// Failure class
    pub kind: StageErrorKind,
    /// The timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
}

domain_event!(StageFailed, "wizard.stage_failed");

/// Event: User cancelled the wizard
#[derive(Debug)]
pub struct WizardAborted {
    /// The unique identifier of the wizard instance
    pub instance_id: InstanceId,
    /// Whether a stage was still pending at the time
    pub had_pending_stage: bool,
    /// The timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
}

domain_event!(WizardAborted, "wizard.aborted");

/// Event: A late stage result was ignored
#[derive(Debug)]
pub struct StaleResultDropped {
    /// The unique identifier of the wizard instance
    pub instance_id: InstanceId,
    /// Generation carried by the late result
    pub ticket_generation: u64,
    /// Generation of the instance when the result arrived
    pub current_generation: u64,
    /// The timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
}

domain_event!(StaleResultDropped, "wizard.stale_result_dropped");
