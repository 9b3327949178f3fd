use crate::{
    domain::events::{DomainEvent, WizardStarted},
    domain::identifiers::{InstanceId, WizardId},
    types::FieldMap,
    StageErrorKind,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Wizard instance status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStatus {
    /// User is filling in steps
    InProgress,

    /// A stage was submitted, or the instance waits for a confirmation code
    AwaitingAsync,

    /// Stage resolved successfully; terminal
    Completed,

    /// User cancelled; terminal
    Aborted,
}

/// Which provider call a stage ticket stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StagePhase {
    /// The call issued when the last step is submitted
    Submit,

    /// The call issued once a confirmation code passes validation
    Confirm,
}

/// Handle tying an async stage result back to the instance that issued it
///
/// A result is applied only while the ticket generation matches the
/// instance generation; abort and resubmission both bump the generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTicket {
    /// Issuing instance
    pub instance_id: InstanceId,

    /// Instance generation at issue time
    pub generation: u64,

    /// Which call the ticket authorises
    pub phase: StagePhase,
}

/// A ticket the instance is waiting on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingStage {
    /// The outstanding ticket
    pub ticket: StageTicket,

    /// Whether the ticket was already handed to a runner
    pub claimed: bool,
}

/// Aggregate: Wizard instance
#[derive(Debug, Serialize, Deserialize)]
pub struct WizardInstance {
    /// Unique identifier
    pub id: InstanceId,

    /// Wizard definition ID
    pub wizard_id: WizardId,

    /// Current status
    pub status: WizardStatus,

    /// Index of the current step
    pub current_step: usize,

    /// Highest step index reached through a valid `next`
    pub highest_reached: usize,

    /// Accumulated field values across all steps
    pub values: FieldMap,

    /// Field errors from the last failed validation of their owning step
    pub errors: BTreeMap<String, String>,

    /// Bumped on every submission and on abort
    pub generation: u64,

    /// Stage ticket the instance waits on, if any
    pub pending: Option<PendingStage>,

    /// Submit stage succeeded and a confirmation code is expected
    pub awaiting_confirmation: bool,

    /// Set after a stage failure; the user may retry
    pub retryable: bool,

    /// Failure class of the last stage attempt
    pub last_error: Option<StageErrorKind>,

    /// Data returned by the submit stage
    pub stage_data: Option<Value>,

    /// Data returned by the stage call that completed the wizard
    pub output: Option<Value>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,

    /// Domain events
    #[serde(skip)]
    pub events: Vec<Box<dyn DomainEvent>>,
}

// Manually implement Clone for WizardInstance
impl Clone for WizardInstance {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            wizard_id: self.wizard_id.clone(),
            status: self.status,
            current_step: self.current_step,
            highest_reached: self.highest_reached,
            values: self.values.clone(),
            errors: self.errors.clone(),
            generation: self.generation,
            pending: self.pending.clone(),
            awaiting_confirmation: self.awaiting_confirmation,
            retryable: self.retryable,
            last_error: self.last_error,
            stage_data: self.stage_data.clone(),
            output: self.output.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            events: Vec::new(), // We don't clone domain events
        }
    }
}

impl WizardInstance {
    /// Create a new wizard instance positioned on the first step
    pub fn new(wizard_id: WizardId) -> Self {
        let id = InstanceId::generate();
        let now = Utc::now();

        let mut instance = Self {
            id: id.clone(),
            wizard_id: wizard_id.clone(),
            status: WizardStatus::InProgress,
            current_step: 0,
            highest_reached: 0,
            values: FieldMap::new(),
            errors: BTreeMap::new(),
            generation: 0,
            pending: None,
            awaiting_confirmation: false,
            retryable: false,
            last_error: None,
            stage_data: None,
            output: None,
            created_at: now,
            updated_at: now,
            events: Vec::with_capacity(8),
        };

        instance.record_event(Box::new(WizardStarted {
            instance_id: id,
            wizard_id,
            timestamp: now,
        }));

        instance
    }

    /// Whether the instance reached a terminal status
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, WizardStatus::Completed | WizardStatus::Aborted)
    }

    /// Whether a stage ticket is outstanding
    #[inline]
    pub fn has_pending_stage(&self) -> bool {
        self.pending.is_some()
    }

    /// Whether a ticket still matches this instance
    #[inline]
    pub fn accepts(&self, ticket: &StageTicket) -> bool {
        self.status == WizardStatus::AwaitingAsync
            && ticket.instance_id == self.id
            && ticket.generation == self.generation
            && self
                .pending
                .as_ref()
                .map_or(false, |p| p.ticket == *ticket)
    }

    /// Issue a new ticket; any earlier ticket becomes stale
    pub fn issue_ticket(&mut self, phase: StagePhase) -> StageTicket {
        self.generation += 1;
        let ticket = StageTicket {
            instance_id: self.id.clone(),
            generation: self.generation,
            phase,
        };
        self.pending = Some(PendingStage {
            ticket: ticket.clone(),
            claimed: false,
        });
        self.status = WizardStatus::AwaitingAsync;
        self.update_timestamp();
        ticket
    }

    /// Update the timestamp
    #[inline]
    pub fn update_timestamp(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Record a domain event
    pub fn record_event(&mut self, event: Box<dyn DomainEvent>) {
        self.events.push(event);
    }

    /// Get and clear all domain events
    pub fn take_events(&mut self) -> Vec<Box<dyn DomainEvent>> {
        std::mem::take(&mut self.events)
    }
}
