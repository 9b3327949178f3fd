//! Workflow session
//!
//! Ties module wizards to the module graph: a wizard can only be opened for
//! an unlocked module, its stage runs through the shared
//! [`AsyncStageRunner`], and a completed wizard is recorded in the
//! [`WorkflowAggregator`].

use crate::application::stage_runner::{AsyncStageRunner, StageResult, WizardStage};
use crate::application::wizard_controller::{Resolution, WizardController};
use crate::application::workflow_aggregator::WorkflowAggregator;
use crate::domain::identifiers::ModuleId;
use crate::domain::module_graph::{ModuleGraph, ModuleStatus};
use crate::domain::validation::{DefaultStepValidator, StepValidator};
use crate::domain::wizard_definition::WizardDefinition;
use crate::domain::wizard_instance::{StagePhase, StageTicket, WizardStatus};
use crate::domain::workflow_result::WorkflowResult;
use crate::CoreError;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tracing::{info, warn};

/// Definition and stage for one module
#[derive(Clone)]
pub struct WizardKit {
    /// Wizard steps
    pub definition: Arc<WizardDefinition>,

    /// External action run on submit
    pub stage: Arc<dyn WizardStage>,
}

impl WizardKit {
    /// Pair a definition with its stage
    pub fn new(definition: WizardDefinition, stage: Arc<dyn WizardStage>) -> Self {
        Self {
            definition: Arc::new(definition),
            stage,
        }
    }
}

/// A wizard opened for a module
pub struct ModuleWizard {
    module_id: ModuleId,
    controller: WizardController,
    stage: Arc<dyn WizardStage>,
}

impl ModuleWizard {
    /// Module this wizard completes
    pub fn module_id(&self) -> &ModuleId {
        &self.module_id
    }
}

impl Deref for ModuleWizard {
    type Target = WizardController;

    fn deref(&self) -> &Self::Target {
        &self.controller
    }
}

impl DerefMut for ModuleWizard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.controller
    }
}

/// Result of a dispatched stage call, to be passed to [`WorkflowSession::settle`]
#[derive(Debug)]
pub struct StageOutcome {
    /// Ticket the call ran for
    pub ticket: StageTicket,

    /// Runner result
    pub result: Result<StageResult, CoreError>,
}

/// Stage call detached from the session
pub type PendingCall = BoxFuture<'static, StageOutcome>;

/// One deal-building session
pub struct WorkflowSession {
    aggregator: WorkflowAggregator,
    kits: HashMap<ModuleId, WizardKit>,
    validator: Arc<dyn StepValidator>,
    runner: AsyncStageRunner,
}

impl WorkflowSession {
    /// Create a session over a module graph
    pub fn new(graph: ModuleGraph, runner: AsyncStageRunner) -> Self {
        Self {
            aggregator: WorkflowAggregator::new(graph),
            kits: HashMap::new(),
            validator: Arc::new(DefaultStepValidator),
            runner,
        }
    }

    /// Replace the step validator
    pub fn with_validator(mut self, validator: Arc<dyn StepValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// Session id
    pub fn id(&self) -> &str {
        self.aggregator.session_id()
    }

    /// The aggregator
    pub fn aggregator(&self) -> &WorkflowAggregator {
        &self.aggregator
    }

    /// Mutable aggregator, e.g. to unlock premium modules
    pub fn aggregator_mut(&mut self) -> &mut WorkflowAggregator {
        &mut self.aggregator
    }

    /// Stage runner
    pub fn runner(&self) -> &AsyncStageRunner {
        &self.runner
    }

    /// Register the wizard for a module
    pub fn register(&mut self, module: impl Into<ModuleId>, kit: WizardKit) -> Result<(), CoreError> {
        let module = module.into();
        if self.aggregator.graph().descriptor(&module).is_none() {
            return Err(CoreError::UnknownModule(module.to_string()));
        }
        kit.definition.validate()?;
        info!(module = %module, wizard = %kit.definition.id, "Registered wizard");
        self.kits.insert(module, kit);
        Ok(())
    }

    /// Status of a module
    pub fn module_status(&self, module: &ModuleId) -> Result<ModuleStatus, CoreError> {
        self.aggregator.status_of(module)
    }

    /// Open a wizard for a module
    ///
    /// Locked modules are refused. A completed module may be opened again;
    /// its new result replaces the old one.
    pub fn open(&self, module: &ModuleId) -> Result<ModuleWizard, CoreError> {
        if self.aggregator.status_of(module)? == ModuleStatus::Locked {
            warn!(module = %module, "Refusing to open locked module");
            return Err(CoreError::ModuleLocked(module.to_string()));
        }
        let kit = self
            .kits
            .get(module)
            .ok_or_else(|| CoreError::UnknownWizard(module.to_string()))?;

        let controller = WizardController::new(kit.definition.clone(), self.validator.clone())?;
        info!(module = %module, instance = %controller.instance().id, "Opened module wizard");
        Ok(ModuleWizard {
            module_id: module.clone(),
            controller,
            stage: kit.stage.clone(),
        })
    }

    /// Start the outstanding stage call of a wizard
    ///
    /// The returned future owns everything it needs, so the wizard stays
    /// usable (e.g. for `abort`) while the call is in flight.
    pub fn dispatch(&self, wizard: &mut ModuleWizard) -> Result<PendingCall, CoreError> {
        let ticket = wizard.controller.claim_stage()?;
        let values = wizard.controller.values().clone();
        let dispatch_data = wizard.controller.stage_data().cloned().unwrap_or(Value::Null);
        let stage = wizard.stage.clone();
        let runner = self.runner.clone();

        Ok(async move {
            let result = match ticket.phase {
                StagePhase::Submit => runner.run(&ticket, stage.execute(&values)).await,
                StagePhase::Confirm => {
                    runner
                        .run(&ticket, stage.confirm(&values, &dispatch_data))
                        .await
                }
            };
            StageOutcome { ticket, result }
        }
        .boxed())
    }

    /// Apply a finished stage call
    ///
    /// A completed wizard is recorded in the aggregator. Stale outcomes
    /// change nothing.
    pub fn settle(
        &mut self,
        wizard: &mut ModuleWizard,
        outcome: StageOutcome,
    ) -> Result<Resolution, CoreError> {
        let result = match outcome.result {
            Ok(result) => result,
            Err(e) => {
                warn!(module = %wizard.module_id, error = %e, "Stage call was not executed");
                return Err(e);
            }
        };

        let resolution = wizard.controller.resolve(&outcome.ticket, result);
        if let Resolution::Completed(data) = &resolution {
            self.aggregator.record(&wizard.module_id, data.clone())?;
        }
        Ok(resolution)
    }

    /// Dispatch and settle in one call
    pub async fn run_stage(&mut self, wizard: &mut ModuleWizard) -> Result<Resolution, CoreError> {
        let call = self.dispatch(wizard)?;
        let outcome = call.await;
        self.settle(wizard, outcome)
    }

    /// Walk the remaining steps with the values already set, then run the stage
    ///
    /// Fails with `InvalidTransition` naming the first step that does not
    /// validate; the wizard stays on that step with its errors set.
    pub async fn run_to_completion(
        &mut self,
        wizard: &mut ModuleWizard,
    ) -> Result<Resolution, CoreError> {
        while wizard.status() == WizardStatus::InProgress {
            if !wizard.next() {
                let step = wizard.current_step().id.clone();
                let fields: Vec<&str> = wizard.errors().keys().map(String::as_str).collect();
                return Err(CoreError::InvalidTransition(format!(
                    "step {} rejected: {}",
                    step,
                    fields.join(", ")
                )));
            }
        }
        self.run_stage(wizard).await
    }

    /// Submit a confirmation code and run the confirm call
    ///
    /// `Ok(None)` means the code failed local validation and no call was made.
    pub async fn confirm(
        &mut self,
        wizard: &mut ModuleWizard,
        code: Value,
    ) -> Result<Option<Resolution>, CoreError> {
        if !wizard.confirm(code)? {
            return Ok(None);
        }
        self.run_stage(wizard).await.map(Some)
    }

    /// Snapshot the session result
    pub fn finalize(&mut self) -> WorkflowResult {
        self.aggregator.finalize()
    }
}
