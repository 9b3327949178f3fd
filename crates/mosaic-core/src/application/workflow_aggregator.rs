//! Workflow aggregator
//!
//! Collects the results of completed module wizards for one session and
//! produces the final [`WorkflowResult`].

use crate::domain::identifiers::ModuleId;
use crate::domain::module_graph::{ModuleGraph, ModuleStatus};
use crate::domain::workflow_result::WorkflowResult;
use crate::CoreError;
use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{info, warn};
use uuid::Uuid;

/// Aggregates module results for one session
#[derive(Debug, Clone)]
pub struct WorkflowAggregator {
    session_id: String,
    graph: ModuleGraph,
    delivered: Option<WorkflowResult>,
}

impl WorkflowAggregator {
    /// Create an aggregator with a fresh session id
    pub fn new(graph: ModuleGraph) -> Self {
        Self::with_session_id(Uuid::new_v4().to_string(), graph)
    }

    /// Create an aggregator for a known session id
    pub fn with_session_id(session_id: impl Into<String>, graph: ModuleGraph) -> Self {
        Self {
            session_id: session_id.into(),
            graph,
            delivered: None,
        }
    }

    /// Session id
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// The module graph
    pub fn graph(&self) -> &ModuleGraph {
        &self.graph
    }

    /// Status of a module
    pub fn status_of(&self, id: &ModuleId) -> Result<ModuleStatus, CoreError> {
        self.graph.status_of(id)
    }

    /// Explicitly unlock a module that is locked by default
    pub fn unlock(&mut self, id: &ModuleId) -> Result<(), CoreError> {
        self.graph.unlock(id)
    }

    /// Record a module result
    ///
    /// A repeated completion replaces the stored data; the module is counted
    /// once in the completion order and in the total cost.
    pub fn record(&mut self, id: &ModuleId, data: Value) -> Result<bool, CoreError> {
        let first = self.graph.complete(id, data)?;
        if first {
            info!(
                session = %self.session_id,
                module = %id,
                total_cost = self.graph.total_cost(),
                "Module result recorded"
            );
        } else {
            warn!(session = %self.session_id, module = %id, "Module completed again, data replaced");
        }
        Ok(first)
    }

    /// Completed modules in completion order
    pub fn completed_modules(&self) -> &[ModuleId] {
        self.graph.completed_modules()
    }

    /// Sum of prices over completed modules
    pub fn total_cost(&self) -> u64 {
        self.graph.total_cost()
    }

    /// Required modules that are not completed yet
    pub fn missing_required(&self) -> Vec<ModuleId> {
        self.graph.missing_required()
    }

    /// Stored result for a module
    pub fn module_data(&self, id: &ModuleId) -> Option<&Value> {
        self.graph.module_data().get(id)
    }

    /// Snapshot the session
    ///
    /// May be called repeatedly; every call reflects the current state. The
    /// first snapshot is kept as the delivered result.
    pub fn finalize(&mut self) -> WorkflowResult {
        let module_data: BTreeMap<ModuleId, Value> = self
            .graph
            .module_data()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let result = WorkflowResult {
            session_id: self.session_id.clone(),
            completed_modules: self.graph.completed_modules().to_vec(),
            module_data,
            total_cost: self.graph.total_cost(),
            missing_required: self.graph.missing_required(),
            completed_at: Utc::now(),
        };

        if self.delivered.is_none() {
            self.delivered = Some(result.clone());
        }

        info!(
            session = %self.session_id,
            modules = result.completed_modules.len(),
            total_cost = result.total_cost,
            complete = result.is_complete(),
            "Workflow finalized"
        );
        result
    }

    /// First finalized result, if any
    pub fn delivered(&self) -> Option<&WorkflowResult> {
        self.delivered.as_ref()
    }
}
