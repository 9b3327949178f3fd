//! Async stage runner
//!
//! Wraps the external provider call that concludes a wizard. Every provider
//! failure is converted to a [`StageErrorKind`] here, a configurable
//! timeout bounds the wait, and at most one call per wizard instance may be
//! in flight.

use crate::domain::identifiers::InstanceId;
use crate::domain::wizard_instance::StageTicket;
use crate::types::FieldMap;
use crate::{CoreError, MosaicConfig, ProviderError, StageErrorKind};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Result of one stage call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageResult {
    /// Provider call succeeded
    Ok {
        /// Provider payload
        data: Value,
    },

    /// Provider call failed
    Failed {
        /// Failure class
        error_kind: StageErrorKind,
    },
}

impl StageResult {
    /// Whether the call succeeded
    #[inline]
    pub fn is_ok(&self) -> bool {
        matches!(self, StageResult::Ok { .. })
    }
}

/// The external action that concludes a wizard
///
/// Implementations adapt a provider to the accumulated wizard values.
#[async_trait]
pub trait WizardStage: Send + Sync {
    /// Call issued when the last step is submitted
    async fn execute(&self, values: &FieldMap) -> Result<Value, ProviderError>;

    /// Call issued after a confirmation code passes validation
    ///
    /// `dispatch` is the data returned by [`WizardStage::execute`].
    async fn confirm(&self, _values: &FieldMap, _dispatch: &Value) -> Result<Value, ProviderError> {
        Err(ProviderError::Rejected(
            "stage has no confirmation call".to_string(),
        ))
    }
}

/// Runs stage calls with a timeout and a per-instance in-flight guard
#[derive(Debug, Clone)]
pub struct AsyncStageRunner {
    timeout: Duration,
    in_flight: Arc<DashMap<InstanceId, u64>>,
}

struct InFlightGuard {
    in_flight: Arc<DashMap<InstanceId, u64>>,
    instance_id: InstanceId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.remove(&self.instance_id);
    }
}

impl AsyncStageRunner {
    /// Create a runner with the given timeout
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Create a runner from configuration
    pub fn from_config(config: &MosaicConfig) -> Self {
        Self::new(config.stage_timeout())
    }

    /// Configured timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether a call for the instance is in flight
    pub fn is_running(&self, instance_id: &InstanceId) -> bool {
        self.in_flight.contains_key(instance_id)
    }

    fn acquire(&self, ticket: &StageTicket) -> Result<InFlightGuard, CoreError> {
        match self.in_flight.entry(ticket.instance_id.clone()) {
            Entry::Occupied(_) => {
                return Err(CoreError::StageAlreadyRunning(ticket.instance_id.to_string()));
            }
            Entry::Vacant(slot) => {
                slot.insert(ticket.generation);
            }
        }
        Ok(InFlightGuard {
            in_flight: self.in_flight.clone(),
            instance_id: ticket.instance_id.clone(),
        })
    }

    /// Run a provider call for the ticket's instance
    ///
    /// Returns `Err(StageAlreadyRunning)` without polling `call` when another
    /// call for the same instance has not finished yet. Every other outcome,
    /// including timeouts, is an `Ok(StageResult)`.
    pub async fn run<F, T>(&self, ticket: &StageTicket, call: F) -> Result<StageResult, CoreError>
    where
        F: Future<Output = Result<T, ProviderError>>,
        T: Serialize,
    {
        let _guard = match self.acquire(ticket) {
            Ok(guard) => guard,
            Err(e) => {
                warn!(instance = %ticket.instance_id, "Rejected concurrent stage call");
                return Err(e);
            }
        };

        debug!(
            instance = %ticket.instance_id,
            generation = ticket.generation,
            phase = ?ticket.phase,
            timeout_ms = self.timeout.as_millis() as u64,
            "Stage call started"
        );

        let result = match tokio::time::timeout(self.timeout, call).await {
            Err(_) => {
                warn!(instance = %ticket.instance_id, "Stage call timed out");
                StageResult::Failed {
                    error_kind: StageErrorKind::Timeout,
                }
            }
            Ok(Err(e)) => {
                warn!(instance = %ticket.instance_id, error = %e, "Stage call failed");
                StageResult::Failed {
                    error_kind: e.into(),
                }
            }
            Ok(Ok(payload)) => match serde_json::to_value(payload) {
                Ok(data) => {
                    info!(instance = %ticket.instance_id, phase = ?ticket.phase, "Stage call succeeded");
                    StageResult::Ok { data }
                }
                Err(e) => {
                    warn!(instance = %ticket.instance_id, error = %e, "Stage payload not serializable");
                    StageResult::Failed {
                        error_kind: StageErrorKind::InvalidResponse,
                    }
                }
            },
        };

        Ok(result)
    }
}
