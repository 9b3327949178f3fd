//! Dependency graph over wizard modules
//!
//! Module status is never stored. It is derived on every read from the set
//! of completed modules, the explicit unlocks and the static dependency
//! edges.

use crate::domain::identifiers::ModuleId;
use crate::CoreError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Derived module status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleStatus {
    /// Prerequisites missing, or premium module not unlocked
    Locked,

    /// May be opened
    Available,

    /// Finished at least once in this session
    Completed,
}

/// A selectable module of the deal builder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    /// ID of the module
    pub id: ModuleId,

    /// Human-readable name
    pub name: String,

    /// Price charged when the module completes
    pub price: u64,

    /// Modules that must be completed first
    #[serde(default)]
    pub dependencies: Vec<ModuleId>,

    /// Whether the deal needs this module
    #[serde(default)]
    pub required: bool,

    /// Premium module that stays locked until explicitly unlocked
    #[serde(default)]
    pub locked_by_default: bool,
}

impl ModuleDescriptor {
    /// Create a module without dependencies
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: u64) -> Self {
        Self {
            id: ModuleId(id.into()),
            name: name.into(),
            price,
            dependencies: Vec::new(),
            required: false,
            locked_by_default: false,
        }
    }

    /// Add prerequisite modules
    pub fn depends_on(mut self, ids: &[&str]) -> Self {
        self.dependencies.extend(ids.iter().map(|id| ModuleId::from(*id)));
        self
    }

    /// Mark as required for the deal
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Keep locked until [`ModuleGraph::unlock`] is called
    pub fn locked_by_default(mut self) -> Self {
        self.locked_by_default = true;
        self
    }
}

/// The module graph and its completion state
#[derive(Debug, Clone)]
pub struct ModuleGraph {
    modules: Vec<ModuleDescriptor>,
    completed: Vec<ModuleId>,
    module_data: HashMap<ModuleId, Value>,
    unlocked: HashSet<ModuleId>,
}

impl ModuleGraph {
    /// Build a graph, rejecting duplicates, dangling edges and cycles
    pub fn new(modules: Vec<ModuleDescriptor>) -> Result<Self, CoreError> {
        let mut ids = HashSet::new();
        for module in &modules {
            if !ids.insert(&module.id) {
                return Err(CoreError::InvalidDefinition(format!(
                    "Duplicate module ID: {}",
                    module.id
                )));
            }
        }

        for module in &modules {
            for dep in &module.dependencies {
                if dep == &module.id {
                    return Err(CoreError::InvalidDefinition(format!(
                        "Module {} depends on itself",
                        module.id
                    )));
                }
                if !ids.contains(dep) {
                    return Err(CoreError::InvalidDefinition(format!(
                        "Module {} references non-existent dependency: {}",
                        module.id, dep
                    )));
                }
            }
        }

        check_for_cycles(&modules)?;

        Ok(Self {
            modules,
            completed: Vec::new(),
            module_data: HashMap::new(),
            unlocked: HashSet::new(),
        })
    }

    /// Modules in configuration order
    pub fn modules(&self) -> &[ModuleDescriptor] {
        &self.modules
    }

    /// Look up a module
    pub fn descriptor(&self, id: &ModuleId) -> Option<&ModuleDescriptor> {
        self.modules.iter().find(|m| &m.id == id)
    }

    /// Derived status of a module
    pub fn status_of(&self, id: &ModuleId) -> Result<ModuleStatus, CoreError> {
        let module = self
            .descriptor(id)
            .ok_or_else(|| CoreError::UnknownModule(id.to_string()))?;
        Ok(self.derive_status(module))
    }

    fn derive_status(&self, module: &ModuleDescriptor) -> ModuleStatus {
        if self.is_completed(&module.id) {
            return ModuleStatus::Completed;
        }
        if module.locked_by_default && !self.unlocked.contains(&module.id) {
            return ModuleStatus::Locked;
        }
        if module.dependencies.iter().all(|dep| self.is_completed(dep)) {
            ModuleStatus::Available
        } else {
            ModuleStatus::Locked
        }
    }

    /// Modules whose status is `Available`, in configuration order
    pub fn available_modules(&self) -> Vec<&ModuleDescriptor> {
        self.modules
            .iter()
            .filter(|m| self.derive_status(m) == ModuleStatus::Available)
            .collect()
    }

    /// Lift the premium lock; dependency gating still applies
    pub fn unlock(&mut self, id: &ModuleId) -> Result<(), CoreError> {
        if self.descriptor(id).is_none() {
            return Err(CoreError::UnknownModule(id.to_string()));
        }
        self.unlocked.insert(id.clone());
        debug!(module = %id, "Module unlocked");
        Ok(())
    }

    /// Mark a module completed and store its data
    ///
    /// Completing an already completed module replaces its data without
    /// duplicating it in the completion order. Returns true on first
    /// completion.
    pub fn complete(&mut self, id: &ModuleId, data: Value) -> Result<bool, CoreError> {
        let status = self.status_of(id)?;
        if status == ModuleStatus::Locked {
            return Err(CoreError::ModuleLocked(id.to_string()));
        }

        let first = status != ModuleStatus::Completed;
        if first {
            self.completed.push(id.clone());
        }
        self.module_data.insert(id.clone(), data);
        debug!(module = %id, first, "Module completed");
        Ok(first)
    }

    /// Whether the module completed
    #[inline]
    pub fn is_completed(&self, id: &ModuleId) -> bool {
        self.completed.contains(id)
    }

    /// Completed modules in completion order
    pub fn completed_modules(&self) -> &[ModuleId] {
        &self.completed
    }

    /// Data recorded for completed modules
    pub fn module_data(&self) -> &HashMap<ModuleId, Value> {
        &self.module_data
    }

    /// Sum of prices over completed modules
    pub fn total_cost(&self) -> u64 {
        self.completed
            .iter()
            .filter_map(|id| self.descriptor(id))
            .map(|m| m.price)
            .sum()
    }

    /// Required modules that are not completed yet
    pub fn missing_required(&self) -> Vec<ModuleId> {
        self.modules
            .iter()
            .filter(|m| m.required && !self.is_completed(&m.id))
            .map(|m| m.id.clone())
            .collect()
    }
}

/// Check for cycles in the module dependencies
fn check_for_cycles(modules: &[ModuleDescriptor]) -> Result<(), CoreError> {
    let dep_map: HashMap<&str, &Vec<ModuleId>> = modules
        .iter()
        .map(|m| (m.id.as_str(), &m.dependencies))
        .collect();

    let mut visited = HashSet::new();
    let mut rec_stack = HashSet::new();

    for module in modules {
        if is_cyclic(module.id.as_str(), &dep_map, &mut visited, &mut rec_stack) {
            return Err(CoreError::InvalidDefinition(format!(
                "Cycle detected in module dependencies involving module: {}",
                module.id
            )));
        }
    }

    Ok(())
}

fn is_cyclic<'a>(
    id: &'a str,
    dep_map: &HashMap<&'a str, &'a Vec<ModuleId>>,
    visited: &mut HashSet<&'a str>,
    rec_stack: &mut HashSet<&'a str>,
) -> bool {
    if visited.insert(id) {
        rec_stack.insert(id);

        if let Some(&deps) = dep_map.get(id) {
            for dep in deps {
                let dep = dep.as_str();
                if rec_stack.contains(dep) || is_cyclic(dep, dep_map, visited, rec_stack) {
                    return true;
                }
            }
        }
    }

    rec_stack.remove(id);
    false
}
