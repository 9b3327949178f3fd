use crate::domain::identifiers::ModuleId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Snapshot of a finalised workflow session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowResult {
    /// Session the snapshot belongs to
    pub session_id: String,

    /// Completed modules in completion order
    pub completed_modules: Vec<ModuleId>,

    /// Result blob per completed module
    pub module_data: BTreeMap<ModuleId, Value>,

    /// Sum of prices over `completed_modules`
    pub total_cost: u64,

    /// Required modules that were not completed
    pub missing_required: Vec<ModuleId>,

    /// When the snapshot was taken
    pub completed_at: DateTime<Utc>,
}

impl WorkflowResult {
    /// Whether every required module completed
    pub fn is_complete(&self) -> bool {
        self.missing_required.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serializes_with_camel_case_keys() {
        let mut module_data = BTreeMap::new();
        module_data.insert(ModuleId::from("scoring"), json!({"score": 742}));

        let result = WorkflowResult {
            session_id: "s-1".to_string(),
            completed_modules: vec![ModuleId::from("scoring")],
            module_data,
            total_cost: 500,
            missing_required: vec![ModuleId::from("contract")],
            completed_at: Utc::now(),
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["completedModules"], json!(["scoring"]));
        assert_eq!(json["moduleData"]["scoring"]["score"], 742);
        assert_eq!(json["totalCost"], 500);
        assert!(!result.is_complete());
    }
}
