//! # Managed Resource Status
//!
//! Status types shared by every managed resource, and the `Ready`/`Synced`
//! conditions the driver writes into them.

use serde::{Deserialize, Serialize};

/// Condition type reporting whether the external object is usable
pub const CONDITION_READY: &str = "Ready";

/// Condition type reporting whether the last reconcile succeeded
pub const CONDITION_SYNCED: &str = "Synced";

/// Status of a managed resource
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceStatus {
    /// Conditions represent the latest available observations
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Generation of the spec the conditions were computed from
    #[serde(default)]
    pub observed_generation: Option<i64>,
}

impl ResourceStatus {
    /// Find a condition by type
    pub fn condition(&self, type_: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.r#type == type_)
    }

    /// Insert or replace a condition, keeping the original transition time
    /// when the status value did not change
    pub fn set_condition(&mut self, mut condition: Condition) {
        match self.conditions.iter_mut().find(|c| c.r#type == condition.r#type) {
            Some(existing) => {
                if existing.status == condition.status {
                    condition
                        .last_transition_time
                        .clone_from(&existing.last_transition_time);
                }
                *existing = condition;
            }
            None => self.conditions.push(condition),
        }
    }
}

/// Condition represents a condition of a resource
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    pub r#type: String,
    /// Status of the condition (True, False, Unknown)
    pub status: String,
    /// Last transition time
    #[serde(default)]
    pub last_transition_time: Option<String>,
    /// Reason for the condition
    #[serde(default)]
    pub reason: Option<String>,
    /// Message describing the condition
    #[serde(default)]
    pub message: Option<String>,
}

impl Condition {
    fn new(type_: &str, status: bool, reason: &str, message: Option<String>) -> Self {
        Self {
            r#type: type_.to_string(),
            status: if status { "True" } else { "False" }.to_string(),
            last_transition_time: Some(chrono::Utc::now().to_rfc3339()),
            reason: Some(reason.to_string()),
            message,
        }
    }

    /// The external resource exists and matches the desired state
    pub fn available() -> Self {
        Self::new(CONDITION_READY, true, "Available", None)
    }

    /// The external resource was just created and has not been observed yet
    pub fn creating() -> Self {
        Self::new(CONDITION_READY, false, "Creating", None)
    }

    /// The external resource is being removed
    pub fn deleting() -> Self {
        Self::new(CONDITION_READY, false, "Deleting", None)
    }

    /// The last reconcile completed without error
    pub fn reconcile_success() -> Self {
        Self::new(CONDITION_SYNCED, true, "ReconcileSuccess", None)
    }

    /// The last reconcile failed
    pub fn reconcile_error(message: impl Into<String>) -> Self {
        Self::new(CONDITION_SYNCED, false, "ReconcileError", Some(message.into()))
    }

    pub fn is_true(&self) -> bool {
        self.status == "True"
    }
}
