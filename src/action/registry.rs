// registry.rs
// Ordered collection of named step actions. Actions are immutable after
// registration and owned by the registry for the lifetime of a run.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{ActionError, SetupError};
use crate::params::CoreParams;
use crate::track::state::TrackStateArray;

/// Identifier of one registered action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActionId(pub u32);

/// Execution stage of an action within one step iteration.
///
/// The derived `Ord` is the pipeline order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActionOrder {
    /// Fill empty slots from the pending-initializer queue
    TrackInit,
    /// Reset step state and propose discrete step limits
    PreStep,
    /// Propagate, slow down, and limit with MSC (exactly one per run)
    AlongStep,
    /// Sample which discrete process fires
    PostStepSelect,
    /// Apply interaction models and stage secondaries
    PostStepInteract,
}

impl ActionOrder {
    pub fn label(&self) -> &'static str {
        match self {
            ActionOrder::TrackInit => "track-init",
            ActionOrder::PreStep => "pre-step",
            ActionOrder::AlongStep => "along-step",
            ActionOrder::PostStepSelect => "post-step-select",
            ActionOrder::PostStepInteract => "post-step-interact",
        }
    }
}

/// One named, ordered transformation stage of the step iteration.
///
/// `execute` mutates track slots in place; per-slot failures are aggregated
/// into a single `ActionError` after the full slot range is processed.
pub trait Action: Send + Sync {
    fn id(&self) -> ActionId;
    fn label(&self) -> &str;
    fn description(&self) -> &str;
    fn order(&self) -> ActionOrder;
    fn execute(&self, params: &CoreParams, state: &mut TrackStateArray) -> Result<(), ActionError>;
}

/// Owner of all actions for one run.
#[derive(Default)]
pub struct ActionRegistry {
    actions: Vec<Arc<dyn Action>>,
    ids_by_label: HashMap<String, ActionId>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id the next inserted action must carry.
    pub fn next_id(&self) -> ActionId {
        ActionId(self.actions.len() as u32)
    }

    /// Register an action; ids must be contiguous and labels unique.
    pub fn insert(&mut self, action: Arc<dyn Action>) -> Result<ActionId, SetupError> {
        let expected = self.next_id();
        if action.id() != expected {
            return Err(SetupError::NonContiguousActionId {
                given: action.id().0,
                expected: expected.0,
            });
        }
        let label = action.label().to_string();
        if self.ids_by_label.contains_key(&label) {
            return Err(SetupError::DuplicateLabel(label));
        }
        self.ids_by_label.insert(label, expected);
        self.actions.push(action);
        Ok(expected)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn actions(&self) -> &[Arc<dyn Action>] {
        &self.actions
    }

    pub fn find(&self, label: &str) -> Option<ActionId> {
        self.ids_by_label.get(label).copied()
    }

    pub fn action(&self, id: ActionId) -> Option<&Arc<dyn Action>> {
        self.actions.get(id.0 as usize)
    }

    /// Diagnostic JSON listing of all registered actions.
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "label": self.actions.iter().map(|a| a.label()).collect::<Vec<_>>(),
            "description": self.actions.iter().map(|a| a.description()).collect::<Vec<_>>(),
            "order": self.actions.iter().map(|a| a.order().label()).collect::<Vec<_>>(),
        })
    }
}
