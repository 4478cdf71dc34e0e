// Selection controller - which vessel the operator is focused on
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "vessel_id", rename_all = "snake_case")]
pub enum Selection {
    #[default]
    Unselected,
    Selected(String),
}

/// What a selection call did, so the owner knows whether to reset history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionChange {
    Unchanged,
    AutoSelected,
    Switched,
}

#[derive(Debug, Default)]
pub struct SelectionController {
    state: Selection,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&str> {
        match &self.state {
            Selection::Unselected => None,
            Selection::Selected(id) => Some(id.as_str()),
        }
    }

    pub fn state(&self) -> &Selection {
        &self.state
    }

    /// Called for every ingested record. Only the first one seen while
    /// unselected picks the vessel; afterwards only the operator can.
    pub fn observe(&mut self, vessel_id: &str) -> SelectionChange {
        if self.state != Selection::Unselected {
            return SelectionChange::Unchanged;
        }
        self.state = Selection::Selected(vessel_id.to_string());
        SelectionChange::AutoSelected
    }

    /// Operator-driven selection. Picking the current vessel again is a no-op.
    pub fn select(&mut self, vessel_id: &str) -> SelectionChange {
        if self.current() == Some(vessel_id) {
            return SelectionChange::Unchanged;
        }
        self.state = Selection::Selected(vessel_id.to_string());
        SelectionChange::Switched
    }
}
