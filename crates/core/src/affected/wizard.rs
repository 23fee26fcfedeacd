//! Selection step of the disruption wizard.
//!
//! `Empty → Populating → Valid → Submitted`, with `reset` returning to `Empty`
//! from anywhere. Only user actions move between states.

use strum::Display;

use super::AffectedEntitySet;

pub const DEFAULT_MAX_AFFECTED_ENTITIES: usize = 200;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum SelectionPhase {
    Empty,
    Populating,
    Valid,
    Submitted,
}

/// Why the wizard cannot move on. Shown to the operator, never raised as a panic.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SelectionWarning {
    #[error("Select at least one route or stop to continue.")]
    NothingSelected,

    #[error(
        "{total} routes and stops are selected, which is more than the maximum of {max}. \
         Remove some of them to continue."
    )]
    TooManyEntities { total: usize, max: usize },

    #[error("Cannot {action} a selection that is {phase}.")]
    InvalidTransition { action: &'static str, phase: SelectionPhase },
}

#[derive(Clone, Debug, PartialEq)]
pub struct SelectionStep {
    entities: AffectedEntitySet,
    phase: SelectionPhase,
    max_entities: usize,
}

impl SelectionStep {
    pub fn new(max_entities: usize) -> Self {
        Self {
            entities: AffectedEntitySet::new(),
            phase: SelectionPhase::Empty,
            max_entities,
        }
    }

    /// Starts from an existing selection, e.g. when editing a saved disruption
    pub fn with_entities(entities: AffectedEntitySet, max_entities: usize) -> Self {
        Self {
            phase: phase_of(&entities),
            entities,
            max_entities,
        }
    }

    pub fn entities(&self) -> &AffectedEntitySet {
        &self.entities
    }

    pub fn phase(&self) -> SelectionPhase {
        self.phase
    }

    pub fn max_entities(&self) -> usize {
        self.max_entities
    }

    /// Replaces the selection with the result of a reconciliation pass.
    pub fn edit(
        &mut self,
        reconcile: impl FnOnce(&AffectedEntitySet) -> AffectedEntitySet,
    ) -> Result<(), SelectionWarning> {
        if self.phase == SelectionPhase::Submitted {
            return Err(SelectionWarning::InvalidTransition {
                action: "edit",
                phase: self.phase,
            });
        }

        self.entities = reconcile(&self.entities);
        self.phase = phase_of(&self.entities);
        Ok(())
    }

    /// Checks the selection without changing state
    pub fn check(&self) -> Result<(), SelectionWarning> {
        let total = self.entities.total_entities();
        if total == 0 {
            return Err(SelectionWarning::NothingSelected);
        }
        if total > self.max_entities {
            return Err(SelectionWarning::TooManyEntities {
                total,
                max: self.max_entities,
            });
        }
        Ok(())
    }

    /// The "continue" action
    pub fn validate(&mut self) -> Result<(), SelectionWarning> {
        if self.phase == SelectionPhase::Submitted {
            return Err(SelectionWarning::InvalidTransition {
                action: "validate",
                phase: self.phase,
            });
        }
        self.check()?;
        self.phase = SelectionPhase::Valid;
        Ok(())
    }

    /// Hands the selection over for conversion into a payload
    pub fn submit(&mut self) -> Result<AffectedEntitySet, SelectionWarning> {
        if self.phase != SelectionPhase::Valid {
            return Err(SelectionWarning::InvalidTransition {
                action: "submit",
                phase: self.phase,
            });
        }
        self.phase = SelectionPhase::Submitted;
        Ok(self.entities.clone())
    }

    pub fn reset(&mut self) {
        self.entities = AffectedEntitySet::new();
        self.phase = SelectionPhase::Empty;
    }
}

fn phase_of(entities: &AffectedEntitySet) -> SelectionPhase {
    if entities.is_empty() {
        SelectionPhase::Empty
    } else {
        SelectionPhase::Populating
    }
}

impl Default for SelectionStep {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_AFFECTED_ENTITIES)
    }
}
