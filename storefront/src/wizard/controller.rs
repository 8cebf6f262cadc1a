// Wizard controller: current step index and bounded navigation.
//
// Navigation never validates. The view layer checks the current step's fields before calling
// `go_next`; tab jumps (`go_to`) are deliberately ungated.

use super::step::StepDefinition;
use log::debug;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardBuildError {
    #[error("a wizard needs at least one step")]
    NoSteps,
    #[error("step at position {position} has ordinal {ordinal}; ordinals must run 1..N in order")]
    BadOrdinal { position: usize, ordinal: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NavError {
    #[error("step {requested} is outside 1..={count}")]
    OutOfRange { requested: usize, count: usize },
}

/// Result of a navigation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepChange {
    Unchanged,
    Moved {
        from: usize,
        to: usize,
        /// The host should scroll the content panel back to the top.
        scroll_to_top: bool,
    },
}

impl StepChange {
    pub fn moved(&self) -> bool {
        matches!(self, StepChange::Moved { .. })
    }
}

/// Signal handed to the host on cancel: drop the form and navigate away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelSignal;

#[derive(Debug, Clone)]
pub struct WizardController {
    steps: Vec<StepDefinition>,
    current: usize,
}

impl WizardController {
    pub fn new(steps: Vec<StepDefinition>) -> Result<Self, WizardBuildError> {
        if steps.is_empty() {
            return Err(WizardBuildError::NoSteps);
        }
        for (i, s) in steps.iter().enumerate() {
            if s.ordinal != i + 1 {
                return Err(WizardBuildError::BadOrdinal {
                    position: i + 1,
                    ordinal: s.ordinal,
                });
            }
        }
        Ok(Self { steps, current: 1 })
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    pub fn current_step(&self) -> &StepDefinition {
        // `current` is always in 1..=N.
        &self.steps[self.current - 1]
    }

    pub fn is_first(&self) -> bool {
        self.current == 1
    }

    pub fn is_last(&self) -> bool {
        self.current == self.steps.len()
    }

    pub fn go_next(&mut self) -> StepChange {
        if self.is_last() {
            return StepChange::Unchanged;
        }
        let from = self.current;
        self.current += 1;
        debug!("[PHASE: wizard] [STEP: next] {} -> {}", from, self.current);
        StepChange::Moved {
            from,
            to: self.current,
            scroll_to_top: true,
        }
    }

    pub fn go_previous(&mut self) -> StepChange {
        if self.is_first() {
            return StepChange::Unchanged;
        }
        let from = self.current;
        self.current -= 1;
        debug!("[PHASE: wizard] [STEP: previous] {} -> {}", from, self.current);
        StepChange::Moved {
            from,
            to: self.current,
            scroll_to_top: false,
        }
    }

    /// Direct jump (tab click). No validation gate.
    pub fn go_to(&mut self, step: usize) -> Result<StepChange, NavError> {
        let count = self.steps.len();
        if step == 0 || step > count {
            return Err(NavError::OutOfRange {
                requested: step,
                count,
            });
        }
        if step == self.current {
            return Ok(StepChange::Unchanged);
        }
        let from = self.current;
        self.current = step;
        debug!("[PHASE: wizard] [STEP: jump] {} -> {}", from, step);
        Ok(StepChange::Moved {
            from,
            to: step,
            scroll_to_top: true,
        })
    }

    pub fn cancel(&self) -> CancelSignal {
        debug!("[PHASE: wizard] [STEP: cancel] cancel at step {}", self.current);
        CancelSignal
    }
}
