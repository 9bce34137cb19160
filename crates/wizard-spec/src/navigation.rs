use serde::{Deserialize, Serialize};

use crate::spec::wizard::{NavigationMode, WizardConfig};
use crate::state::WizardState;

/// Navigation affordances derived from configuration and state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationInfo {
    pub can_go_next: bool,
    pub can_go_previous: bool,
    /// `reachable[i]` answers "may the user jump to step `i` right now?".
    pub reachable: Vec<bool>,
    pub is_first_step: bool,
    pub is_last_step: bool,
    /// 1-based.
    pub current_step_number: usize,
    pub total_steps: usize,
    /// Settled (completed + skipped) share of all steps, 0..=100.
    pub progress: f64,
}

impl NavigationInfo {
    pub fn can_go_to_step(&self, index: usize) -> bool {
        self.reachable.get(index).copied().unwrap_or(false)
    }
}

pub fn navigation(config: &WizardConfig, state: &WizardState) -> NavigationInfo {
    let total_steps = config.steps.len();
    let current = state.current_step_index;
    let is_first_step = current == 0;
    let is_last_step = total_steps > 0 && current == total_steps - 1;

    let can_go_next = if is_last_step {
        false
    } else {
        match config.navigation_mode {
            NavigationMode::NonLinear => true,
            NavigationMode::Linear => config.steps.get(current).is_some_and(|step| {
                state.completed_steps.contains(&step.id)
                    || !state.has_errors(&step.id)
                    || step.optional
                    || step.skippable
            }),
        }
    };

    let can_go_previous = !is_first_step && config.allow_back_navigation;

    let reachable = (0..total_steps)
        .map(|index| can_go_to(config, current, index))
        .collect();

    NavigationInfo {
        can_go_next,
        can_go_previous,
        reachable,
        is_first_step,
        is_last_step,
        current_step_number: current + 1,
        total_steps,
        progress: progress(config, state),
    }
}

fn can_go_to(config: &WizardConfig, current: usize, index: usize) -> bool {
    if index >= config.steps.len() {
        return false;
    }
    if index == current {
        return true;
    }
    if index < current {
        return config.allow_back_navigation;
    }
    match config.navigation_mode {
        NavigationMode::NonLinear => true,
        NavigationMode::Linear => index == current + 1,
    }
}

pub fn progress(config: &WizardConfig, state: &WizardState) -> f64 {
    if config.steps.is_empty() {
        return 0.0;
    }
    let settled = state.completed_steps.len() + state.skipped_steps.len();
    (settled as f64 / config.steps.len() as f64 * 100.0).min(100.0)
}
