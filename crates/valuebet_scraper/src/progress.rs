//! Strukturované progress eventy orchestrátoru.
//! Prezentační vrstva si z `Stage` + čísel poskládá text sama.

use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::warn;

pub const STAGES_PER_ATTEMPT: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    AttemptStarted,
    LaunchingBrowser,
    Navigating,
    Extracting,
    Normalizing,
    AttemptFailed,
    Completed,
    Failed,
}

impl Stage {
    /// Pozice v rámci jednoho pokusu (1-based); terminální stavy žádnou nemají
    fn offset(self) -> Option<u32> {
        match self {
            Stage::AttemptStarted => Some(1),
            Stage::LaunchingBrowser => Some(2),
            Stage::Navigating => Some(3),
            Stage::Extracting => Some(4),
            Stage::Normalizing => Some(5),
            Stage::AttemptFailed => Some(6),
            Stage::Completed | Stage::Failed => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::AttemptStarted => "Starting scrape attempt",
            Stage::LaunchingBrowser => "Launching browser",
            Stage::Navigating => "Navigating to value bets",
            Stage::Extracting => "Extracting data",
            Stage::Normalizing => "Processing data",
            Stage::AttemptFailed => "Attempt failed",
            Stage::Completed => "Completed",
            Stage::Failed => "All attempts failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub stage:        Stage,
    pub step:         u32,
    pub total_steps:  u32,
    pub attempt:      u32,
    pub max_attempts: u32,
    pub detail:       Option<String>,
}

impl ProgressEvent {
    /// Step je v rámci jednoho běhu striktně rostoucí; terminální event má step == total
    pub fn new(stage: Stage, attempt: u32, max_attempts: u32, detail: Option<String>) -> Self {
        let total_steps = max_attempts.saturating_mul(STAGES_PER_ATTEMPT).saturating_add(1);
        let step = match stage.offset() {
            Some(offset) => attempt
                .saturating_sub(1)
                .saturating_mul(STAGES_PER_ATTEMPT)
                .saturating_add(offset)
                .min(total_steps),
            None => total_steps,
        };
        Self {
            stage,
            step,
            total_steps,
            attempt,
            max_attempts,
            detail,
        }
    }

    pub fn fraction(&self) -> f32 {
        if self.total_steps == 0 {
            return 0.0;
        }
        self.step as f32 / self.total_steps as f32
    }
}

pub trait ProgressSink {
    fn on_progress(&self, event: &ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressEvent),
{
    fn on_progress(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// Sink, který nic nedělá
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

/// Callback je jen advisory: panika uvnitř se zaloguje a pipeline jede dál
pub(crate) fn emit<P: ProgressSink + ?Sized>(sink: &P, event: ProgressEvent) {
    if catch_unwind(AssertUnwindSafe(|| sink.on_progress(&event))).is_err() {
        warn!("Progress callback panicked at step {} ({:?}), ignoring", event.step, event.stage);
    }
}
