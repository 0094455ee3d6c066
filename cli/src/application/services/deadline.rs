//! Workflow deadline: one budget and one cancellation token shared by every
//! step of a run.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use vch_common::Step;

use crate::domain::WorkflowError;

/// Why a step did not produce a value.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error(transparent)]
    Failed(anyhow::Error),
    #[error("deadline elapsed")]
    TimedOut,
    #[error("cancelled")]
    Cancelled,
}

impl StepError {
    /// Maps the outcome of `step` into the workflow's closed error set.
    /// `failed` wraps ordinary step failures.
    pub fn into_workflow(
        self,
        step: Step,
        budget: Duration,
        failed: fn(anyhow::Error) -> WorkflowError,
    ) -> WorkflowError {
        match self {
            StepError::Failed(cause) => failed(cause),
            StepError::TimedOut => WorkflowError::Timeout {
                step,
                after: budget,
            },
            StepError::Cancelled => WorkflowError::Cancelled { step },
        }
    }
}

/// Budget started at workflow entry. The token is a child of the caller's,
/// so an operator interrupt reaches every step while an expired deadline
/// stays local to this run.
#[derive(Debug, Clone)]
pub struct Deadline {
    budget: Duration,
    expires_at: Instant,
    token: CancellationToken,
}

impl Deadline {
    #[must_use]
    pub fn start(budget: Duration, parent: &CancellationToken) -> Self {
        Self {
            budget,
            expires_at: Instant::now() + budget,
            token: parent.child_token(),
        }
    }

    #[must_use]
    pub fn budget(&self) -> Duration {
        self.budget
    }

    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    /// Runs one step, racing it against expiry and cancellation.
    ///
    /// Checks both before starting. On expiry the token is cancelled so
    /// in-flight platform calls abort.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::TimedOut`], [`StepError::Cancelled`], or the
    /// step's own error as [`StepError::Failed`].
    pub async fn run<T>(
        &self,
        step: impl Future<Output = anyhow::Result<T>>,
    ) -> Result<T, StepError> {
        if Instant::now() >= self.expires_at {
            self.token.cancel();
            return Err(StepError::TimedOut);
        }
        if self.token.is_cancelled() {
            return Err(StepError::Cancelled);
        }

        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(StepError::Cancelled),
            () = tokio::time::sleep_until(self.expires_at) => {
                self.token.cancel();
                Err(StepError::TimedOut)
            }
            result = step => result.map_err(StepError::Failed),
        }
    }
}
