// Submission lifecycle for the terminal "submit" action.
//
// State machine:
//   Idle | Failed  --begin-->    InFlight
//   InFlight       --fulfilled--> Succeeded  (success panel, redirect after `redirect_delay`)
//   InFlight       --rejected-->  Failed     (generic notification, form kept as-is)
// Succeeded is never left; a second submit while InFlight is refused without a network call.
// There is no automatic retry.

use super::form::{FileRef, FormState};
use async_trait::async_trait;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

pub const DEFAULT_REDIRECT_DELAY: Duration = Duration::from_millis(3000);

/// Shown to the user for every failed submission regardless of cause.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "We couldn't submit your request. Please check your connection and try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    #[default]
    Idle,
    InFlight,
    Succeeded,
    Failed,
}

/// Failure returned by a submitter. Causes are not differentiated: the user sees
/// `user_message`, logs get `internal_details`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{user_message}")]
pub struct SubmitError {
    pub user_message: String,
    pub internal_details: String,
}

impl SubmitError {
    pub fn generic(internal_details: impl Into<String>) -> Self {
        Self {
            user_message: GENERIC_FAILURE_MESSAGE.to_string(),
            internal_details: internal_details.into(),
        }
    }
}

/// What the backend handed back for a fulfilled submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReceipt {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Output boundary: sends the validated form plus attachments somewhere.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(
        &self,
        form: &FormState,
        attachments: &[FileRef],
    ) -> Result<SubmitReceipt, SubmitError>;

    /// Follow-up work for a fulfilled attempt (cache refresh and the like). Runs after the
    /// outcome has been handed to the lifecycle and outside the request timeout, so nothing
    /// here can turn a completed write into a failure.
    async fn after_success(&self, _receipt: &SubmitReceipt) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionOptions {
    /// Grace period between the success panel and the automatic navigate-away.
    pub redirect_delay: Duration,
    /// `None` waits for the backend indefinitely.
    pub request_timeout: Option<Duration>,
}

impl Default for SubmissionOptions {
    fn default() -> Self {
        Self {
            redirect_delay: DEFAULT_REDIRECT_DELAY,
            request_timeout: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BeginError {
    #[error("a submission is already in flight")]
    InFlight,
    #[error("this form has already been submitted")]
    AlreadySucceeded,
}

/// What the view should show after a submission resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionEffect {
    ShowSuccess {
        receipt: SubmitReceipt,
        redirect_after: Duration,
    },
    ShowError {
        message: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct SubmissionLifecycle {
    state: SubmissionState,
    options: SubmissionOptions,
    attempts: u32,
    correlation_id: Option<String>,
}

impl SubmissionLifecycle {
    pub fn new(options: SubmissionOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn state(&self) -> SubmissionState {
        self.state
    }

    pub fn options(&self) -> SubmissionOptions {
        self.options
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    /// Whether the submit control is enabled.
    pub fn can_submit(&self) -> bool {
        matches!(self.state, SubmissionState::Idle | SubmissionState::Failed)
    }

    /// Enter InFlight. Returns the correlation id for this attempt.
    pub fn begin(&mut self) -> Result<String, BeginError> {
        match self.state {
            SubmissionState::InFlight => return Err(BeginError::InFlight),
            SubmissionState::Succeeded => return Err(BeginError::AlreadySucceeded),
            SubmissionState::Idle | SubmissionState::Failed => {}
        }
        let correlation_id = Uuid::new_v4().to_string();
        self.state = SubmissionState::InFlight;
        self.attempts += 1;
        self.correlation_id = Some(correlation_id.clone());
        info!(
            "[PHASE: submit] [STEP: begin] attempt={} correlation_id={}",
            self.attempts, correlation_id
        );
        Ok(correlation_id)
    }

    /// Apply the collaborator's outcome. Returns `None` when nothing is in flight (a stale
    /// result), leaving the state untouched.
    pub fn resolve(
        &mut self,
        outcome: Result<SubmitReceipt, SubmitError>,
    ) -> Option<SubmissionEffect> {
        if self.state != SubmissionState::InFlight {
            warn!(
                "[PHASE: submit] [STEP: resolve] ignoring outcome while state={:?}",
                self.state
            );
            return None;
        }
        let corr = self.correlation_id.as_deref().unwrap_or("-");
        match outcome {
            Ok(receipt) => {
                self.state = SubmissionState::Succeeded;
                info!(
                    "[PHASE: submit] [STEP: fulfilled] correlation_id={} id={:?}",
                    corr, receipt.id
                );
                Some(SubmissionEffect::ShowSuccess {
                    receipt,
                    redirect_after: self.options.redirect_delay,
                })
            }
            Err(e) => {
                self.state = SubmissionState::Failed;
                error!(
                    "[PHASE: submit] [STEP: rejected] correlation_id={} details={}",
                    corr, e.internal_details
                );
                Some(SubmissionEffect::ShowError {
                    message: e.user_message,
                })
            }
        }
    }
}

/// Call the submitter, applying the optional request timeout. A timeout is an ordinary
/// failure. Only `Submitter::submit` runs under the deadline; `after_success` is left to the
/// host once the outcome is resolved.
pub async fn run_submitter<S: Submitter + ?Sized>(
    submitter: &S,
    form: &FormState,
    attachments: &[FileRef],
    request_timeout: Option<Duration>,
) -> Result<SubmitReceipt, SubmitError> {
    match request_timeout {
        None => submitter.submit(form, attachments).await,
        Some(limit) => match tokio::time::timeout(limit, submitter.submit(form, attachments)).await
        {
            Ok(result) => result,
            Err(_) => Err(SubmitError::generic(format!(
                "submission timed out after {}ms",
                limit.as_millis()
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowSubmitter(Duration);

    #[async_trait]
    impl Submitter for SlowSubmitter {
        async fn submit(&self, _: &FormState, _: &[FileRef]) -> Result<SubmitReceipt, SubmitError> {
            tokio::time::sleep(self.0).await;
            Ok(SubmitReceipt::default())
        }
    }

    #[test]
    fn begin_only_from_idle_or_failed() {
        let mut l = SubmissionLifecycle::default();
        assert!(l.can_submit());
        l.begin().unwrap();
        assert_eq!(l.state(), SubmissionState::InFlight);
        assert!(!l.can_submit(), "submit control must be disabled while in flight");
        assert_eq!(l.begin().unwrap_err(), BeginError::InFlight);
        assert_eq!(l.attempts(), 1, "refused begin must not count as an attempt");

        l.resolve(Err(SubmitError::generic("HTTP 500")));
        assert_eq!(l.state(), SubmissionState::Failed);
        assert!(l.can_submit(), "failed submissions can be retried by the user");

        l.begin().unwrap();
        l.resolve(Ok(SubmitReceipt::default()));
        assert_eq!(l.state(), SubmissionState::Succeeded);
        assert_eq!(l.begin().unwrap_err(), BeginError::AlreadySucceeded);
        assert_eq!(l.attempts(), 2);
    }

    #[test]
    fn resolve_reports_effects() {
        let mut l = SubmissionLifecycle::new(SubmissionOptions {
            redirect_delay: Duration::from_millis(1500),
            request_timeout: None,
        });
        l.begin().unwrap();
        let effect = l.resolve(Ok(SubmitReceipt {
            id: Some("veh-1".into()),
            message: None,
        }));
        assert_eq!(
            effect,
            Some(SubmissionEffect::ShowSuccess {
                receipt: SubmitReceipt {
                    id: Some("veh-1".into()),
                    message: None
                },
                redirect_after: Duration::from_millis(1500),
            })
        );

        let mut l = SubmissionLifecycle::default();
        l.begin().unwrap();
        let effect = l.resolve(Err(SubmitError::generic("connection refused")));
        assert_eq!(
            effect,
            Some(SubmissionEffect::ShowError {
                message: GENERIC_FAILURE_MESSAGE.to_string()
            })
        );
    }

    #[test]
    fn stale_outcome_is_ignored() {
        let mut l = SubmissionLifecycle::default();
        assert_eq!(l.resolve(Ok(SubmitReceipt::default())), None);
        assert_eq!(l.state(), SubmissionState::Idle);
    }

    #[test]
    fn each_attempt_gets_a_fresh_correlation_id() {
        let mut l = SubmissionLifecycle::default();
        let first = l.begin().unwrap();
        l.resolve(Err(SubmitError::generic("x")));
        let second = l.begin().unwrap();
        assert_ne!(first, second);
        assert_eq!(l.correlation_id(), Some(second.as_str()));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_resolves_as_generic_failure() {
        let slow = SlowSubmitter(Duration::from_secs(60));
        let result = run_submitter(
            &slow,
            &FormState::new(),
            &[],
            Some(Duration::from_secs(5)),
        )
        .await;
        let err = result.unwrap_err();
        assert_eq!(err.user_message, GENERIC_FAILURE_MESSAGE);
        assert!(
            err.internal_details.contains("timed out"),
            "details: {}",
            err.internal_details
        );
    }

    #[tokio::test(start_paused = true)]
    async fn no_timeout_waits_for_backend() {
        let slow = SlowSubmitter(Duration::from_secs(600));
        let result = run_submitter(&slow, &FormState::new(), &[], None).await;
        assert!(result.is_ok());
    }
}
