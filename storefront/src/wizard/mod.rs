//! Multi-step form wizard: step navigation, field validation and the submit lifecycle.
//!
//! A [`Wizard`] owns exactly one [`FormState`]. Hosts drive it with input events and
//! navigation calls, and observe [`SubmissionState`] to render spinners and success panels.
//! Two submit paths exist:
//! - [`Wizard::submit`] for async hosts (awaits the submitter, then the redirect delay);
//! - [`Wizard::begin_submit`] / [`Wizard::finish_submit`] for event-loop hosts that run the
//!   network call elsewhere and feed the outcome back (the terminal UI does this).

pub mod controller;
pub mod form;
pub mod step;
pub mod submission;
pub mod validation;

pub use controller::{CancelSignal, NavError, StepChange, WizardBuildError, WizardController};
pub use form::{FieldValue, FileRef, FormState};
pub use step::StepDefinition;
pub use submission::{
    BeginError, SubmissionEffect, SubmissionLifecycle, SubmissionOptions, SubmissionState,
    SubmitError, SubmitReceipt, Submitter,
};
pub use validation::{FieldKind, FieldSpec, FormSchema, Presence, Rule, ValidationResult};

use crate::utils::logging::masked_form_summary;
use log::info;

/// Host-side navigation collaborator.
pub trait NavigationHost: Send + Sync {
    /// Leave the wizard (cancel, or redirect after a successful submit).
    fn navigate_away(&self);
}

/// Why a submit request did not reach the submitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitBlocked {
    Invalid(ValidationResult),
    InFlight,
    AlreadySucceeded,
}

impl From<BeginError> for SubmitBlocked {
    fn from(e: BeginError) -> Self {
        match e {
            BeginError::InFlight => SubmitBlocked::InFlight,
            BeginError::AlreadySucceeded => SubmitBlocked::AlreadySucceeded,
        }
    }
}

/// Discriminated result of a submit request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Fulfilled(SubmitReceipt),
    Rejected(SubmitError),
    Blocked(SubmitBlocked),
}

/// Everything a worker needs to perform one submission off the UI thread.
#[derive(Debug, Clone)]
pub struct SubmitTicket {
    pub correlation_id: String,
    pub form: FormState,
    pub attachments: Vec<FileRef>,
    pub request_timeout: Option<std::time::Duration>,
}

#[derive(Debug, Clone)]
pub struct Wizard {
    title: String,
    controller: WizardController,
    schema: FormSchema,
    form: FormState,
    validation: ValidationResult,
    submission: SubmissionLifecycle,
}

impl Wizard {
    pub fn new(
        title: impl Into<String>,
        steps: Vec<StepDefinition>,
        schema: FormSchema,
        initial: FormState,
        options: SubmissionOptions,
    ) -> Result<Self, WizardBuildError> {
        let controller = WizardController::new(steps)?;
        let validation = schema.validate(&initial);
        Ok(Self {
            title: title.into(),
            controller,
            schema,
            form: initial,
            validation,
            submission: SubmissionLifecycle::new(options),
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn steps(&self) -> &[StepDefinition] {
        self.controller.steps()
    }

    pub fn current_step(&self) -> &StepDefinition {
        self.controller.current_step()
    }

    pub fn current(&self) -> usize {
        self.controller.current()
    }

    pub fn is_last_step(&self) -> bool {
        self.controller.is_last()
    }

    pub fn submission_state(&self) -> SubmissionState {
        self.submission.state()
    }

    pub fn submission_options(&self) -> SubmissionOptions {
        self.submission.options()
    }

    /// Whole-form result, recomputed on every change.
    pub fn validation(&self) -> &ValidationResult {
        &self.validation
    }

    pub fn set_value(&mut self, name: &str, value: FieldValue) {
        self.form.set(name, value);
        self.validation = self.schema.validate(&self.form);
    }

    pub fn validate_current_step(&self) -> ValidationResult {
        self.schema
            .validate_step(&self.form, self.controller.current_step())
    }

    pub fn first_invalid_step(&self) -> Option<usize> {
        self.schema
            .first_invalid_step(&self.form, self.controller.steps())
    }

    pub fn go_next(&mut self) -> StepChange {
        self.controller.go_next()
    }

    pub fn go_previous(&mut self) -> StepChange {
        self.controller.go_previous()
    }

    pub fn go_to(&mut self, step: usize) -> Result<StepChange, NavError> {
        self.controller.go_to(step)
    }

    /// Submit control enabled: the whole form validates and the lifecycle allows a new attempt.
    pub fn can_submit(&self) -> bool {
        self.validation.is_valid() && self.submission.can_submit()
    }

    /// Validate and enter InFlight, handing back a snapshot for the worker.
    pub fn begin_submit(&mut self) -> Result<SubmitTicket, SubmitBlocked> {
        self.validation = self.schema.validate(&self.form);
        if !self.validation.is_valid() {
            info!(
                "[PHASE: submit] [STEP: blocked] {} has {} invalid field(s)",
                self.title,
                self.validation.error_count()
            );
            return Err(SubmitBlocked::Invalid(self.validation.clone()));
        }
        let correlation_id = self.submission.begin()?;
        info!(
            "[PHASE: submit] [STEP: payload] {} correlation_id={} {}",
            self.title,
            correlation_id,
            masked_form_summary(&self.form, &self.schema)
        );
        Ok(SubmitTicket {
            correlation_id,
            form: self.form.clone(),
            attachments: self.form.attachments(),
            request_timeout: self.submission.options().request_timeout,
        })
    }

    pub fn finish_submit(
        &mut self,
        outcome: Result<SubmitReceipt, SubmitError>,
    ) -> Option<SubmissionEffect> {
        self.submission.resolve(outcome)
    }

    /// Full async submit: validate, call the submitter once, and on success wait out the
    /// redirect delay before asking the host to navigate away.
    pub async fn submit<S, H>(&mut self, submitter: &S, host: &H) -> SubmitOutcome
    where
        S: Submitter + ?Sized,
        H: NavigationHost + ?Sized,
    {
        let ticket = match self.begin_submit() {
            Ok(t) => t,
            Err(blocked) => return SubmitOutcome::Blocked(blocked),
        };
        let result = submission::run_submitter(
            submitter,
            &ticket.form,
            &ticket.attachments,
            ticket.request_timeout,
        )
        .await;

        match self.finish_submit(result.clone()) {
            Some(SubmissionEffect::ShowSuccess {
                receipt,
                redirect_after,
            }) => {
                tokio::join!(
                    submitter.after_success(&receipt),
                    tokio::time::sleep(redirect_after)
                );
                info!(
                    "[PHASE: submit] [STEP: redirect] {} leaving after {}ms",
                    self.title,
                    redirect_after.as_millis()
                );
                host.navigate_away();
            }
            Some(SubmissionEffect::ShowError { .. }) | None => {}
        }

        match result {
            Ok(receipt) => SubmitOutcome::Fulfilled(receipt),
            Err(e) => SubmitOutcome::Rejected(e),
        }
    }

    /// Discard the form and leave. Submission state is not touched; the wizard is consumed.
    pub fn cancel<H: NavigationHost + ?Sized>(self, host: &H) -> CancelSignal {
        let signal = self.controller.cancel();
        info!(
            "[PHASE: wizard] [STEP: cancel] {} cancelled (submission={:?})",
            self.title,
            self.submission.state()
        );
        host.navigate_away();
        signal
    }
}
