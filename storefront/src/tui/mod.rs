//! Terminal UI host for the storefront wizards.
//!
//! Layout:
//! - Centered window titled "Storefront: <wizard title>"
//! - Left panel with the navigation items visible to the signed-in role
//! - Tab row (one tab per step, F1..F9 jump straight to a tab)
//! - Field panel with inline validation errors
//! - Bottom button row: [ Back ] [ Next | Submit ] [ Cancel ]
//! - Modals for cancel confirmation and submission failures
//!
//! Note: Logging is file-only in TUI mode (stdout logging is disabled) to avoid corrupting the terminal UI.

use crate::api::{ApiClient, RestSubmitter, SubmitTarget};
use crate::config::AppConfig;
use crate::forms::{maintenance_booking, profile_edit, vehicle_listing, WizardKind};
use crate::models::nav::{nav_entry, visible_items, NavItem};
use crate::models::responses::Role;
use crate::models::state::{AppState, Session};
use crate::wizard::submission::run_submitter;
use crate::wizard::validation::DATE_FORMAT;
use crate::wizard::{
    FieldKind, FieldValue, FileRef, NavigationHost, Presence, StepChange, SubmissionEffect,
    SubmissionOptions, SubmissionState, SubmitBlocked, SubmitError, SubmitReceipt, SubmitTicket,
    Submitter, Wizard,
};
use anyhow::{anyhow, Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use log::{info, warn};
use ratatui::backend::{CrosstermBackend, TestBackend};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Terminal;
use std::collections::{HashMap, HashSet};
use std::io::{self, Stdout};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];
const MAX_TABS: u8 = 9;
const LABEL_WIDTH: usize = 20;
const VALUE_WIDTH: usize = 36;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ButtonFocus {
    Back,
    Next,
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Modal {
    ConfirmCancel,
    Message { title: String, body: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FocusTarget {
    Field(usize),
    Button(ButtonFocus),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    Cancelled,
    Redirected,
}

enum UiMsg {
    SubmitFinished {
        correlation_id: String,
        outcome: Result<SubmitReceipt, SubmitError>,
    },
}

struct TextInput {
    value: String,
    /// Cursor position in chars.
    cursor: usize,
    masked: bool,
}

impl TextInput {
    fn new(value: impl Into<String>, masked: bool) -> Self {
        let v = value.into();
        Self {
            cursor: v.chars().count(),
            value: v,
            masked,
        }
    }

    fn display(&self) -> String {
        if self.masked {
            "*".repeat(self.value.chars().count())
        } else {
            self.value.clone()
        }
    }

    fn set(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.cursor = self.value.chars().count();
    }

    fn byte_index(&self, char_idx: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_idx)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    fn handle_key(&mut self, code: KeyCode) -> bool {
        let len = self.value.chars().count();
        match code {
            KeyCode::Char(c) => {
                let at = self.byte_index(self.cursor);
                self.value.insert(at, c);
                self.cursor += 1;
                true
            }
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    let at = self.byte_index(self.cursor - 1);
                    self.value.remove(at);
                    self.cursor -= 1;
                }
                true
            }
            KeyCode::Delete => {
                if self.cursor < len {
                    let at = self.byte_index(self.cursor);
                    self.value.remove(at);
                }
                true
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                true
            }
            KeyCode::Right => {
                self.cursor = (self.cursor + 1).min(len);
                true
            }
            KeyCode::Home => {
                self.cursor = 0;
                true
            }
            KeyCode::End => {
                self.cursor = len;
                true
            }
            _ => false,
        }
    }
}

struct SuccessPanel {
    reference: Option<String>,
    redirect_at: Instant,
}

struct WizardState {
    wizard: Wizard,
    inputs: HashMap<String, TextInput>,
    /// Fields whose errors are shown: edited ones, plus every field of a step the user tried
    /// to leave with Next or submit.
    touched: HashSet<String>,
    focus: FocusTarget,
    modal: Option<Modal>,
    modal_focus: ButtonFocus,
    nav: Vec<NavItem>,
    active_nav: NavItem,
    scroll: u16,
    tick: usize,
    notice: Option<String>,
    success: Option<SuccessPanel>,
    exit: Option<Exit>,
}

impl WizardState {
    fn new(wizard: Wizard, role: Option<Role>, kind: WizardKind) -> Self {
        let mut inputs = HashMap::new();
        for spec in wizard.schema().fields() {
            let raw = match wizard.form().get(&spec.name) {
                Some(FieldValue::Files(files)) => files
                    .iter()
                    .map(|f| f.path.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                Some(v) => v.to_string(),
                None => String::new(),
            };
            inputs.insert(
                spec.name.clone(),
                TextInput::new(raw, spec.kind.is_secret()),
            );
        }
        let active_nav = match kind {
            WizardKind::VehicleListing => NavItem::Vehicles,
            WizardKind::MaintenanceBooking => NavItem::Maintenance,
            WizardKind::ProfileEdit => NavItem::Profile,
        };
        let mut state = Self {
            wizard,
            inputs,
            touched: HashSet::new(),
            focus: FocusTarget::Button(ButtonFocus::Next),
            modal: None,
            modal_focus: ButtonFocus::Next,
            nav: visible_items(role),
            active_nav,
            scroll: 0,
            tick: 0,
            notice: None,
            success: None,
            exit: None,
        };
        state.focus = first_focus(&state);
        state
    }
}

/// Leaving the wizard in the terminal host means ending the session.
struct LeaveToShell;

impl NavigationHost for LeaveToShell {
    fn navigate_away(&self) {
        info!("[PHASE: tui] [STEP: exit] Leaving wizard");
    }
}

/// What the binary resolved from the command line.
#[derive(Debug, Clone)]
pub struct Launch {
    pub kind: WizardKind,
    /// Entity to edit instead of creating a new one.
    pub edit_id: Option<String>,
}

// =========================
// Step/field helpers
// =========================

fn step_fields(state: &WizardState) -> Vec<String> {
    state.wizard.current_step().fields.clone()
}

fn first_focus(state: &WizardState) -> FocusTarget {
    if step_fields(state).is_empty() {
        FocusTarget::Button(ButtonFocus::Next)
    } else {
        FocusTarget::Field(0)
    }
}

fn focused_field(state: &WizardState) -> Option<String> {
    match state.focus {
        FocusTarget::Field(i) => step_fields(state).get(i).cloned(),
        FocusTarget::Button(_) => None,
    }
}

fn field_kind(state: &WizardState, name: &str) -> Option<FieldKind> {
    state.wizard.schema().field(name).map(|f| f.kind.clone())
}

fn parse_paths(raw: &str) -> Vec<FileRef> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(FileRef::new)
        .collect()
}

/// Push the raw input for `name` into the form.
fn commit_field(state: &mut WizardState, name: &str) {
    let Some(kind) = field_kind(state, name) else {
        return;
    };
    let raw = state
        .inputs
        .get(name)
        .map(|i| i.value.clone())
        .unwrap_or_default();
    let value = match kind {
        FieldKind::Files => FieldValue::Files(parse_paths(&raw)),
        k => k.value_from_input(&raw),
    };
    state.wizard.set_value(name, value);
    state.touched.insert(name.to_string());
}

fn cycle_choice(state: &mut WizardState, name: &str, forward: bool) {
    let Some(FieldKind::Choice(options)) = field_kind(state, name) else {
        return;
    };
    if options.is_empty() {
        return;
    }
    let Some(input) = state.inputs.get_mut(name) else {
        return;
    };
    let pos = options.iter().position(|o| *o == input.value);
    let next = match (pos, forward) {
        (Some(i), true) => (i + 1) % options.len(),
        (None, true) => 0,
        (Some(0), false) | (None, false) => options.len() - 1,
        (Some(i), false) => i - 1,
    };
    input.set(options[next].clone());
    commit_field(state, name);
}

fn touch_step(state: &mut WizardState) {
    for f in step_fields(state) {
        state.touched.insert(f);
    }
}

fn focus_order(state: &WizardState) -> Vec<FocusTarget> {
    let mut order: Vec<FocusTarget> = (0..step_fields(state).len())
        .map(FocusTarget::Field)
        .collect();
    order.extend([
        FocusTarget::Button(ButtonFocus::Back),
        FocusTarget::Button(ButtonFocus::Next),
        FocusTarget::Button(ButtonFocus::Cancel),
    ]);
    order
}

fn move_focus(state: &mut WizardState, forward: bool) {
    let order = focus_order(state);
    let pos = order.iter().position(|f| *f == state.focus).unwrap_or(0);
    let next = if forward {
        (pos + 1) % order.len()
    } else {
        (pos + order.len() - 1) % order.len()
    };
    state.focus = order[next];
}

fn apply_step_change(state: &mut WizardState, change: StepChange) {
    if let StepChange::Moved { scroll_to_top, .. } = change {
        if scroll_to_top {
            state.scroll = 0;
        }
        state.focus = first_focus(state);
        state.notice = None;
    }
}

fn can_go_back(state: &WizardState) -> bool {
    state.wizard.current() > 1 && state.success.is_none()
}

fn can_go_next(state: &WizardState) -> bool {
    if state.wizard.is_last_step() {
        state.wizard.can_submit()
    } else {
        state.success.is_none()
    }
}

fn can_cancel(state: &WizardState) -> bool {
    state.success.is_none() && state.wizard.submission_state() != SubmissionState::InFlight
}

fn next_label(state: &WizardState) -> &'static str {
    if state.wizard.is_last_step() {
        "Submit"
    } else {
        "Next"
    }
}

// =========================
// Entry points
// =========================

pub fn run(config: &AppConfig, app_state: Arc<AppState>, launch: Launch) -> Result<()> {
    info!(
        "[PHASE: tui] [STEP: start] Starting TUI wizard kind={} edit={:?}",
        launch.kind, launch.edit_id
    );

    let client = Arc::new(ApiClient::new(config, app_state.clone())?);
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let (wizard, target) = rt.block_on(prepare_wizard(&client, config, &launch))?;
    let role = rt.block_on(app_state.role());
    drop(rt);

    let submitter: Arc<dyn Submitter> = Arc::new(RestSubmitter::new(client, target));
    let mut state = WizardState::new(wizard, role, launch.kind);

    let mut terminal = setup_terminal()?;
    let result = run_loop(&mut terminal, &mut state, &submitter);
    restore_terminal(&mut terminal)?;
    result?;

    finish(state, &LeaveToShell);
    Ok(())
}

/// Build the wizard for a launch request, fetching the entity for edit flows.
async fn prepare_wizard(
    client: &ApiClient,
    config: &AppConfig,
    launch: &Launch,
) -> Result<(Wizard, SubmitTarget)> {
    let options = config.submission_options();
    let app_state = client.state();

    match (launch.kind, launch.edit_id.as_deref()) {
        (WizardKind::VehicleListing, None) => Ok((
            vehicle_listing::new_listing(options)?,
            SubmitTarget::CreateVehicle,
        )),
        (WizardKind::VehicleListing, Some(id)) => {
            let vehicle = client
                .get_vehicle(id)
                .await
                .with_context(|| format!("Failed to load vehicle {}", id))?;
            Ok((
                vehicle_listing::from_vehicle(&vehicle, options)?,
                SubmitTarget::UpdateVehicle(id.to_string()),
            ))
        }
        (WizardKind::MaintenanceBooking, None) => {
            let contact = match app_state.session().await {
                Some(session) => match client.get_user(&session.user_id).await {
                    Ok(user) => Some(user),
                    Err(e) => {
                        warn!(
                            "[PHASE: tui] [STEP: prepare] Contact prefill skipped: {}",
                            e
                        );
                        None
                    }
                },
                None => None,
            };
            Ok((
                maintenance_booking::new_booking(contact.as_ref(), options)?,
                SubmitTarget::BookMaintenance,
            ))
        }
        (WizardKind::MaintenanceBooking, Some(id)) => {
            let appointment = client
                .get_appointment(id)
                .await
                .with_context(|| format!("Failed to load appointment {}", id))?;
            Ok((
                maintenance_booking::from_appointment(&appointment, options)?,
                SubmitTarget::UpdateAppointment(id.to_string()),
            ))
        }
        (WizardKind::ProfileEdit, _) => {
            let session = app_state.session().await.ok_or_else(|| {
                anyhow!("Editing a profile requires a signed-in user (--user=<id> --token=<token>)")
            })?;
            let user = client
                .get_user(&session.user_id)
                .await
                .with_context(|| format!("Failed to load user {}", session.user_id))?;
            app_state
                .sign_in(Session {
                    display_name: user.name.clone(),
                    role: user.role,
                    ..session
                })
                .await;
            Ok((
                profile_edit::from_user(&user, options)?,
                SubmitTarget::UpdateProfile(user.id.clone()),
            ))
        }
    }
}

fn finish<H: NavigationHost + ?Sized>(state: WizardState, host: &H) {
    match state.exit {
        Some(Exit::Cancelled) => {
            state.wizard.cancel(host);
        }
        Some(Exit::Redirected) => host.navigate_away(),
        None => {}
    }
}

fn smoke_seed(kind: WizardKind, wizard: &mut Wizard) {
    match kind {
        WizardKind::VehicleListing => {
            for (k, v) in [
                ("make", FieldValue::text("Mazda")),
                ("model", FieldValue::text("CX-5")),
                ("bodyType", FieldValue::choice("SUV")),
                ("mileage", FieldValue::Number(42_000.0)),
                ("fuel", FieldValue::choice("Petrol")),
                ("transmission", FieldValue::choice("Automatic")),
                ("color", FieldValue::text("Soul Red")),
                ("price", FieldValue::Number(23_900.0)),
                ("condition", FieldValue::choice("Used")),
                ("description", FieldValue::text("One owner, full service history.")),
            ] {
                wizard.set_value(k, v);
            }
        }
        WizardKind::MaintenanceBooking => {
            let date = (chrono::Local::now().date_naive() + chrono::Duration::days(7))
                .format(DATE_FORMAT)
                .to_string();
            for (k, v) in [
                ("serviceType", FieldValue::choice("Oil Change")),
                ("date", FieldValue::text(date)),
                ("time", FieldValue::choice("09:00")),
                ("vehicleMake", FieldValue::text("Honda")),
                ("vehicleModel", FieldValue::text("Civic")),
                ("vehicleYear", FieldValue::Number(2016.0)),
                ("name", FieldValue::text("Sam Lee")),
                ("email", FieldValue::text("sam@example.com")),
                ("phone", FieldValue::text("555-0101")),
            ] {
                wizard.set_value(k, v);
            }
        }
        WizardKind::ProfileEdit => {
            wizard.set_value("name", FieldValue::text("Dana Ruiz"));
            wizard.set_value("phone", FieldValue::text("555-0100"));
        }
    }
}

/// Smoke-only: seeded state for deterministic rendering in CI/tooling.
/// Target: `<vehicle|booking|profile>[:<step number>|:submitting|:success|:failed]`.
fn new_smoke_wizard_state(target: &str) -> Result<WizardState> {
    let (kind_raw, view) = match target.split_once(':') {
        Some((k, v)) => (k, Some(v.trim().to_ascii_lowercase())),
        None => (target, None),
    };
    let kind: WizardKind = if kind_raw.trim().is_empty() {
        WizardKind::MaintenanceBooking
    } else {
        kind_raw.parse()?
    };

    let options = SubmissionOptions::default();
    let mut wizard = match kind {
        WizardKind::VehicleListing => vehicle_listing::new_listing(options)?,
        WizardKind::MaintenanceBooking => maintenance_booking::new_booking(None, options)?,
        WizardKind::ProfileEdit => profile_edit::blank(options)?,
    };
    smoke_seed(kind, &mut wizard);

    let mut state = WizardState::new(wizard, Some(Role::Customer), kind);
    match view.as_deref() {
        None | Some("") => {}
        Some("submitting" | "success" | "failed") => {
            let last = state.wizard.steps().len();
            let change = state.wizard.go_to(last)?;
            apply_step_change(&mut state, change);
            let ticket = state
                .wizard
                .begin_submit()
                .map_err(|b| anyhow!("Smoke form does not validate: {:?}", b))?;
            match view.as_deref() {
                Some("success") => apply_message(
                    &mut state,
                    UiMsg::SubmitFinished {
                        correlation_id: ticket.correlation_id,
                        outcome: Ok(SubmitReceipt {
                            id: Some("smoke-1".to_string()),
                            message: None,
                        }),
                    },
                ),
                Some("failed") => apply_message(
                    &mut state,
                    UiMsg::SubmitFinished {
                        correlation_id: ticket.correlation_id,
                        outcome: Err(SubmitError::generic("smoke: simulated failure")),
                    },
                ),
                _ => {}
            }
        }
        Some(step) => {
            let n: usize = step
                .parse()
                .map_err(|_| anyhow!("Unknown smoke view '{}'", step))?;
            let change = state.wizard.go_to(n)?;
            apply_step_change(&mut state, change);
        }
    }
    Ok(state)
}

/// Non-interactive smoke mode: render a single frame and exit.
pub fn smoke(target: &str) -> Result<()> {
    info!(
        "[PHASE: tui] [STEP: smoke] Rendering single-frame TUI smoke target={}",
        target
    );

    let state = new_smoke_wizard_state(target.trim())?;

    // In-memory backend: no raw mode, no alternate screen.
    let backend = TestBackend::new(100, 30);
    let mut terminal = Terminal::new(backend)?;
    terminal.draw(|f| draw(f.size(), f, &state))?;

    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    state: &mut WizardState,
    submitter: &Arc<dyn Submitter>,
) -> Result<()> {
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();
    let (tx, rx) = mpsc::channel::<UiMsg>();

    while state.exit.is_none() {
        drain_messages(state, &rx);
        check_redirect(state, Instant::now());
        if state.exit.is_some() {
            break;
        }
        terminal.draw(|f| draw(f.size(), f, state))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_millis(0));

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Release {
                    handle_key(state, key.code, &tx, submitter);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
            state.tick = state.tick.wrapping_add(1);
        }
    }

    Ok(())
}

fn check_redirect(state: &mut WizardState, now: Instant) {
    if let Some(panel) = &state.success {
        if now >= panel.redirect_at {
            state.exit = Some(Exit::Redirected);
        }
    }
}

fn drain_messages(state: &mut WizardState, rx: &mpsc::Receiver<UiMsg>) {
    while let Ok(msg) = rx.try_recv() {
        apply_message(state, msg);
    }
}

fn apply_message(state: &mut WizardState, msg: UiMsg) {
    match msg {
        UiMsg::SubmitFinished {
            correlation_id,
            outcome,
        } => {
            info!(
                "[PHASE: tui] [STEP: submit] Worker finished correlation_id={} ok={}",
                correlation_id,
                outcome.is_ok()
            );
            match state.wizard.finish_submit(outcome) {
                Some(SubmissionEffect::ShowSuccess {
                    receipt,
                    redirect_after,
                }) => {
                    state.modal = None;
                    state.notice = None;
                    state.success = Some(SuccessPanel {
                        reference: receipt.id,
                        redirect_at: Instant::now() + redirect_after,
                    });
                }
                Some(SubmissionEffect::ShowError { message }) => {
                    state.modal = Some(Modal::Message {
                        title: "Submission failed".to_string(),
                        body: message,
                    });
                }
                None => {}
            }
        }
    }
}

fn spawn_submit(ticket: SubmitTicket, submitter: Arc<dyn Submitter>, tx: mpsc::Sender<UiMsg>) {
    thread::spawn(move || {
        let rt = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                let _ = tx.send(UiMsg::SubmitFinished {
                    correlation_id: ticket.correlation_id,
                    outcome: Err(SubmitError::generic(format!(
                        "Failed to start async runtime: {}",
                        e
                    ))),
                });
                return;
            }
        };
        let outcome = rt.block_on(run_submitter(
            submitter.as_ref(),
            &ticket.form,
            &ticket.attachments,
            ticket.request_timeout,
        ));
        let receipt = outcome.as_ref().ok().cloned();
        let _ = tx.send(UiMsg::SubmitFinished {
            correlation_id: ticket.correlation_id,
            outcome,
        });
        // The UI has the outcome already; follow-up runs on the worker without a deadline.
        if let Some(receipt) = receipt {
            rt.block_on(submitter.after_success(&receipt));
        }
    });
}

fn start_submit(
    state: &mut WizardState,
    tx: &mpsc::Sender<UiMsg>,
    submitter: &Arc<dyn Submitter>,
) {
    match state.wizard.begin_submit() {
        Ok(ticket) => {
            state.notice = None;
            spawn_submit(ticket, submitter.clone(), tx.clone());
        }
        Err(SubmitBlocked::Invalid(result)) => {
            for (name, _) in result.errors() {
                state.touched.insert(name.to_string());
            }
            if let Some(step) = state.wizard.first_invalid_step() {
                if let Ok(change) = state.wizard.go_to(step) {
                    apply_step_change(state, change);
                }
            }
            state.notice = Some(format!(
                "{} field(s) need attention before submitting.",
                result.error_count()
            ));
        }
        Err(SubmitBlocked::InFlight) | Err(SubmitBlocked::AlreadySucceeded) => {}
    }
}

fn activate_button(
    state: &mut WizardState,
    button: ButtonFocus,
    tx: &mpsc::Sender<UiMsg>,
    submitter: &Arc<dyn Submitter>,
) {
    match button {
        ButtonFocus::Back => {
            if can_go_back(state) {
                let change = state.wizard.go_previous();
                apply_step_change(state, change);
            }
        }
        ButtonFocus::Next => {
            if state.wizard.is_last_step() {
                // Disabled Submit never dispatches; it only points at what is missing.
                if state.wizard.submission_state() != SubmissionState::InFlight {
                    start_submit(state, tx, submitter);
                }
                return;
            }
            let result = state.wizard.validate_current_step();
            if result.is_valid() {
                let change = state.wizard.go_next();
                apply_step_change(state, change);
            } else {
                touch_step(state);
                state.notice = Some(format!(
                    "{} field(s) on this step need attention.",
                    result.error_count()
                ));
            }
        }
        ButtonFocus::Cancel => {
            if can_cancel(state) {
                state.modal = Some(Modal::ConfirmCancel);
                state.modal_focus = ButtonFocus::Next; // "No"
            }
        }
    }
}

fn handle_key(
    state: &mut WizardState,
    code: KeyCode,
    tx: &mpsc::Sender<UiMsg>,
    submitter: &Arc<dyn Submitter>,
) {
    // Modal handling
    if let Some(modal) = state.modal.clone() {
        match modal {
            Modal::ConfirmCancel => match code {
                KeyCode::Left | KeyCode::Right | KeyCode::Tab => {
                    state.modal_focus = match state.modal_focus {
                        ButtonFocus::Cancel => ButtonFocus::Next,
                        _ => ButtonFocus::Cancel,
                    };
                }
                KeyCode::Enter => {
                    let confirm = state.modal_focus == ButtonFocus::Cancel;
                    state.modal = None;
                    if confirm {
                        state.exit = Some(Exit::Cancelled);
                    }
                }
                KeyCode::Esc => {
                    state.modal = None;
                }
                _ => {}
            },
            Modal::Message { .. } => {
                if matches!(code, KeyCode::Enter | KeyCode::Esc) {
                    state.modal = None;
                }
            }
        }
        return;
    }

    // Success panel waits for the redirect.
    if state.success.is_some() {
        return;
    }

    // Global keys
    match code {
        KeyCode::Esc => {
            activate_button(state, ButtonFocus::Cancel, tx, submitter);
            return;
        }
        KeyCode::F(n) if (1..=MAX_TABS).contains(&n) => {
            let step = n as usize;
            if step <= state.wizard.steps().len() {
                if let Ok(change) = state.wizard.go_to(step) {
                    apply_step_change(state, change);
                }
            }
            return;
        }
        KeyCode::Tab | KeyCode::Down => {
            move_focus(state, true);
            return;
        }
        KeyCode::BackTab | KeyCode::Up => {
            move_focus(state, false);
            return;
        }
        KeyCode::PageDown => {
            state.scroll = state.scroll.saturating_add(4);
            return;
        }
        KeyCode::PageUp => {
            state.scroll = state.scroll.saturating_sub(4);
            return;
        }
        _ => {}
    }

    match state.focus {
        FocusTarget::Field(_) => {
            let Some(name) = focused_field(state) else {
                return;
            };
            if code == KeyCode::Enter {
                move_focus(state, true);
                return;
            }
            if matches!(field_kind(state, &name), Some(FieldKind::Choice(_))) {
                match code {
                    KeyCode::Left => cycle_choice(state, &name, false),
                    KeyCode::Right | KeyCode::Char(' ') => cycle_choice(state, &name, true),
                    _ => {}
                }
                return;
            }
            let changed = match state.inputs.get_mut(&name) {
                Some(input) => {
                    let before = input.value.clone();
                    input.handle_key(code) && input.value != before
                }
                None => false,
            };
            if changed {
                commit_field(state, &name);
            }
        }
        FocusTarget::Button(b) => match code {
            KeyCode::Left => {
                state.focus = FocusTarget::Button(match b {
                    ButtonFocus::Cancel => ButtonFocus::Next,
                    _ => ButtonFocus::Back,
                });
            }
            KeyCode::Right => {
                state.focus = FocusTarget::Button(match b {
                    ButtonFocus::Back => ButtonFocus::Next,
                    _ => ButtonFocus::Cancel,
                });
            }
            KeyCode::Enter => activate_button(state, b, tx, submitter),
            _ => {}
        },
    }
}

// =========================
// Rendering
// =========================

fn draw(area: Rect, f: &mut ratatui::Frame<'_>, state: &WizardState) {
    let window_area = centered_window(area, 100, 30);

    let outer_block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Storefront: {}", state.wizard.title()));
    f.render_widget(outer_block, window_area);

    let inner = window_area.inner(&ratatui::layout::Margin {
        vertical: 1,
        horizontal: 1,
    });
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(22), Constraint::Min(0)].as_ref())
        .split(inner);

    draw_nav(f, cols[0], state);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(cols[1]);

    draw_tabs(f, rows[0], state);

    let step = state.wizard.current_step();
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Step {} of {}: {} ", step.ordinal, state.wizard.steps().len(), step.label));
    let content = match &state.success {
        Some(panel) => success_lines(panel, Instant::now()),
        None => field_lines(state),
    };
    let body = Paragraph::new(Text::from(content))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((state.scroll, 0));
    f.render_widget(body, rows[1]);

    f.render_widget(Paragraph::new(status_line(state)), rows[2]);
    draw_buttons(f, rows[3], state);

    if let Some(modal) = &state.modal {
        match modal {
            Modal::ConfirmCancel => draw_cancel_modal(f, window_area, state),
            Modal::Message { title, body } => draw_message_modal(f, window_area, title, body),
        }
    }
}

fn centered_window(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width.saturating_sub(2)).max(60).min(area.width);
    let h = height.min(area.height.saturating_sub(2)).max(20).min(area.height);
    let x = area.x + (area.width.saturating_sub(w)) / 2;
    let y = area.y + (area.height.saturating_sub(h)) / 2;
    Rect {
        x,
        y,
        width: w,
        height: h,
    }
}

fn draw_nav(f: &mut ratatui::Frame<'_>, area: Rect, state: &WizardState) {
    let lines: Vec<Line> = state
        .nav
        .iter()
        .map(|item| {
            let entry = nav_entry(*item);
            let text = format!(" {} {}", entry.glyph.symbol(), entry.label);
            if *item == state.active_nav {
                Line::from(Span::styled(
                    text,
                    Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED),
                ))
            } else {
                Line::from(text)
            }
        })
        .collect();
    let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
    f.render_widget(p, area);
}

fn draw_tabs(f: &mut ratatui::Frame<'_>, area: Rect, state: &WizardState) {
    let mut spans = Vec::new();
    for step in state.wizard.steps() {
        let complete = state
            .wizard
            .schema()
            .validate_step(state.wizard.form(), step)
            .is_valid();
        let mark = if complete { " ✓" } else { "" };
        let label = format!(" F{} {}{} ", step.ordinal, step.label, mark);
        let style = if step.ordinal == state.wizard.current() {
            Style::default().add_modifier(Modifier::REVERSED | Modifier::BOLD)
        } else {
            Style::default()
        };
        spans.push(Span::styled(label, style));
        spans.push(Span::raw(" "));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn field_value_text(state: &WizardState, name: &str, kind: &FieldKind) -> String {
    let input = state.inputs.get(name);
    let raw = input.map(|i| i.display()).unwrap_or_default();
    match kind {
        FieldKind::Choice(_) => {
            if raw.trim().is_empty() {
                "< Select >".to_string()
            } else {
                format!("< {} >", raw)
            }
        }
        FieldKind::Files => {
            let files = state
                .wizard
                .form()
                .get(name)
                .map(|v| v.files().to_vec())
                .unwrap_or_default();
            if files.is_empty() && raw.trim().is_empty() {
                "(paths, comma-separated)".to_string()
            } else {
                raw
            }
        }
        FieldKind::Date if raw.is_empty() => "YYYY-MM-DD".to_string(),
        _ => raw,
    }
}

fn field_lines(state: &WizardState) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for (i, name) in step_fields(state).iter().enumerate() {
        let Some(spec) = state.wizard.schema().field(name) else {
            continue;
        };
        let focused = state.focus == FocusTarget::Field(i);
        let marker = match spec.presence {
            Presence::Required => " *",
            _ => "",
        };
        let label = format!("{}{}", spec.label, marker);
        let value = field_value_text(state, name, &spec.kind);
        let value = if value.chars().count() > VALUE_WIDTH {
            let tail: String = value
                .chars()
                .skip(value.chars().count() - VALUE_WIDTH + 1)
                .collect();
            format!("…{}", tail)
        } else {
            value
        };
        let value_style = if focused {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::styled(
                format!("{:<width$}", label, width = LABEL_WIDTH),
                if focused {
                    Style::default().add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                },
            ),
            Span::styled(
                format!("[ {:<width$} ]", value, width = VALUE_WIDTH),
                value_style,
            ),
        ]));
        if state.touched.contains(name) {
            if let Some(err) = state.wizard.validation().error_for(name) {
                lines.push(Line::from(Span::styled(
                    format!("{:<width$}! {}", "", err, width = LABEL_WIDTH),
                    Style::default().fg(Color::Red),
                )));
            }
        }
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Tab/Up/Down move  Left/Right choose  F1-F9 tabs  Esc cancel",
        Style::default().fg(Color::DarkGray),
    )));
    lines
}

fn success_lines(panel: &SuccessPanel, now: Instant) -> Vec<Line<'static>> {
    let remaining = panel.redirect_at.saturating_duration_since(now);
    let secs = remaining.as_millis().div_ceil(1000);
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "Thank you! Your submission was received.",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    if let Some(id) = &panel.reference {
        lines.push(Line::from(format!("Reference: {}", id)));
    }
    lines.push(Line::from(format!("Returning in {}s...", secs)));
    lines
}

fn status_line(state: &WizardState) -> Line<'static> {
    if state.wizard.submission_state() == SubmissionState::InFlight {
        return Line::from(format!(
            "{} Submitting...",
            SPINNER[state.tick % SPINNER.len()]
        ));
    }
    match &state.notice {
        Some(n) => Line::from(Span::styled(n.clone(), Style::default().fg(Color::Yellow))),
        None => Line::from(""),
    }
}

fn draw_buttons(f: &mut ratatui::Frame<'_>, area: Rect, state: &WizardState) {
    let back = button_text(
        "Back",
        state.focus == FocusTarget::Button(ButtonFocus::Back),
        can_go_back(state),
    );
    let next = button_text(
        next_label(state),
        state.focus == FocusTarget::Button(ButtonFocus::Next),
        can_go_next(state),
    );
    let cancel = button_text(
        "Cancel",
        state.focus == FocusTarget::Button(ButtonFocus::Cancel),
        can_cancel(state),
    );

    let line = Line::from(vec![back, Span::raw(" "), next, Span::raw(" "), cancel]);
    let p = Paragraph::new(Text::from(line)).alignment(Alignment::Right);
    f.render_widget(p, area);
}

fn button_text(label: &str, focused: bool, enabled: bool) -> Span<'static> {
    let mut style = Style::default();
    if !enabled {
        style = style.fg(Color::DarkGray);
    }
    if focused && enabled {
        style = style.add_modifier(Modifier::REVERSED);
    }
    Span::styled(format!("[ {} ]", label), style)
}

fn modal_area(window_area: Rect, width: u16, height: u16) -> Rect {
    let modal_w = width.min(window_area.width.saturating_sub(4)).max(40);
    let modal_h = height.min(window_area.height.saturating_sub(4)).max(7);
    Rect {
        x: window_area.x + (window_area.width.saturating_sub(modal_w)) / 2,
        y: window_area.y + (window_area.height.saturating_sub(modal_h)) / 2,
        width: modal_w,
        height: modal_h,
    }
}

fn draw_cancel_modal(f: &mut ratatui::Frame<'_>, window_area: Rect, state: &WizardState) {
    let area = modal_area(window_area, 56, 7);
    f.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title("Discard this form?");
    let body = Paragraph::new(Text::from(vec![
        Line::from("If you cancel now, everything entered so far is lost."),
        Line::from(""),
        Line::from(""),
    ]))
    .block(block)
    .wrap(Wrap { trim: false });
    f.render_widget(body, area);

    // Buttons: [Yes, discard] [No] (primary on right)
    let buttons_area = Rect {
        x: area.x + 1,
        y: area.y + area.height - 2,
        width: area.width - 2,
        height: 1,
    };
    let reversed_if = |on: bool| {
        if on {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        }
    };
    let yes = Span::styled(
        "[ Yes, discard ]",
        reversed_if(state.modal_focus == ButtonFocus::Cancel),
    );
    let no = Span::styled("[ No ]", reversed_if(state.modal_focus == ButtonFocus::Next));
    let line = Line::from(vec![yes, Span::raw(" "), no]);
    f.render_widget(
        Paragraph::new(Text::from(line)).alignment(Alignment::Right),
        buttons_area,
    );
}

fn draw_message_modal(f: &mut ratatui::Frame<'_>, window_area: Rect, title: &str, body: &str) {
    let area = modal_area(window_area, 70, 9);
    f.render_widget(Clear, area);

    let block = Block::default().borders(Borders::ALL).title(title.to_string());
    let p = Paragraph::new(Text::from(body.to_string()))
        .block(block)
        .wrap(Wrap { trim: false });
    f.render_widget(p, area);

    let buttons_area = Rect {
        x: area.x + 1,
        y: area.y + area.height - 2,
        width: area.width - 2,
        height: 1,
    };
    let ok = Span::styled("[ OK ]", Style::default().add_modifier(Modifier::REVERSED));
    f.render_widget(
        Paragraph::new(Text::from(Line::from(vec![ok]))).alignment(Alignment::Right),
        buttons_area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::wizard::FormState;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubSubmitter {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Submitter for StubSubmitter {
        async fn submit(
            &self,
            _form: &FormState,
            _attachments: &[FileRef],
        ) -> Result<SubmitReceipt, SubmitError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(SubmitError::generic("HTTP 502"))
            } else {
                Ok(SubmitReceipt {
                    id: Some("apt-42".into()),
                    message: None,
                })
            }
        }
    }

    fn stub(fail: bool) -> (Arc<StubSubmitter>, Arc<dyn Submitter>) {
        let s = Arc::new(StubSubmitter {
            calls: AtomicUsize::new(0),
            fail,
        });
        let dynamic: Arc<dyn Submitter> = s.clone();
        (s, dynamic)
    }

    fn booking_state() -> WizardState {
        let wizard =
            maintenance_booking::new_booking(None, Default::default()).expect("booking wizard");
        WizardState::new(wizard, Some(Role::Customer), WizardKind::MaintenanceBooking)
    }

    fn press(
        state: &mut WizardState,
        keys: &[KeyCode],
        tx: &mpsc::Sender<UiMsg>,
        submitter: &Arc<dyn Submitter>,
    ) {
        for k in keys {
            handle_key(state, *k, tx, submitter);
        }
    }

    fn render(state: &WizardState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| draw(f.size(), f, state)).unwrap();
        let buf = terminal.backend().buffer().clone();
        let mut out = String::new();
        for y in 0..buf.area.height {
            for x in 0..buf.area.width {
                out.push_str(buf.get(x, y).symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn next_on_incomplete_step_stays_and_reveals_errors() {
        // INTENT: Next validates the current step before moving.
        let (_s, submitter) = stub(false);
        let (tx, _rx) = mpsc::channel();
        let mut state = booking_state();
        state.focus = FocusTarget::Button(ButtonFocus::Next);

        press(&mut state, &[KeyCode::Enter], &tx, &submitter);

        assert_eq!(state.wizard.current(), 1, "must not advance past an invalid step");
        assert!(state.touched.contains("serviceType"));
        let screen = render(&state);
        assert!(screen.contains("Service is required."), "{}", screen);
    }

    #[test]
    fn choosing_a_service_then_next_advances_to_first_field() {
        let (_s, submitter) = stub(false);
        let (tx, _rx) = mpsc::channel();
        let mut state = booking_state();

        assert_eq!(state.focus, FocusTarget::Field(0));
        press(&mut state, &[KeyCode::Right], &tx, &submitter);
        assert_eq!(state.wizard.form().get_str("serviceType"), "Oil Change");

        state.focus = FocusTarget::Button(ButtonFocus::Next);
        press(&mut state, &[KeyCode::Enter], &tx, &submitter);
        assert_eq!(state.wizard.current(), 2);
        assert_eq!(state.focus, FocusTarget::Field(0));
        assert_eq!(state.scroll, 0);
    }

    #[test]
    fn forward_moves_reset_scroll_but_back_keeps_it() {
        let (_s, submitter) = stub(false);
        let (tx, _rx) = mpsc::channel();
        let mut state = booking_state();

        state.scroll = 8;
        press(&mut state, &[KeyCode::F(3)], &tx, &submitter);
        assert_eq!(state.wizard.current(), 3);
        assert_eq!(state.scroll, 0, "tab jump returns to the top");

        state.scroll = 8;
        state.focus = FocusTarget::Button(ButtonFocus::Back);
        press(&mut state, &[KeyCode::Enter], &tx, &submitter);
        assert_eq!(state.wizard.current(), 2);
        assert_eq!(state.scroll, 8);
    }

    #[test]
    fn function_keys_jump_tabs_without_validation() {
        let (_s, submitter) = stub(false);
        let (tx, _rx) = mpsc::channel();
        let mut state = booking_state();

        press(&mut state, &[KeyCode::F(3)], &tx, &submitter);
        assert_eq!(state.wizard.current(), 3);
        press(&mut state, &[KeyCode::F(9)], &tx, &submitter);
        assert_eq!(state.wizard.current(), 3, "F9 is out of range for four steps");

        let screen = render(&state);
        assert!(screen.contains("Step 3 of 4: Vehicle"), "{}", screen);
        assert!(screen.contains("F4 Contact"), "{}", screen);
    }

    #[test]
    fn typing_updates_form_and_revalidates() {
        let (_s, submitter) = stub(false);
        let (tx, _rx) = mpsc::channel();
        let mut state = booking_state();
        press(&mut state, &[KeyCode::F(4)], &tx, &submitter);

        let keys: Vec<KeyCode> = "Zoë".chars().map(KeyCode::Char).collect();
        press(&mut state, &keys, &tx, &submitter);
        press(&mut state, &[KeyCode::Left, KeyCode::Backspace], &tx, &submitter);

        assert_eq!(state.wizard.form().get_str("name"), "Zë");
        assert!(state.wizard.validation().error_for("name").is_none());
    }

    #[test]
    fn submit_runs_once_on_worker_and_shows_success() {
        // INTENT: a second Enter while the first submission is in flight must not dispatch.
        let (stub_impl, submitter) = stub(false);
        let (tx, rx) = mpsc::channel();
        let mut wizard = maintenance_booking::new_booking(None, Default::default()).unwrap();
        smoke_seed(WizardKind::MaintenanceBooking, &mut wizard);
        let mut state = WizardState::new(wizard, None, WizardKind::MaintenanceBooking);

        press(&mut state, &[KeyCode::F(4)], &tx, &submitter);
        state.focus = FocusTarget::Button(ButtonFocus::Next);
        press(&mut state, &[KeyCode::Enter, KeyCode::Enter], &tx, &submitter);
        assert_eq!(state.wizard.submission_state(), SubmissionState::InFlight);
        assert!(render(&state).contains("Submitting..."));

        let msg = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("worker reports back");
        apply_message(&mut state, msg);
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
        assert_eq!(stub_impl.calls.load(Ordering::SeqCst), 1);

        assert_eq!(state.wizard.submission_state(), SubmissionState::Succeeded);
        let screen = render(&state);
        assert!(screen.contains("Reference: apt-42"), "{}", screen);

        let redirect_at = state.success.as_ref().map(|p| p.redirect_at).unwrap();
        check_redirect(&mut state, redirect_at - Duration::from_millis(1));
        assert_eq!(state.exit, None);
        check_redirect(&mut state, redirect_at);
        assert_eq!(state.exit, Some(Exit::Redirected));
    }

    #[test]
    fn failed_submit_shows_modal_and_keeps_inputs() {
        let (_s, submitter) = stub(true);
        let (tx, rx) = mpsc::channel();
        let mut wizard = maintenance_booking::new_booking(None, Default::default()).unwrap();
        smoke_seed(WizardKind::MaintenanceBooking, &mut wizard);
        let mut state = WizardState::new(wizard, None, WizardKind::MaintenanceBooking);
        let before = state.wizard.form().clone();

        press(&mut state, &[KeyCode::F(4)], &tx, &submitter);
        state.focus = FocusTarget::Button(ButtonFocus::Next);
        press(&mut state, &[KeyCode::Enter], &tx, &submitter);
        let msg = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        apply_message(&mut state, msg);

        assert_eq!(state.wizard.submission_state(), SubmissionState::Failed);
        assert!(matches!(state.modal, Some(Modal::Message { .. })));
        assert_eq!(*state.wizard.form(), before);
        assert!(can_go_next(&state), "submit is enabled again after a failure");

        press(&mut state, &[KeyCode::Enter], &tx, &submitter);
        assert!(state.modal.is_none());
    }

    #[test]
    fn disabled_submit_jumps_to_first_invalid_step() {
        let (s, submitter) = stub(false);
        let (tx, _rx) = mpsc::channel();
        let mut state = booking_state();
        press(&mut state, &[KeyCode::F(4)], &tx, &submitter);
        state.focus = FocusTarget::Button(ButtonFocus::Next);
        assert!(!can_go_next(&state));

        press(&mut state, &[KeyCode::Enter], &tx, &submitter);
        assert_eq!(state.wizard.current(), 1);
        assert_eq!(state.wizard.submission_state(), SubmissionState::Idle);
        assert_eq!(s.calls.load(Ordering::SeqCst), 0);
        assert!(state.notice.is_some());
    }

    #[test]
    fn cancel_needs_confirmation() {
        let (_s, submitter) = stub(false);
        let (tx, _rx) = mpsc::channel();
        let mut state = booking_state();

        press(&mut state, &[KeyCode::Esc], &tx, &submitter);
        assert_eq!(state.modal, Some(Modal::ConfirmCancel));
        press(&mut state, &[KeyCode::Enter], &tx, &submitter);
        assert_eq!(state.modal, None);
        assert_eq!(state.exit, None, "default answer is No");

        press(&mut state, &[KeyCode::Esc, KeyCode::Left, KeyCode::Enter], &tx, &submitter);
        assert_eq!(state.exit, Some(Exit::Cancelled));
    }

    #[test]
    fn smoke_targets_render() {
        for target in [
            "vehicle",
            "vehicle:4",
            "booking:2",
            "booking:submitting",
            "booking:success",
            "profile:failed",
        ] {
            smoke(target).unwrap_or_else(|e| panic!("smoke {} failed: {}", target, e));
        }
        assert!(smoke("checkout").is_err());
        assert!(smoke("booking:7").is_err());
    }

    #[test]
    fn nav_panel_highlights_active_section() {
        let state = new_smoke_wizard_state("vehicle").unwrap();
        let screen = render(&state);
        assert!(screen.contains("Vehicles"));
        assert!(!screen.contains("Dashboard"), "customers do not see admin items");
        assert!(screen.contains("Storefront: List a vehicle"));
    }
}
