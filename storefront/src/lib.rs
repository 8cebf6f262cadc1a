// Storefront wizards
// Main library entry point

pub mod api;
pub mod config;
pub mod forms;
pub mod models;
pub mod tui;
pub mod utils;
pub mod wizard;

use config::AppConfig;
use log::{error, info};
use models::responses::Role;
use models::state::{AppState, Session};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Initialize logging system with dual format (JSON + human-readable)
fn init_logging(
    log_dir_override: Option<&Path>,
    with_stdout: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let log_dir = utils::path_resolver::resolve_log_folder(log_dir_override)?;

    let timestamp = chrono::Utc::now().format("%Y-%m-%d-%H%M%S");

    // JSON log file for structured parsing
    let json_log_file = log_dir.join(format!("storefront-{}.log", timestamp));

    // Human-readable log file (.txt)
    let txt_log_file = log_dir.join(format!("storefront-{}.txt", timestamp));

    // - JSON format to .log file
    // - Human-readable format to .txt file
    // - Optional: human-readable to stdout (disabled for TUI to avoid corrupting the terminal UI)
    let mut dispatch = fern::Dispatch::new()
        .level(log::LevelFilter::Debug)
        .level_for("hyper", log::LevelFilter::Info)
        .level_for("reqwest", log::LevelFilter::Info);

    if with_stdout {
        dispatch = dispatch.chain(
            fern::Dispatch::new()
                .level(log::LevelFilter::Info)
                .format(move |out, message, record| {
                    let timestamp_local = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
                    let message_str = format!("{}", message);
                    let (phase, step, cleaned_message) =
                        utils::logging::parse_log_metadata(&message_str);
                    let txt_line = utils::logging::format_human_readable_log(
                        &timestamp_local.to_string(),
                        record.level(),
                        record.target(),
                        &cleaned_message,
                        phase.as_deref(),
                        step.as_deref(),
                    );
                    out.finish(format_args!("{}", txt_line));
                })
                .chain(std::io::stdout()),
        );
    }

    dispatch = dispatch
        .chain(
            fern::Dispatch::new()
                .format(move |out, message, record| {
                    let timestamp_utc = chrono::Utc::now().to_rfc3339();
                    let message_str = format!("{}", message);
                    let (phase, step, cleaned_message) =
                        utils::logging::parse_log_metadata(&message_str);
                    let json_line = utils::logging::format_json_log(
                        &timestamp_utc,
                        record.level(),
                        record.target(),
                        &cleaned_message,
                        phase.as_deref(),
                        step.as_deref(),
                    );
                    out.finish(format_args!("{}\n", json_line));
                })
                .chain(fern::log_file(json_log_file)?),
        )
        .chain(
            fern::Dispatch::new()
                .format(move |out, message, record| {
                    let timestamp_local = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
                    let message_str = format!("{}", message);
                    let (phase, step, cleaned_message) =
                        utils::logging::parse_log_metadata(&message_str);
                    let txt_line = utils::logging::format_human_readable_log(
                        &timestamp_local.to_string(),
                        record.level(),
                        record.target(),
                        &cleaned_message,
                        phase.as_deref(),
                        step.as_deref(),
                    );
                    out.finish(format_args!("{}\n", txt_line));
                })
                .chain(fern::log_file(txt_log_file)?),
        );

    dispatch.apply()?;

    log::info!(
        "[PHASE: initialization] Logging initialized, log directory: {:?}",
        log_dir
    );
    Ok(())
}

/// Credentials handed over on the command line (or via STOREFRONT_TOKEN).
#[derive(Debug, Clone)]
pub struct CliSession {
    pub user_id: String,
    pub token: String,
}

fn load_config(config_path: Option<&Path>) -> AppConfig {
    let default_path = utils::path_resolver::default_config_file();
    let path: PathBuf = config_path
        .map(Path::to_path_buf)
        .unwrap_or(default_path);
    match AppConfig::load(Some(&path)) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Storefront: configuration error: {:#}", e);
            std::process::exit(2);
        }
    }
}

/// Print the effective configuration as TOML and exit.
pub fn print_config(config_path: Option<PathBuf>) {
    let cfg = load_config(config_path.as_deref());
    match cfg.to_toml_string() {
        Ok(s) => print!("{}", s),
        Err(e) => {
            eprintln!("Storefront: {:#}", e);
            std::process::exit(1);
        }
    }
}

pub fn run_tui(config_path: Option<PathBuf>, launch: tui::Launch, session: Option<CliSession>) {
    let cfg = load_config(config_path.as_deref());

    // Initialize logging (no stdout to avoid corrupting the TUI)
    if let Err(e) = init_logging(cfg.log_dir.as_deref(), false) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    info!(
        "[PHASE: initialization] Storefront TUI starting at {} api={}",
        chrono::Utc::now(),
        cfg.api_base_url
    );

    let app_state = Arc::new(AppState::default());
    if let Some(s) = session {
        let rt = match tokio::runtime::Builder::new_current_thread().build() {
            Ok(rt) => rt,
            Err(e) => {
                error!("[PHASE: initialization] [STEP: session] Runtime error: {}", e);
                eprintln!("Storefront error: {}", e);
                std::process::exit(1);
            }
        };
        rt.block_on(app_state.sign_in(Session {
            display_name: s.user_id.clone(),
            user_id: s.user_id,
            role: Role::Customer,
            token: s.token,
        }));
        info!("[PHASE: initialization] [STEP: session] Signed in from command line");
    }

    if let Err(e) = tui::run(&cfg, app_state, launch) {
        error!("[PHASE: tui] [STEP: fatal] TUI exited with error: {:?}", e);
        eprintln!("Storefront error: {:#}", e);
        std::process::exit(1);
    }
}

/// Non-interactive TUI smoke mode (for automated checks).
/// Renders a single frame and exits.
pub fn run_tui_smoke(target: Option<String>) {
    // Initialize logging (no stdout to avoid corrupting the terminal)
    let cfg = load_config(None);
    if let Err(e) = init_logging(cfg.log_dir.as_deref(), false) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    info!(
        "[PHASE: initialization] Headless TUI smoke starting at {}",
        chrono::Utc::now()
    );

    let target = target.as_deref().unwrap_or("booking");
    if let Err(e) = tui::smoke(target) {
        error!(
            "[PHASE: tui] [STEP: smoke] TUI smoke exited with error: {:?}",
            e
        );
        eprintln!("Storefront error: {}", e);
        std::process::exit(1);
    }
}
