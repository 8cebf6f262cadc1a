use std::path::PathBuf;
use storefront_wizard::forms::WizardKind;
use storefront_wizard::tui::Launch;
use storefront_wizard::CliSession;

fn flag_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    let prefix = format!("{}=", name);
    args.iter()
        .find_map(|a| a.strip_prefix(prefix.as_str()))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let config_path = flag_value(&args, "--config").map(PathBuf::from);

    // Print the effective configuration (defaults + file + STOREFRONT_* env) and exit.
    if args.iter().any(|a| a == "--print-config") {
        storefront_wizard::print_config(config_path);
        return;
    }

    // Non-interactive TUI smoke test mode (for automated checks).
    // Renders a single frame for a wizard/step and exits 0.
    // Usage: --tui-smoke or --tui-smoke=vehicle|booking|profile[:<step>|:submitting|:success|:failed]
    if let Some(arg) = args
        .iter()
        .find(|a| a.as_str() == "--tui-smoke" || a.starts_with("--tui-smoke="))
    {
        let target = arg
            .split_once('=')
            .map(|(_, v)| v.to_string())
            .filter(|v| !v.trim().is_empty());
        storefront_wizard::run_tui_smoke(target);
        return;
    }

    let kind = match flag_value(&args, "--wizard").unwrap_or("booking").parse::<WizardKind>() {
        Ok(k) => k,
        Err(e) => {
            eprintln!("Storefront: {}", e);
            std::process::exit(2);
        }
    };
    let edit_id = flag_value(&args, "--edit").map(str::to_string);

    let token = flag_value(&args, "--token")
        .map(str::to_string)
        .or_else(|| std::env::var("STOREFRONT_TOKEN").ok())
        .filter(|t| !t.trim().is_empty());
    let session = match (flag_value(&args, "--user"), token) {
        (Some(user_id), Some(token)) => Some(CliSession {
            user_id: user_id.to_string(),
            token,
        }),
        (Some(_), None) => {
            eprintln!("Storefront: --user requires --token=<token> or STOREFRONT_TOKEN");
            std::process::exit(2);
        }
        _ => None,
    };

    storefront_wizard::run_tui(config_path, Launch { kind, edit_id }, session);
}
