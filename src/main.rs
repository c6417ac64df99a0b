use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, mpsc};
use std::thread;

use anyhow::{Result, anyhow, bail};
use crossterm::{
    execute,
    event::{EnableMouseCapture, DisableMouseCapture},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{Terminal, backend::CrosstermBackend};

use latency_core::platform::create_platform;
use latency_core::types::{Command, OrchestratorState, TestKind};
use latency_core::{logger, orchestrator, pattern, settings::Settings, MagicPattern};

/// What this invocation should do.
#[derive(Debug, PartialEq)]
enum Action {
    PrintPattern,
    Headless { hex: String, kind: TestKind },
    Interactive,
}

#[derive(Debug, PartialEq)]
struct Cli {
    action: Action,
    verbose: bool,
}

fn parse_args(args: &[String]) -> Result<Cli> {
    let mut pattern = None;
    let mut mode = None;
    let mut random = false;
    let mut verbose = false;

    let mut it = args.iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--pattern" => pattern = Some(it.next().ok_or_else(|| anyhow!("--pattern needs a value"))?.clone()),
            "--mode" => {
                let m = it.next().ok_or_else(|| anyhow!("--mode needs a value"))?;
                mode = Some(
                    TestKind::from_arg(m)
                        .ok_or_else(|| anyhow!("unknown mode '{}' (expected js, scroll, pause or native)", m))?,
                );
            }
            "--random-pattern" => random = true,
            "--verbose" => verbose = true,
            other => bail!("unknown argument '{}'", other),
        }
    }

    let action = match (random, pattern) {
        (true, _) => Action::PrintPattern,
        (false, Some(hex)) => Action::Headless { hex, kind: mode.unwrap_or(TestKind::KeyLatency) },
        (false, None) => {
            if mode.is_some() {
                bail!("--mode only applies together with --pattern");
            }
            Action::Interactive
        }
    };
    Ok(Cli { action, verbose })
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = parse_args(&args)?;

    if cli.action == Action::PrintPattern {
        println!("{}", pattern::encode_hex(&MagicPattern::for_page()));
        return Ok(());
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    logger::init(&cwd.join("logs"), cli.verbose)?;
    let settings_path = cwd.join("settings.json");
    let settings = Settings::load(&settings_path);

    match cli.action {
        Action::Headless { hex, kind } => run_headless(&settings, &hex, kind),
        _ => run_tui(settings, settings_path),
    }
}

/// One test against a simulated page painting `hex`; the report goes to stdout
/// as JSON.
fn run_headless(settings: &Settings, hex: &str, kind: TestKind) -> Result<()> {
    let magic = pattern::decode_hex(hex)?;
    let mut platform = create_platform(&settings.simulation);
    let record = orchestrator::run_with_pattern(platform.as_mut(), &settings.engine, kind, magic);
    let report = record.outcome.map_err(|e| match logger::log_path() {
        Some(path) => anyhow!("{} (details in {})", e, path.display()),
        None => anyhow!(e),
    })?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_tui(settings: Settings, settings_path: PathBuf) -> Result<()> {
    let records = Arc::new(Mutex::new(Vec::new()));
    let orch_state = Arc::new(Mutex::new(OrchestratorState::Idle));
    let (log_tx, log_rx) = mpsc::channel::<String>();
    let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();

    logger::set_tui_sender(log_tx);
    logger::info("latency-bench started");
    if let Some(kind) = settings.last_test {
        logger::info(&format!("last run: {}", kind.label()));
    }

    // The platform lives on the orchestrator thread for the whole session.
    let platform = create_platform(&settings.simulation);
    let engine = settings.engine;
    let (orch_records, orch_run_state) = (Arc::clone(&records), Arc::clone(&orch_state));
    let orchestrator = thread::spawn(move || {
        orchestrator::orchestrate(orch_records, orch_run_state, platform, engine, cmd_rx);
    });

    let mut app = latency_tui::App::new(records, Arc::clone(&orch_state), log_rx, cmd_tx, settings_path);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let result = latency_tui::event::run(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    // Dropping the app closes the command channel. A running test is
    // abandoned, so only wait for the orchestrator when idle.
    drop(app);
    if *orch_state.lock().unwrap() == OrchestratorState::Idle {
        orchestrator.join().ok();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_flags_start_the_tui() {
        let cli = parse_args(&[]).unwrap();
        assert_eq!(cli, Cli { action: Action::Interactive, verbose: false });
    }

    #[test]
    fn pattern_defaults_to_keydown_mode() {
        let cli = parse_args(&args(&["--pattern", "8A36052D02C596DFA4C80711", "--verbose"])).unwrap();
        assert_eq!(
            cli.action,
            Action::Headless { hex: "8A36052D02C596DFA4C80711".into(), kind: TestKind::KeyLatency }
        );
        assert!(cli.verbose);
    }

    #[test]
    fn mode_selects_test_kind() {
        let cli = parse_args(&args(&["--mode", "scroll", "--pattern", "00"])).unwrap();
        assert_eq!(cli.action, Action::Headless { hex: "00".into(), kind: TestKind::ScrollLatency });
    }

    #[test]
    fn bad_arguments_are_rejected() {
        assert!(parse_args(&args(&["--mode", "warp"])).is_err());
        assert!(parse_args(&args(&["--mode", "js"])).is_err());
        assert!(parse_args(&args(&["--pattern"])).is_err());
        assert!(parse_args(&args(&["--frobnicate"])).is_err());
    }

    #[test]
    fn random_pattern_wins() {
        let cli = parse_args(&args(&["--pattern", "00", "--random-pattern"])).unwrap();
        assert_eq!(cli.action, Action::PrintPattern);
    }
}
