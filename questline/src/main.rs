//! Quest player TUI application.
//!
//! A terminal interface for playing branching visual-novel quests.
//!
//! # Headless Mode
//!
//! Run with `--headless` to print a scripted playthrough transcript:
//!
//! ```bash
//! cargo run -p questline -- --headless --quest demo --choices 1
//! ```

mod app;
mod events;
mod ui;

use std::fs::File;
use std::io::stdout;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use questline_core::headless::{HeadlessConfig, HeadlessRunner};
use questline_core::QuestState;
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use app::App;
use events::{handle_event, EventResult};
use ui::render::render;

const LOG_FILE: &str = "questline.log";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    let quest = arg_value(&args, "--quest").unwrap_or_else(|| "demo".to_string());
    let root = arg_value(&args, "--root")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("content"));

    // Check for --headless mode
    if args.iter().any(|a| a == "--headless") {
        init_stderr_tracing();
        return run_headless(&args, quest, root);
    }

    // The terminal is the UI, so logs go to a file
    init_file_tracing()?;
    info!(quest = %quest, root = %root.display(), "quest TUI starting");

    // Setup terminal
    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, App::new(quest, root));

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;

    if let Err(e) = result {
        error!(error = %e, "TUI loop failed");
        eprintln!("Error: {e}");
    }
    info!("quest TUI stopped");

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
) -> std::io::Result<()> {
    app.start();

    loop {
        // Render
        terminal.draw(|f| render(f, &app))?;

        // Poll for events with timeout for animations
        if event::poll(Duration::from_millis(100))? {
            let ev = event::read()?;
            match handle_event(&mut app, ev) {
                EventResult::Quit => return Ok(()),
                EventResult::NeedsRedraw | EventResult::Continue => {}
            }
        } else {
            // Tick text reveals and the ending countdown
            app.tick();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn run_headless(
    args: &[String],
    quest: String,
    root: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let choices = match arg_value(args, "--choices") {
        Some(raw) => parse_choices(&raw)?,
        None => Vec::new(),
    };

    let config = HeadlessConfig::new(quest)
        .with_content_root(root)
        .with_choices(choices);

    let mut runner = HeadlessRunner::new(config);
    for entry in runner.run() {
        println!("{entry}");
    }

    if runner.session().state() == QuestState::Error {
        std::process::exit(1);
    }
    Ok(())
}

fn arg_value(args: &[String], name: &str) -> Option<String> {
    args.iter()
        .position(|a| a == name)
        .and_then(|index| args.get(index + 1))
        .cloned()
}

fn parse_choices(raw: &str) -> Result<Vec<usize>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .parse::<usize>()
                .map_err(|_| format!("invalid choice index: {entry}"))
        })
        .collect()
}

fn init_stderr_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn init_file_tracing() -> std::io::Result<()> {
    let file = File::create(LOG_FILE)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn print_help() {
    println!("Questline - branching visual-novel quest player");
    println!();
    println!("USAGE:");
    println!("  questline [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("  -h, --help        Show this help message");
    println!("  --quest <NAME>    Quest folder under the content root (default: demo)");
    println!("  --root <DIR>      Content root directory (default: content)");
    println!("  --headless        Print a scripted playthrough instead of the TUI");
    println!();
    println!("HEADLESS OPTIONS (only with --headless):");
    println!("  --choices <LIST>  Comma-separated option picks, e.g. 0,1 (default: first)");
    println!();
    println!("KEYS (TUI mode):");
    println!("  Enter/Space/click Advance dialog, or start playing from the menu");
    println!("  1-9               Pick a dialog option");
    println!("  Up/Down, j/k      Move the option highlight, Enter confirms");
    println!("  m                 Return to the menu (ending or error screen)");
    println!("  r                 Retry loading after an error");
    println!("  q, Ctrl-C         Quit");
    println!();
    println!("Logs go to {LOG_FILE} in TUI mode and stderr in headless mode.");
    println!("Set RUST_LOG to adjust verbosity, e.g. RUST_LOG=questline_core=debug.");
    println!();
    println!("EXAMPLES:");
    println!("  questline                                # Play the demo quest");
    println!("  questline --quest demo --headless");
    println!("  questline --headless --choices 1");
}
