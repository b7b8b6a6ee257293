mod config;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use servertail_logs::{LogService, LogSource, PushRecord, PushScheduler, TailScheduler, capture_layer};
use servertail_tui::{
    Action, AppState, EventHandler, HelpOverlay, KeyBindings, LogViewerScreen, PAGE_SIZE, Streams,
    Tui,
};

use config::{AppConfig, CONSOLE_SOURCE};

/// Servertail - tails, classifies and filters a game server's console log
#[derive(Parser, Debug)]
#[command(name = "servertail")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (defaults to ./servertail.toml when present)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Console log file, overrides the `console` source
    #[arg(long, global = true, value_name = "PATH")]
    console: Option<PathBuf>,

    /// Poll interval in milliseconds
    #[arg(long, global = true)]
    interval_ms: Option<u64>,

    /// Console lines kept in memory
    #[arg(long, global = true)]
    retention: Option<usize>,

    /// Lines loaded when the viewer starts
    #[arg(long, global = true)]
    initial_lines: Option<usize>,

    /// Log filter directive (RUST_LOG still wins)
    #[arg(long, global = true)]
    log_filter: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// Interactive viewer (default)
    Watch,

    /// Print the last lines of a source and the offset to resume from
    Snapshot {
        #[arg(long, default_value = CONSOLE_SOURCE)]
        source: String,

        /// Lines to return (defaults to initial_lines)
        #[arg(long)]
        lines: Option<usize>,
    },

    /// Print the complete lines written after an offset
    Fetch {
        #[arg(long, default_value = CONSOLE_SOURCE)]
        source: String,

        /// Offset returned by a previous snapshot or fetch
        offset: u64,
    },

    /// Truncate a source file
    Clear {
        #[arg(long, default_value = CONSOLE_SOURCE)]
        source: String,
    },
}

impl Args {
    fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(console) = &self.console {
            config.sources.insert(CONSOLE_SOURCE.to_string(), console.clone());
        }
        if let Some(interval) = self.interval_ms {
            config.poll_interval_ms = interval;
        }
        if let Some(retention) = self.retention {
            config.retention = retention;
        }
        if let Some(lines) = self.initial_lines {
            config.initial_lines = lines;
        }
        if let Some(filter) = &self.log_filter {
            config.log_filter = filter.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = AppConfig::load(args.config.as_deref())?;
    args.apply_overrides(&mut config);
    config.validate()?;

    let command = args.command.clone().unwrap_or(Commands::Watch);
    let result = match command {
        Commands::Watch => {
            // The terminal belongs to the viewer; our own events go to the
            // internal stream instead of stderr.
            let (layer, records) = capture_layer();
            tracing_subscriber::registry()
                .with(env_filter(&config))
                .with(layer)
                .init();
            run_watch(config, records).await
        }
        command => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter(&config))
                .with_writer(std::io::stderr)
                .init();
            run_command(&config, command)
        }
    };

    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

fn env_filter(config: &AppConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter))
}

/// One-shot service calls, printed as JSON
fn run_command(config: &AppConfig, command: Commands) -> Result<()> {
    let service = LogService::new(config.registry(), config.reader());

    let output = match command {
        Commands::Snapshot { source, lines } => {
            let snapshot = service.snapshot(&source, lines.unwrap_or(config.initial_lines))?;
            serde_json::to_string_pretty(&snapshot)?
        }
        Commands::Fetch { source, offset } => {
            let delta = service.fetch_since(&source, offset)?;
            serde_json::to_string_pretty(&delta)?
        }
        Commands::Clear { source } => {
            service.clear(&source)?;
            serde_json::to_string_pretty(&serde_json::json!({ "source": source, "cleared": true }))?
        }
        Commands::Watch => bail!("watch runs the interactive viewer"),
    };

    println!("{output}");
    Ok(())
}

async fn run_watch(config: AppConfig, records: mpsc::UnboundedReceiver<PushRecord>) -> Result<()> {
    let console = LogSource::new(CONSOLE_SOURCE, config.console_path()?);
    let streams = Streams::new(
        TailScheduler::spawn(console, config.tail_options()),
        PushScheduler::spawn(records, config.internal_retention),
        config.noise_filter()?,
    );
    streams.console.control().set_filtered(true);
    streams.internal.control().set_filtered(true);

    tracing::info!(
        console = %config.console_path()?.display(),
        interval_ms = config.poll_interval_ms,
        "servertail started"
    );

    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();
    let mut state = AppState::new();

    let mut tui = Tui::new().context("failed to initialise terminal")?;
    let mut events = EventHandler::new(Duration::from_millis(250));
    let keybindings = KeyBindings::new();

    render(&mut tui, &mut state, &streams)?;

    loop {
        tokio::select! {
            // Ticks and resizes map to nothing; the redraw below picks up
            // new lines and status changes
            Some(event) = events.next() => {
                let help_visible = state.ui_state.help_visible;
                if let Some(action) = keybindings.action_for_event(&event, help_visible) {
                    let _ = action_tx.send(action);
                }
            }

            Some(action) = action_rx.recv() => {
                handle_action(&mut state, &streams, action);
            }

            else => break,
        }

        if state.should_quit {
            break;
        }

        render(&mut tui, &mut state, &streams)?;
    }

    streams.shutdown();
    events.shutdown();
    tui.restore()?;

    Ok(())
}

fn handle_action(state: &mut AppState, streams: &Streams, action: Action) {
    let control = streams.control(state.active);

    match action {
        Action::Quit => state.should_quit = true,
        Action::ToggleHelp => state.ui_state.help_visible = !state.ui_state.help_visible,

        Action::TogglePause => control.toggle_pause(),
        Action::ForceRefresh => control.force_refresh(),
        Action::ToggleNoiseFilter => control.toggle_filtered(),
        Action::ClearLogs => {
            control.clear();
            state.reset_view();
        }
        Action::SwitchStream => state.switch_stream(),

        Action::ScrollUp(n) => state.scroll_up(n),
        Action::ScrollDown(n) => state.scroll_down(n),
        Action::PageUp => state.scroll_up(PAGE_SIZE),
        Action::PageDown => state.scroll_down(PAGE_SIZE),
        Action::ScrollToTop => state.scroll_to_top(),
        Action::ScrollToBottom => state.scroll_to_bottom(),
        Action::ToggleAutoScroll => state.toggle_auto_scroll(),
        Action::ToggleStats => state.ui_state.stats_visible = !state.ui_state.stats_visible,

        Action::ShowError(msg) => state.show_error(msg),
        Action::DismissError => state.dismiss_error(),
    }
}

fn render(tui: &mut Tui, state: &mut AppState, streams: &Streams) -> Result<()> {
    tui.terminal().draw(|frame| {
        LogViewerScreen::render(frame, state, streams);
        if state.ui_state.help_visible {
            HelpOverlay::render(frame);
        }
    })?;
    Ok(())
}
