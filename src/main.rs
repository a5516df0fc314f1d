//! Editor Bridge CLI - runs an embedded editor inside a terminal UI.
//!
//! This is the main binary entry point. See the `editor_bridge` library
//! for the core functionality.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use editor_bridge::surface::guard::{restore_terminal, TerminalGuard};
use editor_bridge::{ChildSession, Config, ProfileMetric, TerminalSurface, UiBridge, WireFormat};
use mimalloc::MiMalloc;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Global allocator configured per M-MIMALLOC-APPS guideline.
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Global flag for signal-triggered shutdown (as Arc for signal-hook compatibility)
static SHUTDOWN_FLAG: std::sync::LazyLock<Arc<AtomicBool>> =
    std::sync::LazyLock::new(|| Arc::new(AtomicBool::new(false)));

/// Report ordering for `--profile`, or `disable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ProfileMode {
    /// Number of calls
    Ncalls,
    /// Own time
    Tottime,
    /// Own time per call
    Percall,
    /// Time including nested scopes
    Cumtime,
    /// Scope name
    Name,
    /// No profiling
    Disable,
}

impl ProfileMode {
    fn metric(self) -> Option<ProfileMetric> {
        match self {
            Self::Ncalls => Some(ProfileMetric::CallCount),
            Self::Tottime => Some(ProfileMetric::TotalTime),
            Self::Percall => Some(ProfileMetric::PerCallTime),
            Self::Cumtime => Some(ProfileMetric::CumulativeTime),
            Self::Name => Some(ProfileMetric::Name),
            Self::Disable => None,
        }
    }
}

// CLI
#[derive(Parser)]
#[command(name = "editor-bridge")]
#[command(version = VERSION)]
#[command(about = "Terminal UI for an embedded editor session")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the editor and attach the terminal UI
    Run {
        /// Editor launch string (overrides config)
        #[arg(long)]
        editor_command: Option<String>,
        /// RPC framing on the editor's stdio: msgpack or json-lines
        #[arg(long)]
        wire_format: Option<WireFormat>,
        /// Profile the UI loop and print a report sorted by this column
        #[arg(long, value_enum, default_value_t = ProfileMode::Disable)]
        profile: ProfileMode,
        /// Initial grid width
        #[arg(long)]
        columns: Option<u16>,
        /// Initial grid height
        #[arg(long)]
        rows: Option<u16>,
        /// Extra arguments appended to the editor command
        #[arg(last = true)]
        extra: Vec<String>,
    },
    /// Print the effective configuration
    Config,
}

/// Launch the editor and run the bridge until the editor exits.
fn run(
    mut config: Config,
    editor_command: Option<String>,
    wire_format: Option<WireFormat>,
    profile: ProfileMode,
    size: (Option<u16>, Option<u16>),
    extra: &[String],
) -> Result<()> {
    if let Some(command) = editor_command {
        config.editor_command = command;
    }
    if let Some(wire_format) = wire_format {
        config.wire_format = wire_format;
    }
    let columns = size.0.unwrap_or(config.initial_columns);
    let rows = size.1.unwrap_or(config.initial_rows);
    let argv = config.editor_argv(extra)?;

    // Set up signal handlers
    use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
    use signal_hook::flag;
    flag::register(SIGINT, Arc::clone(&SHUTDOWN_FLAG))?;
    flag::register(SIGTERM, Arc::clone(&SHUTDOWN_FLAG))?;
    flag::register(SIGHUP, Arc::clone(&SHUTDOWN_FLAG))?;

    // Spawn BEFORE entering raw mode so errors are visible
    let session = ChildSession::spawn(&argv, config.wire_format)
        .with_context(|| format!("Failed to launch editor: {}", argv.join(" ")))?;
    log::info!("Editor running as pid {}", session.pid());

    let guard = TerminalGuard::enter().context("Failed to set up terminal")?;
    let terminal = Terminal::new(CrosstermBackend::new(std::io::stdout()))?;
    let surface = TerminalSurface::new(terminal).with_shutdown_flag(Arc::clone(&SHUTDOWN_FLAG));

    log::info!("Editor Bridge v{VERSION} started at {columns}x{rows}");
    let result = UiBridge::new(session, surface)
        .profile(profile.metric())
        .initial_size(columns, rows)
        .connect();

    // Restore the terminal before printing anything.
    drop(guard);

    match result {
        Ok(report) => {
            if let Some(report) = report {
                println!("{report}");
            }
            Ok(())
        }
        Err(e) => {
            if let Some(report) = &e.report {
                println!("{report}");
            }
            Err(e.into())
        }
    }
}

/// Send log output to a file so it never corrupts the UI.
fn init_logging(path: &Path) -> Result<()> {
    let log_file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create log file at {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .format_timestamp_millis()
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;
    init_logging(&config.log_path())?;

    // Set up panic hook to log panics and ensure terminal cleanup
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        log::error!("PANIC: {panic_info}");
        restore_terminal();
        default_hook(panic_info);
    }));

    match cli.command {
        Commands::Run {
            editor_command,
            wire_format,
            profile,
            columns,
            rows,
            extra,
        } => run(
            config,
            editor_command,
            wire_format,
            profile,
            (columns, rows),
            &extra,
        )?,
        Commands::Config => println!("{}", serde_json::to_string_pretty(&config)?),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_parses_profile_and_extra_args() {
        let cli = Cli::parse_from([
            "editor-bridge",
            "run",
            "--profile",
            "cumtime",
            "--columns",
            "100",
            "--",
            "notes.txt",
        ]);
        let Commands::Run {
            profile,
            columns,
            rows,
            extra,
            ..
        } = cli.command
        else {
            panic!("expected run");
        };
        assert_eq!(profile.metric(), Some(ProfileMetric::CumulativeTime));
        assert_eq!(columns, Some(100));
        assert_eq!(rows, None);
        assert_eq!(extra, vec!["notes.txt"]);
    }

    #[test]
    fn test_profile_defaults_to_disabled() {
        let cli = Cli::parse_from(["editor-bridge", "run"]);
        let Commands::Run {
            profile,
            wire_format,
            ..
        } = cli.command
        else {
            panic!("expected run");
        };
        assert_eq!(profile.metric(), None);
        assert_eq!(wire_format, None);
    }

    #[test]
    fn test_wire_format_flag() {
        let cli = Cli::parse_from(["editor-bridge", "run", "--wire-format", "json-lines"]);
        let Commands::Run { wire_format, .. } = cli.command else {
            panic!("expected run");
        };
        assert_eq!(wire_format, Some(WireFormat::JsonLines));
        assert!(Cli::try_parse_from(["editor-bridge", "run", "--wire-format", "xml"]).is_err());
    }
}
