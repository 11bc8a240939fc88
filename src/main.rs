use std::io::{Read, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use chonker::config::{
    status_line_command, ClaudeSettingsFile, Command, Config, InstallOutcome, Settings,
};
use chonker::{Rendered, StatusLine};
use chonker_core::usage::shutdown_within;
use chonker_core::ChonkerPaths;

/// Extra time past the fetch timeout to let a background refresh finish
const PENDING_REFRESH_SLACK: Duration = Duration::from_secs(1);

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Config::parse_args();

    // Setup logging
    setup_logging(cli.debug);

    let paths = ChonkerPaths::from_home().unwrap_or_else(ChonkerPaths::fallback);

    match cli.command.clone() {
        None => render(&cli, &paths),
        Some(Command::Install { hook }) => install(&paths, hook),
        Some(Command::Uninstall) => uninstall(&paths),
    }
}

/// Render the status line from stdin and print it
///
/// The runtime is built here rather than by `#[tokio::main]` so a refresh
/// stuck on the blocking pool cannot keep the process alive past its wait.
fn render(cli: &Config, paths: &ChonkerPaths) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let mut raw = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut raw) {
        debug!("Failed to read stdin: {}", e);
        raw.clear();
    }

    // Load settings
    let config_path = cli.config.clone().unwrap_or_else(|| paths.config_file());
    let mut settings = Settings::load(&config_path);
    settings.merge_cli(cli);
    settings.validate();
    let fetch_timeout = settings.usage_policy().fetch_timeout;

    let status_line = StatusLine::new(paths, settings);
    let Rendered { text, pending } = runtime.block_on(status_line.render(&raw));

    let mut stdout = std::io::stdout().lock();
    let _ = writeln!(stdout, "{}", text);
    let _ = stdout.flush();
    drop(stdout);

    // Output is already visible; give a slow refresh the chance to warm the cache
    if !shutdown_within(runtime, pending, fetch_timeout + PENDING_REFRESH_SLACK) {
        debug!("Exiting with usage refresh still running");
    }
    Ok(())
}

fn install(paths: &ChonkerPaths, hook: bool) -> Result<()> {
    let exe = std::env::current_exe().context("Failed to locate the chonker executable")?;
    let command = status_line_command(&exe);
    let settings = ClaudeSettingsFile::new(paths.claude_settings_file());
    let outcome = settings.install(&command)?;

    if hook {
        let message = match outcome {
            InstallOutcome::AlreadyInstalled => "chonker context meter is active on status line",
            _ => "chonker context meter installed and active on status line",
        };
        println!("{}", serde_json::json!({ "additionalContext": message }));
        return Ok(());
    }

    match outcome {
        InstallOutcome::AlreadyInstalled => {
            println!("chonker is already configured in {}", settings.path().display());
        }
        _ => {
            println!();
            println!("  chonker installed");
            println!();
            println!("  status line configured in {}", settings.path().display());
            println!("  restart claude code to see the meter");
            println!();
        }
    }
    Ok(())
}

fn uninstall(paths: &ChonkerPaths) -> Result<()> {
    let exe = std::env::current_exe().context("Failed to locate the chonker executable")?;
    let settings = ClaudeSettingsFile::new(paths.claude_settings_file());

    match settings.uninstall(&status_line_command(&exe))? {
        InstallOutcome::Removed => {
            println!("chonker removed from {}", settings.path().display());
        }
        _ => {
            println!("chonker is not configured in {}", settings.path().display());
        }
    }
    Ok(())
}

fn setup_logging(debug: bool) {
    let default_filter = if debug {
        "chonker=debug,chonker_core=debug"
    } else {
        "chonker=warn,chonker_core=warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // stdout belongs to the status line
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
