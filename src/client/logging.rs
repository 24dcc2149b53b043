// Logging configuration for the TalkTagger client

use std::path::PathBuf;
use std::sync::OnceLock;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::client::config::LoggingSettings;

// Flushes pending lines when dropped at exit
static LOG_GUARD: OnceLock<Vec<WorkerGuard>> = OnceLock::new();

/// Initialize logging with optional console and file outputs.
///
/// INFO by default, DEBUG for this crate; `RUST_LOG` overrides.
pub fn init_logging(enable_console: bool, log_file_path: Option<PathBuf>) {
    let mut guards = Vec::new();

    let mut filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();
    if let Ok(directive) = "talktagger_client=debug".parse::<Directive>() {
        filter = filter.add_directive(directive);
    }

    let file_layer = log_file_path.and_then(|path| {
        let parent = path.parent()?;
        let file_name = path.file_name()?.to_str()?;

        let file_appender = tracing_appender::rolling::never(parent, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        guards.push(guard);

        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(false),
        )
    });

    // Terminal UI owns stdout, so console logs go to stderr
    let console_layer = if enable_console {
        let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stderr());
        guards.push(guard);

        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_target(false),
        )
    } else {
        None
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init();

    let _ = LOG_GUARD.set(guards);
}

/// Initialize logging from the `[logging]` config section
pub fn init_from_settings(settings: &LoggingSettings, log_file_path: Option<PathBuf>) {
    init_logging(settings.console, log_file_path);
}
