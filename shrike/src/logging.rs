//! # Logging
//!
//! Structured logging for the engine, built on the `tracing` ecosystem.
//! Initialization is process-global and idempotent; the engine itself only
//! emits events and never installs a subscriber on its own.
//!
//! ```rust
//! use shrike::logging;
//!
//! // Default settings (INFO level, console output).
//! logging::init_default();
//!
//! // Or with custom settings.
//! logging::init(logging::LogConfig {
//!     level: tracing::Level::DEBUG,
//!     ..Default::default()
//! });
//! ```

use std::sync::Once;

use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

/// Configuration of the global subscriber.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum level to display.
    pub level: Level,
    /// Include file and line of the emitting event.
    pub show_file_line: bool,
    /// Include thread names and ids. Useful when reading interleaved worker
    /// output.
    pub show_thread_info: bool,
    /// Extra directives, `"target=level,target2=level2"` form. Applied on
    /// top of `RUST_LOG`.
    pub target_filters: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            show_file_line: false,
            show_thread_info: true,
            target_filters: None,
        }
    }
}

static INIT: Once = Once::new();

/// Installs the global subscriber. Safe to call multiple times; only the
/// first call takes effect.
pub fn init(config: LogConfig) {
    INIT.call_once(|| {
        let mut env_filter = EnvFilter::from_default_env().add_directive(config.level.into());
        if let Some(filters) = config.target_filters {
            for filter in filters.split(',') {
                if let Ok(directive) = filter.parse() {
                    env_filter = env_filter.add_directive(directive);
                }
            }
        }

        let subscriber = fmt()
            .with_env_filter(env_filter)
            .with_file(config.show_file_line)
            .with_line_number(config.show_file_line)
            .with_thread_names(config.show_thread_info)
            .with_thread_ids(config.show_thread_info)
            .finish();

        if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
            eprintln!("error setting global tracing subscriber: {err}");
        }
    });
}

/// Initializes with default settings.
pub fn init_default() {
    init(LogConfig::default());
}

/// Verbose settings for debugging runs.
pub fn init_development() {
    init(LogConfig {
        level: Level::DEBUG,
        show_file_line: true,
        ..Default::default()
    });
}

/// Quiet initialization for test binaries. Every test may call it; the
/// first one wins.
pub fn init_for_tests() {
    init(LogConfig {
        level: Level::WARN,
        show_thread_info: false,
        ..Default::default()
    });
}
