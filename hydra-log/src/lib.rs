//! Logging setup for Hydra.
//!
//! Every Hydra crate logs through [`tracing`]. This crate owns the one place
//! where a subscriber gets installed, so binaries only call
//! [`LogConfig::from_env`] and [`LogConfig::init`] at startup.
//!
//! # Usage
//!
//! ```no_run
//! use hydra_log::{LogConfig, LogFormat, LogLevel, info};
//!
//! let _guard = LogConfig::from_env()
//!     .level(LogLevel::Debug)
//!     .format(LogFormat::Pretty)
//!     .init();
//!
//! info!(port = 3000, "server starting");
//! ```
//!
//! # Environment Variables
//!
//! - `HYDRA_DEBUG=1` - shorthand for debug level
//! - `HYDRA_LOG_LEVEL=trace|debug|info|warn|error` - minimum level
//! - `HYDRA_LOG_FORMAT=json|plain|pretty|compact` - output format
//! - `RUST_LOG` - full `EnvFilter` directive, wins over the level

use std::env;
use std::io;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

pub use tracing::{Level, debug, error, info, info_span, instrument, trace, warn};

// ============================================================================
// Levels and formats
// ============================================================================

/// Minimum level written by the subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parse a level name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    pub fn to_tracing_level(&self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line (default)
    Json,
    /// Plain single-line text
    Plain,
    /// Multi-line, colored output for development
    Pretty,
    /// Minimal single-line text
    Compact,
}

impl LogFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Some(LogFormat::Json),
            "plain" | "text" => Some(LogFormat::Plain),
            "pretty" => Some(LogFormat::Pretty),
            "compact" => Some(LogFormat::Compact),
            _ => None,
        }
    }
}

/// Where log lines go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    Stderr,
    /// Daily-rotated files in `directory`, named `prefix.YYYY-MM-DD`
    DailyFile { directory: String, prefix: String },
}

// ============================================================================
// Configuration
// ============================================================================

/// Subscriber configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,
    /// Include the event target (module path)
    pub targets: bool,
    /// Emit an event when a span closes, with its duration
    pub spans: bool,
    pub colors: bool,
    /// Explicit `EnvFilter` directive; overrides `level`
    pub env_filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Json,
            output: LogOutput::Stdout,
            targets: true,
            spans: false,
            colors: false,
            env_filter: None,
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from `HYDRA_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let debug = lookup("HYDRA_DEBUG")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let level = lookup("HYDRA_LOG_LEVEL")
            .and_then(|s| LogLevel::parse(&s))
            .unwrap_or(if debug { LogLevel::Debug } else { LogLevel::Info });

        let format = lookup("HYDRA_LOG_FORMAT")
            .and_then(|s| LogFormat::parse(&s))
            .unwrap_or(LogFormat::Json);

        Self {
            level,
            format,
            colors: format == LogFormat::Pretty && lookup("NO_COLOR").is_none(),
            ..Self::default()
        }
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    pub fn with_targets(mut self, enable: bool) -> Self {
        self.targets = enable;
        self
    }

    pub fn with_spans(mut self, enable: bool) -> Self {
        self.spans = enable;
        self
    }

    pub fn with_colors(mut self, enable: bool) -> Self {
        self.colors = enable;
        self
    }

    /// Set an explicit filter such as `"hydra_react=debug,hyper=info"`.
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    fn build_filter(&self) -> EnvFilter {
        if let Some(directive) = &self.env_filter {
            return EnvFilter::try_new(directive)
                .unwrap_or_else(|_| EnvFilter::new(self.level.as_str()));
        }
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.level.as_str()))
    }

    /// Install the global subscriber.
    ///
    /// The returned guard flushes buffered lines when dropped; keep it alive
    /// for the lifetime of the program. Returns `None` when a subscriber was
    /// already installed (tests, embedding applications).
    pub fn init(self) -> Option<WorkerGuard> {
        let filter = self.build_filter();

        let (writer, guard) = match &self.output {
            LogOutput::Stdout => tracing_appender::non_blocking(io::stdout()),
            LogOutput::Stderr => tracing_appender::non_blocking(io::stderr()),
            LogOutput::DailyFile { directory, prefix } => {
                tracing_appender::non_blocking(tracing_appender::rolling::daily(directory, prefix))
            }
        };

        let span_events = if self.spans {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };

        let installed = match self.format {
            LogFormat::Json => tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(writer)
                        .with_current_span(self.spans)
                        .with_span_list(self.spans)
                        .with_target(self.targets)
                        .with_span_events(span_events),
                )
                .try_init(),
            LogFormat::Plain => tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(writer)
                        .with_target(self.targets)
                        .with_ansi(self.colors)
                        .with_span_events(span_events),
                )
                .try_init(),
            LogFormat::Pretty => tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .pretty()
                        .with_writer(writer)
                        .with_target(self.targets)
                        .with_ansi(self.colors)
                        .with_span_events(span_events),
                )
                .try_init(),
            LogFormat::Compact => tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .compact()
                        .with_writer(writer)
                        .with_target(self.targets)
                        .with_ansi(self.colors)
                        .with_span_events(span_events),
                )
                .try_init(),
        };

        installed.ok().map(|_| guard)
    }
}
