//! Structured logging for Hyperlog
//!
//! Installs a global `tracing` subscriber from a [`LoggingConfig`].
//!
//! # Features
//!
//! - **JSONL Output**: structured JSON lines for log aggregation (default)
//! - **Pretty Output**: human-readable console output for development
//! - **File Rotation**: daily/hourly log rotation via tracing-appender
//! - **RUST_LOG**: the environment filter overrides the configured level
//!
//! Console output goes to stderr by default so that programs can keep
//! stdout for their results.
//!
//! # Quick Start
//!
//! ```ignore
//! use hyperlog_logging::{LogSubscriberBuilder, LoggingConfig};
//!
//! // JSONL to stderr
//! let _guard = LogSubscriberBuilder::new().init();
//!
//! // Pretty output with debug events
//! let _guard = LogSubscriberBuilder::new()
//!     .with_config(LoggingConfig::development())
//!     .init();
//! ```

pub mod config;

pub use config::{
    ConsoleConfig, ConsoleTarget, FileConfig, JsonlConfig, LoggingConfig, RotationStrategy,
};
pub use tracing_appender::non_blocking::WorkerGuard;

use thiserror::Error;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Errors installing the subscriber
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The log file appender could not be created
    #[error("Failed to create log file appender: {0}")]
    FileAppender(#[from] tracing_appender::rolling::InitError),

    /// A global subscriber is already installed
    #[error("Failed to install subscriber: {0}")]
    AlreadyInstalled(#[from] tracing_subscriber::util::TryInitError),
}

/// Builder for configuring and initializing the logging subscriber
///
/// By default console output uses JSONL format on stderr. Use
/// [`LoggingConfig::development()`] for human-readable output.
#[derive(Debug, Clone, Default)]
pub struct LogSubscriberBuilder {
    config: LoggingConfig,
}

impl LogSubscriberBuilder {
    /// Create a new subscriber builder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LoggingConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.default_level = level.into();
        self
    }

    /// Enable or disable console output
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.config.console.enabled = enabled;
        self
    }

    /// Switch console output between pretty and JSONL
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.config.console.pretty = pretty;
        self
    }

    /// Configure file output
    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    /// Configuration the subscriber will be built from
    pub fn config(&self) -> &LoggingConfig {
        &self.config
    }

    /// Initialize the subscriber globally
    ///
    /// Returns a guard that must be kept alive while file output is in use.
    /// Failures are reported on stderr and leave logging disabled.
    pub fn init(self) -> Option<WorkerGuard> {
        self.try_init().unwrap_or_else(|e| {
            eprintln!("Warning: {e}");
            None
        })
    }

    /// Try to initialize the subscriber globally
    pub fn try_init(self) -> Result<Option<WorkerGuard>, LoggingError> {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.config.default_level));

        let mut layers: Vec<BoxedLayer> = Vec::new();
        if self.config.console.enabled {
            layers.push(self.console_layer());
        }

        let mut guard = None;
        if let Some(file) = &self.config.file {
            let (writer, file_guard) = tracing_appender::non_blocking(file_appender(file)?);
            layers.push(json_layer(&self.config.jsonl, writer));
            guard = Some(file_guard);
        }

        Registry::default()
            .with(layers)
            .with(env_filter)
            .try_init()?;
        Ok(guard)
    }

    fn console_layer(&self) -> BoxedLayer {
        let console = &self.config.console;
        let writer = match console.target {
            ConsoleTarget::Stdout => BoxMakeWriter::new(std::io::stdout),
            ConsoleTarget::Stderr => BoxMakeWriter::new(std::io::stderr),
        };

        if console.pretty {
            tracing_subscriber::fmt::layer()
                .with_ansi(console.ansi)
                .with_target(true)
                .with_writer(writer)
                .boxed()
        } else {
            json_layer(&self.config.jsonl, writer)
        }
    }
}

fn json_layer<W>(jsonl: &JsonlConfig, writer: W) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(jsonl.include_spans)
        .flatten_event(jsonl.flatten_events)
        .with_file(jsonl.include_location)
        .with_line_number(jsonl.include_location)
        .with_writer(writer)
        .boxed()
}

fn file_appender(file: &FileConfig) -> Result<RollingFileAppender, LoggingError> {
    let rotation = match file.rotation {
        RotationStrategy::Daily => Rotation::DAILY,
        RotationStrategy::Hourly => Rotation::HOURLY,
        RotationStrategy::Never => Rotation::NEVER,
    };

    let mut builder = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(&file.prefix)
        .filename_suffix("log");
    if let Some(max_files) = file.max_files {
        builder = builder.max_log_files(max_files);
    }
    Ok(builder.build(&file.directory)?)
}

/// Initialize logging for testing (warnings only, ignores a second install)
pub fn init_testing() {
    let _ = LogSubscriberBuilder::new()
        .with_config(LoggingConfig::testing())
        .try_init();
}
