//! Command-line interface definitions using clap derive macros.
//!
//! The binary runs a small demo service with correlation logging wired
//! in. Every flag has an environment variable equivalent for container
//! deployments.

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "correlog",
    version,
    about = "Correlation-aware JSON logging for HTTP services",
    propagate_version = true,
    after_help = "\x1b[1mQuick start:\x1b[0m\n  \
        correlog run --service orders                           Serve on :3000\n  \
        correlog run --service gateway --upstream http://orders:3000\n                                                          Relay and forward correlation IDs"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the demo service
    Run(Box<RunArgs>),
}

#[derive(Args)]
pub struct RunArgs {
    /// Service name stamped on every log line
    #[arg(short, long, env = "SERVICE_NAME")]
    pub service: String,

    /// Listen port
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Listen address
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Downstream service to relay unmatched requests to
    #[arg(short, long, env = "UPSTREAM_URL")]
    pub upstream: Option<url::Url>,

    // -- Logging --
    /// Log level
    #[arg(
        short,
        long,
        env = "LOG_LEVEL",
        default_value = "info",
        ignore_case = true
    )]
    pub log_level: LogLevel,

    /// Force pretty (human-readable) log output
    #[arg(long)]
    pub pretty: bool,

    /// Force JSON log output (overrides TTY detection)
    #[arg(long, conflicts_with = "pretty")]
    pub json: bool,

    // -- Tuning --
    /// Max request body size in bytes
    #[arg(
        long,
        env = "MAX_BODY_SIZE",
        default_value_t = 1_048_576,
        help_heading = "Tuning"
    )]
    pub max_body: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[value(alias = "warning")]
    Warn,
    #[value(aliases = ["critical", "fatal"])]
    Error,
}

impl LogLevel {
    #[must_use]
    pub const fn to_tracing_level(&self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}
