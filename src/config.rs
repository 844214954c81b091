//! Configuration and CLI argument handling

use std::{path::PathBuf, time::Duration};

use clap::Parser;

use crate::state::{snapshot::default_privileged_prefixes, UrlPolicy};

/// CLI argument parsing structure
#[derive(Parser, Debug, Clone)]
#[command(name = "serene-focus")]
#[command(about = "A work/break interval daemon that enforces breaks across every open tab")]
#[command(version = "0.3.0")]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// File holding the persisted timer state and settings
    #[arg(short, long, default_value = "serene-focus.json")]
    pub state_file: PathBuf,

    /// Period of the recurring wake in seconds
    #[arg(short, long, default_value = "30")]
    pub wake_interval: u64,

    /// URL of the break view that tabs are redirected to
    #[arg(long, default_value = "serene-focus://break")]
    pub break_view_url: String,

    /// Extra URL prefixes that are never covered by a break (repeatable)
    #[arg(long = "privileged-prefix")]
    pub privileged_prefixes: Vec<String>,

    /// How long HTTP handlers wait for the controller to answer, in milliseconds
    #[arg(long, default_value = "2000")]
    pub reply_timeout_ms: u64,

    /// Attach a console observer that logs the countdown
    #[arg(long)]
    pub watch: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }

    pub fn controller_config(&self) -> ControllerConfig {
        let mut privileged_prefixes = default_privileged_prefixes();
        privileged_prefixes.extend(self.privileged_prefixes.iter().cloned());
        ControllerConfig {
            wake_interval: Duration::from_secs(self.wake_interval.max(1)),
            url_policy: UrlPolicy {
                break_view_url: self.break_view_url.clone(),
                privileged_prefixes,
            },
        }
    }
}

/// Runtime knobs of the session controller.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub wake_interval: Duration,
    pub url_policy: UrlPolicy,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            wake_interval: Duration::from_secs(30),
            url_policy: UrlPolicy::new("serene-focus://break"),
        }
    }
}
