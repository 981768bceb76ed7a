//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use tilecache::config::ConfigError;
use tilecache::provider::RecordError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Bad command line argument
    InvalidArgument(String),
    /// Provider configuration could not be loaded
    Config(ConfigError),
    /// Record file could not be read
    Records { path: String, error: RecordError },
    /// Failed to start the async runtime
    Runtime(std::io::Error),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Config(ConfigError::InvalidValue { .. }) => {
                eprintln!();
                eprintln!("See the [provider], [tiler], [paging], [cache], [imagery],");
                eprintln!("[events] and [records] sections in the tilecache documentation.");
            }
            CliError::Records { .. } => {
                eprintln!();
                eprintln!("Records must be a JSON array of objects with id, lon and lat fields.");
                eprintln!("Use a [records] section in --config to map other field names.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Records { path, error } => {
                write!(f, "Failed to read records '{}': {}", path, error)
            }
            CliError::Runtime(e) => write!(f, "Failed to start runtime: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Records { error, .. } => Some(error),
            CliError::Runtime(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e)
    }
}
