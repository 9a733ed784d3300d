use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum DefbenchError {
    #[error("Cannot compute peak memory: no memory samples were recorded")]
    EmptySamples,

    #[error("Benchmark target '{name}' failed: {message}")]
    TargetInvocation { name: String, message: String },

    #[error("Repeat count must be at least 1")]
    InvalidRepeatCount,

    #[error("Test '{name}' is already running")]
    AlreadyRunning { name: String },

    #[error("Failed to capture output: {0}")]
    OutputCapture(#[source] std::io::Error),

    #[error("Failed to read process memory: {0}")]
    MemoryProbe(String),

    #[error("Failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {detail}")]
    ConfigParse { path: PathBuf, detail: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, DefbenchError>;
