use std::path::PathBuf;
use thiserror::Error;

/// Bad or missing inputs. Fatal before dispatch.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("input directory does not exist: {0}")]
    MissingInputDir(PathBuf),
    #[error("input file does not exist: {0}")]
    MissingFile(PathBuf),
    #[error("county '{county}' not found in {table}")]
    UnknownCounty { county: String, table: &'static str },
    #[error("year {year} not found in vehicle table")]
    UnknownYear { year: i32 },
    #[error("no temperature rows left for county '{county}' after period restriction")]
    EmptySeries { county: String },
    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
    #[error("malformed table {path}: {reason}")]
    MalformedTable { path: PathBuf, reason: String },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// No usable API credential. Fatal before dispatch.
#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("credential file not found: {0}")]
    MissingFile(PathBuf),
    #[error("no valid credentials in {path} ({rejected} rejected)")]
    NoValidCredentials { path: PathBuf, rejected: usize },
    #[error("entered credential has length {len}, expected {expected}")]
    InvalidEntry { len: usize, expected: usize },
    #[error("failed to read credential: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a single work item. Reported for its county; siblings keep running.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("charging model failed for {county}: {source:#}")]
    Model {
        county: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("charging model call for {county} exceeded {secs}s")]
    Timeout { county: String, secs: u64 },
    #[error("task for {county} did not finish: {reason}")]
    Aborted { county: String, reason: String },
}

impl TaskError {
    pub fn county(&self) -> &str {
        match self {
            TaskError::Model { county, .. }
            | TaskError::Timeout { county, .. }
            | TaskError::Aborted { county, .. } => county,
        }
    }
}

/// Errors that end a whole run.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error("run deadline of {secs}s exceeded with {pending} task(s) outstanding")]
    DeadlineExceeded { secs: u64, pending: usize },
}
