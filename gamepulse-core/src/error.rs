use crate::types::{DashboardResource, DataSource};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("GamePulse API error: {0}")]
    Api(#[from] ApiError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },
}

/// Failures talking to the GamePulse backend, one per endpoint call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("API server unreachable at {endpoint}: {reason}")]
    Unreachable { endpoint: String, reason: String },

    #[error("Request to {endpoint} timed out")]
    RequestTimeout { endpoint: String },

    #[error("Server error {status_code} from {endpoint}{}", detail_suffix(.detail))]
    ServerError {
        endpoint: String,
        status_code: u16,
        detail: Option<String>,
    },

    #[error("Request to {endpoint} rejected with {status_code}{}", detail_suffix(.detail))]
    ClientError {
        endpoint: String,
        status_code: u16,
        detail: Option<String>,
    },

    #[error("Invalid API response from {endpoint}: {details}")]
    InvalidResponse { endpoint: String, details: String },
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|d| format!(": {d}"))
        .unwrap_or_default()
}

/// The user-facing dashboard failures. Each collapses whatever went wrong
/// underneath into a single notice; `details` keeps the cause for logs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DashboardError {
    #[error("Status check failed: {details}")]
    Connectivity { details: String },

    #[error("Loading source data failed: {details}")]
    LoadFailed { details: String },

    #[error("Dashboard refresh failed for {} resource(s): {details}", .failed.len())]
    RefreshFailed {
        failed: Vec<DashboardResource>,
        details: String,
    },

    #[error("Data source not supported: {data_source}")]
    UnsupportedSource { data_source: DataSource },
}

impl DashboardError {
    pub fn connectivity(cause: &CoreError) -> Self {
        DashboardError::Connectivity {
            details: cause.to_string(),
        }
    }

    pub fn load_failed(cause: &CoreError) -> Self {
        DashboardError::LoadFailed {
            details: cause.to_string(),
        }
    }

    pub fn refresh_failed(failures: &[(DashboardResource, CoreError)]) -> Self {
        let details = failures
            .iter()
            .map(|(resource, error)| format!("{resource}: {error}"))
            .collect::<Vec<_>>()
            .join("; ");

        DashboardError::RefreshFailed {
            failed: failures.iter().map(|(resource, _)| *resource).collect(),
            details,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file unreadable: {path}: {reason}")]
    Unreadable { path: String, reason: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Configuration validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}
