use crate::error::*;
use tracing::{error, warn};

pub trait ErrorExt {
    fn log_error(&self) -> &Self;
    fn log_warn(&self) -> &Self;
    fn is_retryable(&self) -> bool;
    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> String;
}

impl ErrorExt for CoreError {
    fn log_error(&self) -> &Self {
        error!("CoreError: {}", self);
        match self {
            CoreError::Api(e) => {
                error!("API error details: {:?}", e);
            }
            CoreError::Config(e) => {
                error!("Configuration error details: {:?}", e);
            }
            _ => {}
        }
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("CoreError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            CoreError::Api(e) => e.is_retryable(),
            CoreError::Network(_) => true,
            _ => false,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::Api(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::Network(_) => {
                "Network connection error. Please ensure the API server is reachable.".to_string()
            }
            CoreError::InvalidInput { message } => format!("Invalid input: {}", message),
            _ => "An unexpected error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            CoreError::Api(_) => "API".to_string(),
            CoreError::Config(_) => "CONFIG".to_string(),
            CoreError::Io(_) => "IO".to_string(),
            CoreError::Serialization(_) => "SERIALIZATION".to_string(),
            CoreError::Network(_) => "NETWORK".to_string(),
            CoreError::InvalidInput { .. } => "INVALID_INPUT".to_string(),
        }
    }
}

impl ErrorExt for ApiError {
    fn log_error(&self) -> &Self {
        error!("ApiError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("ApiError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            ApiError::Unreachable { .. } => true,
            ApiError::RequestTimeout { .. } => true,
            ApiError::ServerError { status_code, .. } => *status_code >= 500,
            ApiError::ClientError { status_code, .. } => *status_code == 429,
            ApiError::InvalidResponse { .. } => false,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ApiError::Unreachable { .. } => {
                "Failed to connect to the API server. Please ensure it is running.".to_string()
            }
            ApiError::RequestTimeout { .. } => {
                "The API server took too long to answer. Please try again.".to_string()
            }
            ApiError::ServerError { .. } => {
                "The API server failed to process the request. Please try again later."
                    .to_string()
            }
            ApiError::ClientError { endpoint, .. } => {
                format!("The API server rejected the request to {}.", endpoint)
            }
            ApiError::InvalidResponse { .. } => {
                "The API server returned data in an unexpected format.".to_string()
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            ApiError::Unreachable { .. } => "API_UNREACHABLE".to_string(),
            ApiError::RequestTimeout { .. } => "API_TIMEOUT".to_string(),
            ApiError::ServerError { .. } => "API_SERVER_ERROR".to_string(),
            ApiError::ClientError { .. } => "API_CLIENT_ERROR".to_string(),
            ApiError::InvalidResponse { .. } => "API_INVALID_RESPONSE".to_string(),
        }
    }
}

impl ErrorExt for DashboardError {
    fn log_error(&self) -> &Self {
        error!("DashboardError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("DashboardError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        !matches!(self, DashboardError::UnsupportedSource { .. })
    }

    fn user_friendly_message(&self) -> String {
        match self {
            DashboardError::Connectivity { .. } => {
                "Failed to connect to the API server. Please ensure it is running.".to_string()
            }
            DashboardError::LoadFailed { .. } => {
                "Failed to load data. Please check file paths and try again.".to_string()
            }
            DashboardError::RefreshFailed { .. } => "Failed to fetch data from the API.".to_string(),
            DashboardError::UnsupportedSource { data_source } => {
                format!("{} is not available yet.", data_source.label())
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            DashboardError::Connectivity { .. } => "DASHBOARD_CONNECTIVITY".to_string(),
            DashboardError::LoadFailed { .. } => "DASHBOARD_LOAD_FAILED".to_string(),
            DashboardError::RefreshFailed { .. } => "DASHBOARD_REFRESH_FAILED".to_string(),
            DashboardError::UnsupportedSource { .. } => "DASHBOARD_UNSUPPORTED_SOURCE".to_string(),
        }
    }
}

impl ErrorExt for ConfigError {
    fn log_error(&self) -> &Self {
        error!("ConfigError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("ConfigError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        false
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::Unreadable { path, .. } => {
                format!("Could not read configuration file: {}", path)
            }
            ConfigError::InvalidValue { field, value } => {
                format!("Invalid value '{}' for setting {}", value, field)
            }
            ConfigError::ValidationFailed { reason } => {
                format!("Configuration is invalid: {}", reason)
            }
            ConfigError::Parse(_) => {
                "Configuration file contains invalid syntax. Please check the format.".to_string()
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            ConfigError::Unreadable { .. } => "CONFIG_UNREADABLE".to_string(),
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE".to_string(),
            ConfigError::ValidationFailed { .. } => "CONFIG_VALIDATION_FAILED".to_string(),
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR".to_string(),
        }
    }
}

/// Centralized error reporting, routed through `tracing`.
pub struct ErrorReporter {
    report_errors: bool,
    report_warnings: bool,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self {
            report_errors: true,
            report_warnings: true,
        }
    }

    pub fn with_error_reporting(mut self, enabled: bool) -> Self {
        self.report_errors = enabled;
        self
    }

    pub fn with_warning_reporting(mut self, enabled: bool) -> Self {
        self.report_warnings = enabled;
        self
    }

    pub fn report_error<E: ErrorExt + std::fmt::Display>(&self, error: &E) {
        if self.report_errors {
            error!(
                code = %error.error_code(),
                retryable = error.is_retryable(),
                "{}",
                error
            );
        }
    }

    pub fn report_warning<E: ErrorExt + std::fmt::Display>(&self, error: &E) {
        if self.report_warnings {
            warn!(code = %error.error_code(), "{}", error);
        }
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}
