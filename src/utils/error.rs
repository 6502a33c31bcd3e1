use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("baseline schedule produced an empty demand graph")]
    EmptyBaseline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    Data,
    Config,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ForecastError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ForecastError::IoError(_) => ErrorCategory::Io,
            ForecastError::CsvError(_) | ForecastError::SerializationError(_) => {
                ErrorCategory::Data
            }
            ForecastError::ConfigError { .. }
            | ForecastError::ConfigValidationError { .. }
            | ForecastError::InvalidConfigValueError { .. }
            | ForecastError::MissingConfigError { .. } => ErrorCategory::Config,
            ForecastError::ProcessingError { .. } | ForecastError::EmptyBaseline => {
                ErrorCategory::Processing
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ForecastError::CsvError(_) | ForecastError::SerializationError(_) => {
                ErrorSeverity::Medium
            }
            ForecastError::IoError(_)
            | ForecastError::ConfigError { .. }
            | ForecastError::ConfigValidationError { .. }
            | ForecastError::InvalidConfigValueError { .. }
            | ForecastError::MissingConfigError { .. }
            | ForecastError::ProcessingError { .. } => ErrorSeverity::High,
            ForecastError::EmptyBaseline => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            ForecastError::CsvError(_) => {
                "Check that the input files are well-formed CSV with the expected columns".into()
            }
            ForecastError::IoError(_) => {
                "Check that the input paths exist and the output directory is writable".into()
            }
            ForecastError::SerializationError(_) => {
                "Check the run summary serialization inputs".into()
            }
            ForecastError::ConfigError { .. } | ForecastError::ConfigValidationError { .. } => {
                "Review the scenario TOML against the documented sections".into()
            }
            ForecastError::InvalidConfigValueError { field, .. } => {
                format!("Correct the value of '{}' in the scenario file", field)
            }
            ForecastError::MissingConfigError { field } => {
                format!("Add the required field '{}' to the scenario file", field)
            }
            ForecastError::ProcessingError { .. } => {
                "Inspect the logs for the failing pipeline stage".into()
            }
            ForecastError::EmptyBaseline => {
                "Check the baseline schedule, the airport table and the forecast window; \
                 no flight survived graph construction"
                    .into()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            ForecastError::EmptyBaseline => {
                "No usable baseline flights were found, so no forecast can be produced".into()
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ForecastError>;
