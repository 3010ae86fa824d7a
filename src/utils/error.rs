use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Input table error ({path}): {message}")]
    InputError { path: String, message: String },

    #[error("Checkpoint log error ({path}): {message}")]
    CheckpointError { path: String, message: String },

    #[error("Output error: {message}")]
    OutputError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Network,
    Checkpoint,
    Output,
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl HarvestError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            HarvestError::ConfigError { .. }
            | HarvestError::ConfigValidationError { .. }
            | HarvestError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            HarvestError::InputError { .. } | HarvestError::CsvError(_) => ErrorCategory::Input,
            HarvestError::ApiError(_) => ErrorCategory::Network,
            HarvestError::CheckpointError { .. } => ErrorCategory::Checkpoint,
            HarvestError::ZipError(_)
            | HarvestError::IoError(_)
            | HarvestError::OutputError { .. } => ErrorCategory::Output,
            HarvestError::SerializationError(_) => ErrorCategory::Data,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 網路錯誤下一次執行會自動續跑
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Input | ErrorCategory::Data => {
                ErrorSeverity::High
            }
            ErrorCategory::Output => ErrorSeverity::High,
            // 檢查點一旦寫不進去，續跑就不可靠
            ErrorCategory::Checkpoint => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => {
                "Check the TOML config file and command-line overrides"
            }
            ErrorCategory::Input => {
                "Make sure the identifier table exists, is a CSV export, and has the identifier column"
            }
            ErrorCategory::Network => "Re-run later; handled identifiers are skipped automatically",
            ErrorCategory::Checkpoint => {
                "Check disk space and permissions of the checkpoint log before re-running"
            }
            ErrorCategory::Output => {
                "Check the output directory is writable; the checkpoint log is unaffected"
            }
            ErrorCategory::Data => "Inspect the registry response that failed to decode",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            HarvestError::InputError { path, message } => {
                format!("Cannot read identifiers from '{}': {}", path, message)
            }
            HarvestError::CheckpointError { path, message } => {
                format!("Cannot update checkpoint log '{}': {}", path, message)
            }
            HarvestError::InvalidConfigValueError { field, reason, .. } => {
                format!("Invalid setting '{}': {}", field, reason)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HarvestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint_errors_are_critical() {
        let err = HarvestError::CheckpointError {
            path: "processed_ids.txt".to_string(),
            message: "disk full".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Checkpoint);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(err.user_friendly_message().contains("processed_ids.txt"));
    }

    #[test]
    fn test_input_errors_are_high() {
        let err = HarvestError::InputError {
            path: "ids.csv".to_string(),
            message: "not found".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Input);
        assert_eq!(err.severity(), ErrorSeverity::High);
    }
}
