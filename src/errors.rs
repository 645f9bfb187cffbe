use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid server URL: {url} ({reason})")]
    InvalidServerUrl { url: String, reason: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid file type: {path}. Only image and video files are supported.")]
    InvalidFileType { path: String },

    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Upload cancelled for {filename}")]
    UploadCancelled { filename: String },

    #[error("Nothing to upload: the selection is empty")]
    EmptyBatch,
}

/// Custom result type
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(field: &str, message: &str) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    pub fn invalid_server_url(url: &str, reason: impl ToString) -> Self {
        Self::InvalidServerUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn file_not_found(path: &str) -> Self {
        Self::FileNotFound {
            path: path.to_string(),
        }
    }

    pub fn invalid_file_type(path: &str) -> Self {
        Self::InvalidFileType {
            path: path.to_string(),
        }
    }

    pub fn upload_cancelled(filename: &str) -> Self {
        Self::UploadCancelled {
            filename: filename.to_string(),
        }
    }

    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            AppError::InvalidServerUrl { .. }
                | AppError::FileNotFound { .. }
                | AppError::InvalidFileType { .. }
                | AppError::Validation { .. }
                | AppError::Config(_)
        )
    }
}
