use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Homebrew is not available: {details}")]
    Unavailable { details: String },

    #[error("Homebrew command timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Homebrew command failed: {stderr}")]
    CommandFailed { stderr: String },

    #[error("Failed to link {formula}: {details}")]
    LinkFailed { formula: String, details: String },

    #[error("IO error ({kind}): {message}")]
    Io {
        kind: std::io::ErrorKind,
        message: String,
    },
}

impl RegistryError {
    pub fn unavailable(details: impl Into<String>) -> Self {
        Self::Unavailable {
            details: details.into(),
        }
    }

    pub fn link_failed(formula: impl Into<String>, details: impl Into<String>) -> Self {
        Self::LinkFailed {
            formula: formula.into(),
            details: details.into(),
        }
    }
}

impl From<std::io::Error> for RegistryError {
    fn from(err: std::io::Error) -> Self {
        RegistryError::Io {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Service operation timed out after {seconds}s: {service}")]
    Timeout { service: String, seconds: u64 },

    #[error("Service operation failed for {service}: {details}")]
    Failed { service: String, details: String },
}

impl ServiceError {
    pub fn failed(service: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Failed {
            service: service.into(),
            details: details.into(),
        }
    }
}
