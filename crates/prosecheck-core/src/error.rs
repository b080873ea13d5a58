//! Unified error types for prosecheck

use thiserror::Error;

/// Unified error type for all prosecheck operations
#[derive(Error, Debug)]
pub enum CheckError {
    // Session errors
    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Navigation error: {0}")]
    Navigation(String),

    // Element errors
    #[error("Stale element: {0}")]
    StaleElement(String),

    #[error("Action failed: {0}")]
    Action(String),

    // Verification errors
    #[error("Verification read failed: {0}")]
    Verification(String),

    // Evidence errors
    #[error("Capture failed: {0}")]
    Capture(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

/// How the scenario runner treats an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultClass {
    /// The target vanished or could not be interacted with; ends the case as Inconclusive
    ActionError,
    /// A structural read could not complete; ends the case as Inconclusive
    VerificationUnreadable,
    /// Anything else; ends the run
    UnexpectedFault,
}

impl CheckError {
    /// Classify this error for the case boundary
    pub fn fault_class(&self) -> FaultClass {
        match self {
            CheckError::Action(_) | CheckError::StaleElement(_) => FaultClass::ActionError,
            CheckError::Verification(_) => FaultClass::VerificationUnreadable,
            _ => FaultClass::UnexpectedFault,
        }
    }

    /// Whether the runner can absorb this error at the case boundary
    pub fn is_recoverable(&self) -> bool {
        self.fault_class() != FaultClass::UnexpectedFault
    }
}

/// Result type alias using CheckError
pub type Result<T> = std::result::Result<T, CheckError>;
