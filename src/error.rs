//! Error types for Interview Intake.

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    #[error("Audit sink error: {0}")]
    Audit(#[from] AuditError),

    #[error("Intake error: {0}")]
    Intake(#[from] IntakeError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Record-store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Extraction-service errors.
///
/// A single failed attempt fails the item — there is no retry path.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Extraction request failed: {reason}")]
    RequestFailed { reason: String },

    #[error("Extraction service returned status {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("Invalid extraction response: {reason}")]
    InvalidResponse { reason: String },
}

/// Audit-sink errors. Never propagated past the item boundary.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("Failed to send audit entry: {reason}")]
    SendFailed { reason: String },

    #[error("Audit sink returned status {status}")]
    UpstreamStatus { status: u16 },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Pipeline/request-level errors.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
