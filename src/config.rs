//! Process configuration, assembled once at startup.

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default HTTP listen port.
const DEFAULT_PORT: u16 = 8080;

/// Default extraction model.
const DEFAULT_EXTRACTION_MODEL: &str = "gpt-4o";

/// Immutable service configuration.
///
/// Assembled by [`IntakeConfig::from_env`] before anything else starts and
/// passed into each component's constructor — components never read the
/// environment themselves.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    /// Path to the local record-store database file.
    pub db_path: String,
    /// HTTP listen port.
    pub bind_port: u16,
    /// Credential for the extraction service.
    pub openai_api_key: SecretString,
    /// Extraction model identifier.
    pub extraction_model: String,
    /// Audit sink endpoint URL.
    pub audit_url: String,
    /// Audit sink source/destination identifier.
    pub audit_source: String,
    /// Static key for the audit sink.
    pub audit_api_key: SecretString,
}

impl IntakeConfig {
    /// Load configuration from the environment.
    ///
    /// Any missing required variable is a fatal startup error.
    pub fn from_env() -> Result<Self, ConfigError> {
        let db_path = required("INTAKE_DB_PATH")?;
        let openai_api_key = SecretString::from(required("OPENAI_API_KEY")?);
        let audit_url = required("AUDIT_LOG_URL")?;
        let audit_source = required("AUDIT_LOG_SOURCE")?;
        let audit_api_key = SecretString::from(required("AUDIT_LOG_API_KEY")?);

        let extraction_model = std::env::var("INTAKE_EXTRACTION_MODEL")
            .unwrap_or_else(|_| DEFAULT_EXTRACTION_MODEL.to_string());

        let bind_port = match std::env::var("INTAKE_PORT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "INTAKE_PORT".into(),
                message: format!("'{raw}' is not a valid port number"),
            })?,
            Err(_) => DEFAULT_PORT,
        };

        Ok(Self {
            db_path,
            bind_port,
            openai_api_key,
            extraction_model,
            audit_url,
            audit_source,
            audit_api_key,
        })
    }
}

fn required(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_env_fails_fast_on_missing_db_path() {
        // SAFETY: no other test in this module touches these variables.
        unsafe { std::env::remove_var("INTAKE_DB_PATH") };
        let err = IntakeConfig::from_env().unwrap_err();
        match err {
            ConfigError::MissingEnvVar(key) => assert_eq!(key, "INTAKE_DB_PATH"),
            other => panic!("Expected MissingEnvVar, got {other:?}"),
        }
    }
}
