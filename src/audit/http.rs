//! HTTP audit sink — posts entries as JSON to an external log endpoint.

use secrecy::{ExposeSecret, SecretString};

use crate::audit::{AuditEntry, AuditSink};
use crate::error::AuditError;

/// Audit sink over plain HTTP POST, authenticated with a static key.
///
/// The destination is identified by a `source` query parameter; the key
/// travels in the `X-API-KEY` header.
pub struct HttpAuditSink {
    client: reqwest::Client,
    url: String,
    source: String,
    api_key: SecretString,
}

impl HttpAuditSink {
    pub fn new(url: String, source: String, api_key: SecretString) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            source,
            api_key,
        }
    }
}

#[async_trait::async_trait]
impl AuditSink for HttpAuditSink {
    async fn emit(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let response = self
            .client
            .post(&self.url)
            .query(&[("source", self.source.as_str())])
            .header("X-API-KEY", self.api_key.expose_secret())
            .json(entry)
            .send()
            .await
            .map_err(|e| AuditError::SendFailed {
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(AuditError::UpstreamStatus {
                status: response.status().as_u16(),
            });
        }

        tracing::debug!(reference = %entry.reference, "Audit entry sent");
        Ok(())
    }
}
