//! HTTP client for the XSD validation service.
//!
//! The service accepts the document and the schema as named text blobs and
//! answers with a verdict. The schema itself is read from a URL or a local
//! file.

use crate::service::{SchemaService, ServiceVerdict, ValidationRequest};
use reqwest::Client;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Where the AAS XSD comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XsdSource {
    /// Fetched over HTTP(S)
    Url(String),
    /// Read from the local filesystem
    File(PathBuf),
}

/// Validation service configuration.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Endpoint accepting validation requests (e.g., <http://localhost:8090/validate>)
    pub validator_url: String,
    /// Schema location
    pub schema: XsdSource,
    /// Bound on each service call
    pub timeout: Duration,
    /// Optional bearer token for authentication
    pub bearer_token: Option<String>,
    /// Custom CA certificate path for self-signed service certs (PEM format)
    pub ca_cert_path: Option<PathBuf>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            validator_url: "http://localhost:8090/validate".to_string(),
            schema: XsdSource::File(PathBuf::from("./schemas/AAS.xsd")),
            timeout: Duration::from_secs(30),
            bearer_token: None,
            ca_cert_path: None,
        }
    }
}

/// [`SchemaService`] backed by an HTTP validation endpoint.
pub struct HttpSchemaService {
    client: Client,
    config: ValidatorConfig,
}

impl HttpSchemaService {
    /// Create a new service client.
    ///
    /// # Errors
    ///
    /// Returns error if a configured URL is malformed, the HTTP client
    /// cannot be created, or the CA certificate cannot be read or parsed.
    pub fn new(config: ValidatorConfig) -> Result<Self, GatewayError> {
        check_url(&config.validator_url)?;
        if let XsdSource::Url(schema_url) = &config.schema {
            check_url(schema_url)?;
        }

        let mut builder = Client::builder().timeout(config.timeout);

        if let Some(ca_path) = &config.ca_cert_path {
            let pem = fs::read(ca_path).map_err(|e| {
                GatewayError::Init(format!(
                    "failed to read CA certificate {}: {e}",
                    ca_path.display()
                ))
            })?;
            let cert = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| GatewayError::Init(format!("failed to parse CA certificate: {e}")))?;
            builder = builder.use_rustls_tls().add_root_certificate(cert);
            tracing::debug!(ca_path = %ca_path.display(), "Loaded custom CA certificate");
        }

        let client = builder
            .build()
            .map_err(|e| GatewayError::Init(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// The configuration this client was built with.
    #[must_use]
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    fn auth_header(&self) -> Option<String> {
        self.config
            .bearer_token
            .as_ref()
            .map(|t| format!("Bearer {t}"))
    }

    async fn get_text(&self, url: &str) -> Result<String, GatewayError> {
        tracing::debug!(url, "GET schema");

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Timeout(self.config.timeout)
            } else {
                GatewayError::SchemaFetch(format!("{url}: {e}"))
            }
        })?;

        if !response.status().is_success() {
            return Err(GatewayError::SchemaFetch(format!(
                "{url}: status {}",
                response.status().as_u16()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| GatewayError::SchemaFetch(e.to_string()))
    }
}

impl SchemaService for HttpSchemaService {
    async fn fetch_schema(&self) -> Result<String, GatewayError> {
        match &self.config.schema {
            XsdSource::Url(url) => self.get_text(url).await,
            XsdSource::File(path) => tokio::fs::read_to_string(path).await.map_err(|e| {
                GatewayError::SchemaFetch(format!("{}: {e}", path.display()))
            }),
        }
    }

    async fn validate(&self, xml: &str, xsd: &str) -> Result<ServiceVerdict, GatewayError> {
        let url = &self.config.validator_url;
        tracing::debug!(url, bytes = xml.len(), "POST validation request");

        let mut request = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(&ValidationRequest::single(xml, xsd));
        if let Some(auth) = self.auth_header() {
            request = request.header("Authorization", auth);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Timeout(self.config.timeout)
            } else {
                GatewayError::Request(e.to_string())
            }
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::Request(e.to_string()))?;

        if status.is_success() {
            if text.trim().is_empty() {
                return Ok(ServiceVerdict::accepted());
            }
            let body: Value =
                serde_json::from_str(&text).map_err(|e| GatewayError::Parse(e.to_string()))?;
            return Ok(ServiceVerdict::from_response(&body));
        }

        // Some services answer a rejected document with 400 and the error list.
        if let Ok(body) = serde_json::from_str::<Value>(&text) {
            let verdict = ServiceVerdict::from_response(&body);
            if !verdict.errors.is_empty() {
                return Ok(verdict);
            }
        }

        Err(GatewayError::ApiError {
            status: status.as_u16(),
            message: text,
        })
    }
}

fn check_url(raw: &str) -> Result<(), GatewayError> {
    url::Url::parse(raw)
        .map(|_| ())
        .map_err(|e| GatewayError::Init(format!("invalid URL {raw}: {e}")))
}

/// Errors that can occur talking to the validation service.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    /// Client initialization failed
    #[error("client init error: {0}")]
    Init(String),
    /// HTTP request failed
    #[error("request error: {0}")]
    Request(String),
    /// The service did not answer in time
    #[error("validation timed out after {0:?}")]
    Timeout(Duration),
    /// Service returned an error status
    #[error("validation service error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },
    /// Response parsing failed
    #[error("parse error: {0}")]
    Parse(String),
    /// The schema could not be obtained
    #[error("schema fetch failed: {0}")]
    SchemaFetch(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn config_default() {
        let config = ValidatorConfig::default();
        assert_eq!(config.validator_url, "http://localhost:8090/validate");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.bearer_token.is_none());
        assert!(matches!(config.schema, XsdSource::File(_)));
    }

    #[test]
    fn client_creation_with_invalid_ca_fails() {
        let config = ValidatorConfig {
            validator_url: "https://localhost:8443/validate".to_string(),
            ca_cert_path: Some(PathBuf::from("/nonexistent/ca.pem")),
            ..Default::default()
        };

        let err = HttpSchemaService::new(config).err().unwrap();
        assert!(err.to_string().contains("client init error"));
    }

    #[test]
    fn malformed_urls_are_rejected_up_front() {
        let config = ValidatorConfig {
            schema: XsdSource::Url("not a url".to_string()),
            ..Default::default()
        };
        let err = HttpSchemaService::new(config).err().unwrap();
        assert!(err.to_string().contains("invalid URL not a url"));
    }

    #[test]
    fn schema_is_read_from_a_local_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "<xs:schema/>").unwrap();

        let service = HttpSchemaService::new(ValidatorConfig {
            schema: XsdSource::File(file.path().to_path_buf()),
            ..Default::default()
        })
        .unwrap();

        let xsd = tokio_test::block_on(service.fetch_schema()).unwrap();
        assert_eq!(xsd, "<xs:schema/>");
    }

    #[test]
    fn missing_schema_file_is_a_fetch_error() {
        let service = HttpSchemaService::new(ValidatorConfig {
            schema: XsdSource::File(PathBuf::from("/nonexistent/AAS.xsd")),
            ..Default::default()
        })
        .unwrap();

        let err = tokio_test::block_on(service.fetch_schema()).unwrap_err();
        assert!(matches!(err, GatewayError::SchemaFetch(_)));
    }

    #[test]
    fn timeout_message_names_the_bound() {
        let err = GatewayError::Timeout(Duration::from_secs(20));
        assert_eq!(err.to_string(), "validation timed out after 20s");
    }
}
