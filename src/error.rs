use thiserror::Error;

use crate::crypto::CredentialError;
use crate::models::UnknownValue;

pub use crate::soap::dsig::Error as CryptoError;

pub type Result<T> = std::result::Result<T, Error>;

/// Every failure a client operation can report
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl From<CredentialError> for Error {
    fn from(error: CredentialError) -> Self {
        Error::Configuration(error.into())
    }
}

impl From<crate::crypto::Error> for Error {
    fn from(error: crate::crypto::Error) -> Self {
        Error::Crypto(error.into())
    }
}

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("VIISP service id is not configured")]
    MissingServiceId,

    #[error("Invalid {name} '{value}': {reason}")]
    InvalidUrl {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("Invalid configuration value: {0}")]
    UnknownValue(#[from] UnknownValue),

    #[error("Signing credential unavailable: {0}")]
    Credential(#[from] CredentialError),

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16, body: String },
}

impl TransportError {
    pub(crate) fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            TransportError::Timeout {
                url: url.to_string(),
            }
        } else {
            TransportError::Request {
                url: url.to_string(),
                source,
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed XML: {0}")]
    MalformedXml(String),

    #[error("Expected element '{0}' is missing")]
    MissingElement(&'static str),

    #[error("Expected attribute '{0}' is missing")]
    MissingAttribute(&'static str),

    #[error("Expected header '{0}' is missing")]
    MissingHeader(&'static str),

    #[error(transparent)]
    UnknownValue(#[from] UnknownValue),

    #[error("Invalid value for '{element}': {reason}")]
    InvalidValue { element: &'static str, reason: String },

    #[error("Ticket submission answered with status {0}, expected 302")]
    UnexpectedStatus(u16),

    #[error("SOAP fault {code}: {message}")]
    Fault { code: String, message: String },

    #[error("Element '{0}' is not covered by the response signature")]
    Unsigned(&'static str),

    #[error("Failed to encode {document}: {reason}")]
    Encoding { document: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_errors_are_configuration_errors() {
        let error: Error = CredentialError::NoPrivateKey.into();
        assert!(matches!(
            error,
            Error::Configuration(ConfigurationError::Credential(CredentialError::NoPrivateKey))
        ));
    }

    #[test]
    fn test_display_is_transparent() {
        let error: Error = ProtocolError::MissingElement("ticket").into();
        assert_eq!(error.to_string(), "Expected element 'ticket' is missing");
    }
}
