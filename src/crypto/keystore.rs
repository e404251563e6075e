//! Signing credential loading.
//!
//! Containers are PKCS#12 files. A path starting with `/` names a container
//! compiled into the binary (see [`TEST_KEYSTORE_PATH`]); a `file:` prefix
//! forces a filesystem lookup, and any other path is read from disk.

use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::sync::Arc;

use openssl::error::ErrorStack;
use openssl::pkcs12::Pkcs12;
use openssl::x509::{X509, X509Ref};
use thiserror::Error;
use tracing::{debug, info};

use super::errors::Error as CryptoError;
use super::rsa::{RsaPrivateKey, RsaPublicKey};

/// Built-in container holding the test-environment credential.
pub const TEST_KEYSTORE_PATH: &str = "/keystore-test.p12";
/// Password of [`TEST_KEYSTORE_PATH`].
pub const TEST_KEYSTORE_PASSWORD: &str = "viisp-test";

const FILE_PREFIX: &str = "file:";

static EMBEDDED_CONTAINERS: &[(&str, &[u8])] = &[(
    TEST_KEYSTORE_PATH,
    include_bytes!("../../resources/keystore-test.p12"),
)];

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("No embedded credential container named '{0}'")]
    UnknownResource(String),

    #[error("Failed to read credential container '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open credential container (wrong password or corrupt file): {0}")]
    Open(#[source] ErrorStack),

    #[error("Credential container holds no private key entry")]
    NoPrivateKey,

    #[error("Credential container holds no certificate for the private key")]
    NoCertificate,

    #[error("Private key does not match the certificate public key")]
    KeyMismatch,

    #[error("Key entry alias '{found}' does not match the configured alias '{expected}'")]
    AliasMismatch { expected: String, found: String },

    #[error("Failed to read certificate '{path}': {source}")]
    Certificate {
        path: String,
        #[source]
        source: ErrorStack,
    },

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// RSA key pair used to sign outbound documents.
///
/// Immutable once loaded and cheap to clone; every signing operation of a
/// client shares the same instance.
#[derive(Clone)]
pub struct Credential {
    inner: Arc<Inner>,
}

struct Inner {
    private_key: RsaPrivateKey,
    public_key: RsaPublicKey,
    certificate: X509,
    alias: Option<String>,
}

impl Credential {
    /// Load the credential stored in the container at `path`.
    pub fn load(path: &str, password: &str, alias: Option<&str>) -> Result<Self, CredentialError> {
        let container = read_container(path)?;
        let credential = Self::from_pkcs12(&container, password, alias)?;
        info!(
            path,
            alias = credential.alias().unwrap_or("<none>"),
            bits = credential.public_key().bits(),
            "Loaded signing credential"
        );
        Ok(credential)
    }

    /// Parse a DER-encoded PKCS#12 container.
    ///
    /// The first key entry is used. `alias`, when given, must be that entry's
    /// friendly name; it does not select among several entries.
    pub fn from_pkcs12(
        der: &[u8],
        password: &str,
        alias: Option<&str>,
    ) -> Result<Self, CredentialError> {
        let parsed = Pkcs12::from_der(der)
            .and_then(|pkcs12| pkcs12.parse2(password))
            .map_err(CredentialError::Open)?;

        let private_key = parsed.pkey.ok_or(CredentialError::NoPrivateKey)?;
        let certificate = parsed.cert.ok_or(CredentialError::NoCertificate)?;

        let found = certificate
            .alias()
            .map(|name| String::from_utf8_lossy(name).into_owned());
        if let Some(expected) = alias {
            if found.as_deref() != Some(expected) {
                return Err(CredentialError::AliasMismatch {
                    expected: expected.to_string(),
                    found: found.unwrap_or_else(|| "<none>".to_string()),
                });
            }
        }

        Self::assemble(RsaPrivateKey::from_pkey(private_key)?, certificate, found)
    }

    /// Pair a private key with its certificate.
    pub fn from_parts(
        private_key: RsaPrivateKey,
        certificate: X509,
    ) -> Result<Self, CredentialError> {
        Self::assemble(private_key, certificate, None)
    }

    fn assemble(
        private_key: RsaPrivateKey,
        certificate: X509,
        alias: Option<String>,
    ) -> Result<Self, CredentialError> {
        let public_key = certificate.public_key().map_err(CryptoError::from)?;
        if !private_key.matches(&public_key) {
            return Err(CredentialError::KeyMismatch);
        }
        let public_key = RsaPublicKey::from_pkey(public_key)?;

        Ok(Self {
            inner: Arc::new(Inner {
                private_key,
                public_key,
                certificate,
                alias,
            }),
        })
    }

    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.inner.private_key
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.inner.public_key
    }

    pub fn certificate(&self) -> &X509Ref {
        &self.inner.certificate
    }

    /// Friendly name of the key entry, when the container carries one.
    pub fn alias(&self) -> Option<&str> {
        self.inner.alias.as_deref()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("alias", &self.alias())
            .field("bits", &self.public_key().bits())
            .finish_non_exhaustive()
    }
}

/// Load the public key of a PEM or DER certificate stored on disk.
pub fn load_certificate_key(path: &str) -> Result<RsaPublicKey, CredentialError> {
    let bytes = read_container(path)?;
    let certificate = X509::from_pem(&bytes)
        .or_else(|_| X509::from_der(&bytes))
        .map_err(|source| CredentialError::Certificate {
            path: path.to_string(),
            source,
        })?;
    let key = certificate.public_key().map_err(CryptoError::from)?;
    Ok(RsaPublicKey::from_pkey(key)?)
}

fn read_container(path: &str) -> Result<Cow<'static, [u8]>, CredentialError> {
    if let Some(file) = path.strip_prefix(FILE_PREFIX) {
        return read_file(file);
    }
    if path.starts_with('/') {
        debug!(path, "Resolving embedded credential container");
        return EMBEDDED_CONTAINERS
            .iter()
            .find(|(name, _)| *name == path)
            .map(|(_, bytes)| Cow::Borrowed(*bytes))
            .ok_or_else(|| CredentialError::UnknownResource(path.to_string()));
    }
    read_file(path)
}

fn read_file(path: &str) -> Result<Cow<'static, [u8]>, CredentialError> {
    fs::read(path)
        .map(Cow::Owned)
        .map_err(|source| CredentialError::Io {
            path: path.to_string(),
            source,
        })
}
