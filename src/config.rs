use std::{collections::HashMap, time::Duration};

use config::{Config as ConfigLib, ConfigError, Environment, File};
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::crypto::keystore::{TEST_KEYSTORE_PASSWORD, TEST_KEYSTORE_PATH};
use crate::error::ConfigurationError;
use crate::models::{
    AuthenticationProvider, RequestedAttributes, ServiceTarget, parse_providers,
};

pub const TEST_AUTH_SERVICE_URL: &str = "https://test.epaslaugos.lt/services/services/auth";
pub const TEST_REDIRECT_SERVICE_URL: &str =
    "https://test.epaslaugos.lt/portal/external/services/authentication/v2";
pub const AUTH_SERVICE_URL: &str = "https://epaslaugos.lt/services/services/auth";
pub const REDIRECT_SERVICE_URL: &str =
    "https://epaslaugos.lt/portal/external/services/authentication/v2";

const DEFAULT_REQUESTED_ATTRIBUTES: &str =
    "lt-personal-code,lt-company-code,firstName,lastName,email";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub viisp: ViispConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViispConfig {
    pub service_id: String,
    pub test_mode: bool,
    #[serde(default)]
    pub auth_service_url: Option<String>,
    #[serde(default)]
    pub redirect_service_url: Option<String>,
    pub keystore_path: String,
    pub keystore_password: SecretString,
    /// Friendly name the container's key entry must carry.
    ///
    /// Only the first key entry of a container is ever used; the alias
    /// checks that entry and cannot pick another one.
    #[serde(default)]
    pub key_alias: Option<String>,
    pub requested_attributes: String,
    pub authentication_providers: String,
    #[serde(default)]
    pub proxy_attributes: String,
    #[serde(default)]
    pub remote_certificate_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
}

impl ViispConfig {
    /// Key container path and password. A blank path falls back to the
    /// built-in test container together with its password.
    pub fn keystore(&self) -> (&str, &str) {
        match non_empty(Some(self.keystore_path.as_str())) {
            Some(path) => (path, self.keystore_password.expose_secret()),
            None => (TEST_KEYSTORE_PATH, TEST_KEYSTORE_PASSWORD),
        }
    }
}

/// Validated view of the configuration consumed by the client
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub service_id: String,
    pub service_target: ServiceTarget,
    pub auth_service_url: Url,
    pub redirect_service_url: Url,
    pub providers: Vec<AuthenticationProvider>,
    pub requested: RequestedAttributes,
    pub proxy: RequestedAttributes,
    pub connect_timeout: Duration,
    pub timeout: Duration,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_sources(None)
    }

    pub fn load_with_sources(
        env_vars: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let providers = AuthenticationProvider::ALL
            .iter()
            .map(AuthenticationProvider::as_str)
            .collect::<Vec<_>>()
            .join(",");

        let mut builder = ConfigLib::builder()
            .set_default("viisp.service_id", "")?
            .set_default("viisp.test_mode", true)?
            .set_default("viisp.keystore_path", TEST_KEYSTORE_PATH)?
            .set_default("viisp.keystore_password", TEST_KEYSTORE_PASSWORD)?
            .set_default("viisp.requested_attributes", DEFAULT_REQUESTED_ATTRIBUTES)?
            .set_default("viisp.authentication_providers", providers)?
            .set_default("viisp.proxy_attributes", "")?
            .set_default("http.connect_timeout_secs", 10)?
            .set_default("http.timeout_secs", 30)?
            .add_source(File::with_name("config/settings").required(false));

        // Explicit overrides replace the process environment so tests stay isolated
        if let Some(vars) = env_vars {
            for (key, value) in vars {
                builder = builder.set_override(&key, value)?;
            }
        } else {
            // Should be in the format APP_VIISP__SERVICE_ID or APP_HTTP__TIMEOUT_SECS
            builder = builder.add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );
        }

        builder.build()?.try_deserialize()
    }

    /// Checks every value the client depends on and resolves the endpoints
    pub fn settings(&self) -> Result<ClientSettings, ConfigurationError> {
        let viisp = &self.viisp;
        let service_id = viisp.service_id.trim();
        if service_id.is_empty() {
            return Err(ConfigurationError::MissingServiceId);
        }

        let (default_auth, default_redirect) = if viisp.test_mode {
            (TEST_AUTH_SERVICE_URL, TEST_REDIRECT_SERVICE_URL)
        } else {
            (AUTH_SERVICE_URL, REDIRECT_SERVICE_URL)
        };
        let auth_service_url = parse_url(
            "auth_service_url",
            non_empty(viisp.auth_service_url.as_deref()).unwrap_or(default_auth),
        )?;
        let redirect_service_url = parse_url(
            "redirect_service_url",
            non_empty(viisp.redirect_service_url.as_deref()).unwrap_or(default_redirect),
        )?;

        let connect_timeout =
            positive_timeout("connect_timeout_secs", self.http.connect_timeout_secs)?;
        let timeout = positive_timeout("timeout_secs", self.http.timeout_secs)?;

        Ok(ClientSettings {
            service_id: service_id.to_string(),
            service_target: ServiceTarget::Citizen,
            auth_service_url,
            redirect_service_url,
            providers: parse_providers(&viisp.authentication_providers)?,
            requested: RequestedAttributes::parse(&viisp.requested_attributes)?,
            proxy: RequestedAttributes::parse(&viisp.proxy_attributes)?,
            connect_timeout,
            timeout,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.settings().map(|_| ())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn positive_timeout(name: &'static str, secs: u64) -> Result<Duration, ConfigurationError> {
    match secs {
        0 => Err(ConfigurationError::ZeroTimeout(name)),
        secs => Ok(Duration::from_secs(secs)),
    }
}

fn parse_url(name: &'static str, value: &str) -> Result<Url, ConfigurationError> {
    let invalid = |reason: String| ConfigurationError::InvalidUrl {
        name,
        value: value.to_string(),
        reason,
    };
    let url = Url::parse(value).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AuthenticationAttribute, UserInformation};
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Config {
        let env_vars = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();
        Config::load_with_sources(Some(env_vars)).expect("Failed to load config")
    }

    #[test]
    fn test_default_config() {
        let config = load(&[]);

        assert_eq!(config.viisp.service_id, "");
        assert!(config.viisp.test_mode);
        assert_eq!(config.viisp.keystore_path, "/keystore-test.p12");
        assert_eq!(config.viisp.keystore_password.expose_secret(), "viisp-test");
        assert!(config.viisp.key_alias.is_none());
        assert!(config.viisp.remote_certificate_path.is_none());
        assert_eq!(config.http.connect_timeout_secs, 10);
        assert_eq!(config.http.timeout_secs, 30);
    }

    #[test]
    fn test_missing_service_id_is_rejected() {
        let config = load(&[]);
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::MissingServiceId)
        ));

        let config = load(&[("viisp.service_id", "   ")]);
        assert!(matches!(
            config.settings(),
            Err(ConfigurationError::MissingServiceId)
        ));
    }

    #[test]
    fn test_test_mode_endpoints() {
        let settings = load(&[("viisp.service_id", "VSID000000000113")])
            .settings()
            .unwrap();

        assert_eq!(settings.auth_service_url.as_str(), TEST_AUTH_SERVICE_URL);
        assert_eq!(
            settings.redirect_service_url.as_str(),
            TEST_REDIRECT_SERVICE_URL
        );
        assert_eq!(settings.providers, AuthenticationProvider::ALL);
        assert_eq!(
            settings.requested.attributes,
            vec![
                AuthenticationAttribute::LtPersonalCode,
                AuthenticationAttribute::LtCompanyCode
            ]
        );
        assert_eq!(
            settings.requested.user_information,
            vec![
                UserInformation::FirstName,
                UserInformation::LastName,
                UserInformation::Email
            ]
        );
        assert!(settings.proxy.is_empty());
        assert_eq!(settings.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_production_endpoints_and_overrides() {
        let settings = load(&[
            ("viisp.service_id", "VSID1"),
            ("viisp.test_mode", "false"),
            ("http.timeout_secs", "5"),
        ])
        .settings()
        .unwrap();
        assert_eq!(settings.auth_service_url.as_str(), AUTH_SERVICE_URL);
        assert_eq!(settings.redirect_service_url.as_str(), REDIRECT_SERVICE_URL);
        assert_eq!(settings.timeout, Duration::from_secs(5));

        let settings = load(&[
            ("viisp.service_id", "VSID1"),
            ("viisp.auth_service_url", "http://127.0.0.1:8080/auth"),
            ("viisp.redirect_service_url", ""),
        ])
        .settings()
        .unwrap();
        assert_eq!(
            settings.auth_service_url.as_str(),
            "http://127.0.0.1:8080/auth"
        );
        assert_eq!(
            settings.redirect_service_url.as_str(),
            TEST_REDIRECT_SERVICE_URL
        );
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let config = load(&[
            ("viisp.service_id", "VSID1"),
            ("viisp.auth_service_url", "not a url"),
        ]);
        assert!(matches!(
            config.settings(),
            Err(ConfigurationError::InvalidUrl {
                name: "auth_service_url",
                ..
            })
        ));

        let config = load(&[
            ("viisp.service_id", "VSID1"),
            ("viisp.redirect_service_url", "ftp://epaslaugos.lt/"),
        ]);
        assert!(matches!(
            config.settings(),
            Err(ConfigurationError::InvalidUrl { .. })
        ));

        let config = load(&[
            ("viisp.service_id", "VSID1"),
            ("viisp.requested_attributes", "lt-personal-code,shoeSize"),
        ]);
        match config.settings() {
            Err(ConfigurationError::UnknownValue(unknown)) => assert_eq!(unknown.value, "shoeSize"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_zero_timeouts_are_rejected() {
        let config = load(&[("viisp.service_id", "VSID1"), ("http.timeout_secs", "0")]);
        assert!(matches!(
            config.settings(),
            Err(ConfigurationError::ZeroTimeout("timeout_secs"))
        ));

        let config = load(&[
            ("viisp.service_id", "VSID1"),
            ("http.connect_timeout_secs", "0"),
        ]);
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::ZeroTimeout("connect_timeout_secs"))
        ));
    }

    #[test]
    fn test_blank_keystore_path_uses_test_container() {
        let config = load(&[
            ("viisp.keystore_path", "  "),
            ("viisp.keystore_password", "ignored"),
        ]);
        assert_eq!(
            config.viisp.keystore(),
            (TEST_KEYSTORE_PATH, TEST_KEYSTORE_PASSWORD)
        );

        let config = load(&[
            ("viisp.keystore_path", "file:/etc/viisp/signing.p12"),
            ("viisp.keystore_password", "secret"),
        ]);
        assert_eq!(
            config.viisp.keystore(),
            ("file:/etc/viisp/signing.p12", "secret")
        );
    }
}
