//! HTTP side of the protocol: ticket request, ticket submission and user
//! data retrieval.
//!
//! Calls are never retried. Each ticket request mints a new ticket, so a
//! retry would orphan the previous one.

mod form;

use std::sync::Arc;

use reqwest::header::{CONTENT_TYPE, LOCATION, SET_COOKIE};
use reqwest::{Client, StatusCode, Url, redirect::Policy};
use tracing::{debug, info, instrument, warn};

use crate::codec;
use crate::config::{ClientSettings, Config};
use crate::crypto::Credential;
use crate::crypto::keystore::load_certificate_key;
use crate::crypto::rsa::RsaPublicKey;
use crate::error::{ConfigurationError, ProtocolError, Result, TransportError};
use crate::models::{AuthenticationDataRequest, AuthenticationRequest, Ticket, UserInfo};
use crate::soap::{Envelope, dsig};

pub use form::{TICKET_FIELD, auto_submit_page};

const SOAP_CONTENT_TYPE: &str = "text/xml; charset=utf-8";
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// How a ticket reaches the remote redirect service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMode {
    /// Hand the browser a page that posts the ticket itself
    Form,
    /// Post the ticket server side and relay the resulting redirect
    Direct,
}

/// Outcome of a ticket submission, ready to be relayed to the browser
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketSubmission {
    Form { html: String },
    /// Every `Set-Cookie` value is kept as its own header
    Redirect { location: String, cookies: Vec<String> },
}

/// Client for the VIISP authentication service.
///
/// Cheap to clone; the credential and the connection pool are shared.
#[derive(Debug, Clone)]
pub struct ViispClient {
    settings: Arc<ClientSettings>,
    credential: Credential,
    remote_key: Option<RsaPublicKey>,
    http: Client,
}

impl ViispClient {
    /// Validates `config` and loads the signing credential up front
    pub fn new(config: &Config) -> Result<Self> {
        let settings = config.settings()?;
        let viisp = &config.viisp;

        let (keystore_path, keystore_password) = viisp.keystore();
        let credential =
            Credential::load(keystore_path, keystore_password, viisp.key_alias.as_deref())?;

        let mut client = Self::with_credential(settings, credential)?;
        if let Some(path) = viisp
            .remote_certificate_path
            .as_deref()
            .map(str::trim)
            .filter(|path| !path.is_empty())
        {
            client.remote_key = Some(load_certificate_key(path)?);
            info!(path, "Response signatures will be verified");
        }
        Ok(client)
    }

    pub fn with_credential(settings: ClientSettings, credential: Credential) -> Result<Self> {
        let http = Client::builder()
            .redirect(Policy::none())
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(ConfigurationError::HttpClient)?;

        Ok(Self {
            settings: Arc::new(settings),
            credential,
            remote_key: None,
            http,
        })
    }

    /// Requires responses to be signed by `key`
    pub fn with_remote_key(mut self, key: RsaPublicKey) -> Self {
        self.remote_key = Some(key);
        self
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// The request `request_ticket` signs and sends
    pub fn authentication_request(
        &self,
        callback_url: &str,
        custom_data: Option<&str>,
    ) -> AuthenticationRequest {
        let settings = &self.settings;
        let request = AuthenticationRequest::new(settings.service_id.as_str())
            .with_service_target(settings.service_target)
            .with_providers(settings.providers.iter().copied())
            .with_attributes(settings.requested.attributes.iter().copied())
            .with_user_information(settings.requested.user_information.iter().copied())
            .with_proxy_attributes(settings.proxy.attributes.iter().copied())
            .with_proxy_user_information(settings.proxy.user_information.iter().copied())
            .with_postback_url(callback_url);

        match custom_data {
            Some(data) => request.with_custom_data(data),
            None => request,
        }
    }

    /// Obtains a fresh ticket for a login that returns to `callback_url`
    #[instrument(skip(self, custom_data), fields(service_id = %self.settings.service_id))]
    pub async fn request_ticket(
        &self,
        callback_url: &str,
        custom_data: Option<&str>,
    ) -> Result<Ticket> {
        let request = self.authentication_request(callback_url, custom_data);
        let document = codec::encode_authentication_request(&request)?;
        let signed = dsig::sign(&document, &request.reference_uri(), &self.credential)?;

        let body = self
            .post_soap(&self.settings.auth_service_url, &signed)
            .await?;
        let ticket = match self.signed_references(&body)? {
            Some(signed_ids) => codec::decode_signed_ticket(&body, &signed_ids)?,
            None => codec::decode_ticket(&body)?,
        };

        let ticket = ticket.ok_or(ProtocolError::MissingElement("ticket"))?;
        info!("Authentication ticket issued");
        debug!(%ticket, "Ticket value");
        Ok(ticket)
    }

    /// Forwards `ticket` to the redirect service
    #[instrument(skip(self, ticket))]
    pub async fn submit_ticket(
        &self,
        ticket: &Ticket,
        mode: SubmitMode,
    ) -> Result<TicketSubmission> {
        let url = &self.settings.redirect_service_url;
        match mode {
            SubmitMode::Form => Ok(TicketSubmission::Form {
                html: auto_submit_page(url.as_str(), ticket.as_str()),
            }),
            SubmitMode::Direct => self.submit_directly(url, ticket).await,
        }
    }

    async fn submit_directly(&self, url: &Url, ticket: &Ticket) -> Result<TicketSubmission> {
        let response = self
            .http
            .post(url.clone())
            .form(&[(TICKET_FIELD, ticket.as_str())])
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(url.as_str(), e))?;

        let status = response.status();
        if status != StatusCode::FOUND {
            warn!(%status, "Ticket submission was not redirected");
            return Err(ProtocolError::UnexpectedStatus(status.as_u16()).into());
        }

        let headers = response.headers();
        let location = headers
            .get(LOCATION)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            .ok_or(ProtocolError::MissingHeader("Location"))?;
        let cookies: Vec<String> = headers
            .get_all(SET_COOKIE)
            .iter()
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            .collect();

        info!(%location, cookies = cookies.len(), "Ticket accepted");
        Ok(TicketSubmission::Redirect { location, cookies })
    }

    /// Exchanges `ticket` for the authenticated user's data
    #[instrument(skip(self, ticket), fields(service_id = %self.settings.service_id))]
    pub async fn fetch_user_info(&self, ticket: &Ticket) -> Result<UserInfo> {
        let request =
            AuthenticationDataRequest::new(self.settings.service_id.as_str(), ticket.clone());
        let document = codec::encode_authentication_data_request(&request)?;
        let signed = dsig::sign(&document, &request.reference_uri(), &self.credential)?;

        let body = self
            .post_soap(&self.settings.auth_service_url, &signed)
            .await?;
        let info = match self.signed_references(&body)? {
            Some(signed_ids) => codec::decode_signed_user_info(&body, &signed_ids)?,
            None => codec::decode_user_info(&body)?,
        };

        info!(provider = ?info.auth_provider, "User data received");
        Ok(info)
    }

    async fn post_soap(&self, url: &Url, document: &str) -> Result<String> {
        let envelope = Envelope::new(document).to_xml();
        debug!(%url, bytes = envelope.len(), "Posting SOAP request");

        let response = self
            .http
            .post(url.clone())
            .header(CONTENT_TYPE, SOAP_CONTENT_TYPE)
            .header("SOAPAction", "")
            .body(envelope)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            // Body is only diagnostic here
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let body = response
            .text()
            .await
            .map_err(|e| TransportError::from_reqwest(url.as_str(), e))?;
        Ok(body)
    }

    /// Ids of the response elements signed by the remote key, when one is configured.
    ///
    /// A fault is reported before the signature is looked at.
    fn signed_references(&self, xml: &str) -> Result<Option<Vec<String>>> {
        let Some(key) = &self.remote_key else {
            return Ok(None);
        };
        codec::check_fault(xml)?;
        let signed_ids = dsig::verify(xml, key)?;
        debug!(references = ?signed_ids, "Response signature verified");
        Ok(Some(signed_ids))
    }
}
