use std::io::Cursor;

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use crate::error::ProtocolError;
use crate::models::{AuthenticationDataRequest, AuthenticationRequest};
use crate::soap::{ns, prefix};

/// Thin wrapper writing `authentication:`-prefixed elements for one document
struct DocumentWriter {
    document: &'static str,
    writer: Writer<Cursor<Vec<u8>>>,
}

impl DocumentWriter {
    fn new(document: &'static str) -> Self {
        Self {
            document,
            writer: Writer::new(Cursor::new(Vec::new())),
        }
    }

    fn error(&self, reason: impl ToString) -> ProtocolError {
        ProtocolError::Encoding {
            document: self.document,
            reason: reason.to_string(),
        }
    }

    fn qualified(local_name: &str) -> String {
        format!("{}:{local_name}", prefix::AUTHENTICATION)
    }

    fn write(&mut self, event: Event<'_>) -> Result<(), ProtocolError> {
        self.writer.write_event(event).map_err(|e| self.error(e))
    }

    /// Opens the signable root, declaring every prefix the signed form uses
    fn start_root(&mut self, local_name: &str, id: &str) -> Result<(), ProtocolError> {
        let name = Self::qualified(local_name);
        let mut root = BytesStart::new(name.as_str());
        root.push_attribute((
            format!("xmlns:{}", prefix::AUTHENTICATION).as_str(),
            ns::AUTHENTICATION,
        ));
        root.push_attribute((format!("xmlns:{}", prefix::DSIG).as_str(), ns::XMLDSIG));
        root.push_attribute(("id", id));
        self.write(Event::Start(root))
    }

    fn end(&mut self, local_name: &str) -> Result<(), ProtocolError> {
        let name = Self::qualified(local_name);
        self.write(Event::End(BytesEnd::new(name.as_str())))
    }

    fn text_element(&mut self, local_name: &str, text: &str) -> Result<(), ProtocolError> {
        let name = Self::qualified(local_name);
        self.write(Event::Start(BytesStart::new(name.as_str())))?;
        self.write(Event::Text(BytesText::new(text)))?;
        self.write(Event::End(BytesEnd::new(name.as_str())))
    }

    fn list<T: AsRef<str>>(
        &mut self,
        local_name: &str,
        values: impl IntoIterator<Item = T>,
    ) -> Result<(), ProtocolError> {
        for value in values {
            self.text_element(local_name, value.as_ref())?;
        }
        Ok(())
    }

    fn finish(self) -> Result<String, ProtocolError> {
        let bytes = self.writer.into_inner().into_inner();
        String::from_utf8(bytes).map_err(|e| ProtocolError::Encoding {
            document: self.document,
            reason: e.to_string(),
        })
    }
}

/// Serializes an authentication request.
///
/// Children follow the schema order; empty lists and absent options are left
/// out. The output carries no XML declaration as it is embedded in a SOAP
/// body once signed.
pub fn encode_authentication_request(
    request: &AuthenticationRequest,
) -> Result<String, ProtocolError> {
    let mut doc = DocumentWriter::new("authenticationRequest");

    doc.start_root("authenticationRequest", &request.id)?;
    doc.text_element("pid", &request.pid)?;
    doc.text_element("serviceTarget", request.service_target.as_str())?;
    doc.list(
        "authenticationProvider",
        request.authentication_providers.iter().map(|v| v.as_str()),
    )?;
    doc.list(
        "authenticationAttribute",
        request.authentication_attributes.iter().map(|v| v.as_str()),
    )?;
    doc.list(
        "userInformation",
        request.user_information.iter().map(|v| v.as_str()),
    )?;
    doc.list(
        "proxyAuthenticationAttribute",
        request
            .proxy_authentication_attributes
            .iter()
            .map(|v| v.as_str()),
    )?;
    doc.list(
        "proxyUserInformation",
        request.proxy_user_information.iter().map(|v| v.as_str()),
    )?;
    if let Some(url) = &request.postback_url {
        doc.text_element("postbackUrl", url)?;
    }
    if let Some(data) = &request.custom_data {
        doc.text_element("customData", data)?;
    }
    doc.end("authenticationRequest")?;

    doc.finish()
}

/// Serializes the request exchanging a ticket for user data
pub fn encode_authentication_data_request(
    request: &AuthenticationDataRequest,
) -> Result<String, ProtocolError> {
    let mut doc = DocumentWriter::new("authenticationDataRequest");

    doc.start_root("authenticationDataRequest", &request.id)?;
    doc.text_element("pid", &request.pid)?;
    doc.text_element("ticket", request.ticket.as_str())?;
    doc.text_element(
        "includeSourceData",
        if request.include_source_data {
            "true"
        } else {
            "false"
        },
    )?;
    doc.end("authenticationDataRequest")?;

    doc.finish()
}
