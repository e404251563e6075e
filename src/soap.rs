mod de;
pub mod dsig;
#[cfg(test)]
mod tests;

pub use de::from_str;

pub mod ns {
    pub const SOAP_ENV: &str = "http://schemas.xmlsoap.org/soap/envelope/";
    pub const AUTHENTICATION: &str = "http://www.epaslaugos.lt/services/authentication";
    pub const XMLDSIG: &str = "http://www.w3.org/2000/09/xmldsig#";
    pub const EXC_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";
}

pub mod prefix {
    pub const SOAP: &str = "soap";
    pub const AUTHENTICATION: &str = "authentication";
    pub const DSIG: &str = "dsig";
}

/// A SOAP 1.1 envelope around an already serialized body.
///
/// The body is copied byte for byte, so a signature computed over it
/// stays valid once wrapped.
#[derive(Debug, Clone, Copy)]
pub struct Envelope<'a> {
    body: &'a str,
}

impl<'a> Envelope<'a> {
    /// Creates a new envelope with the given body
    pub fn new(body: &'a str) -> Self {
        Self { body }
    }

    /// Returns the body of the envelope
    pub fn body(&self) -> &'a str {
        self.body
    }

    /// Serialize this envelope into a SOAP string
    pub fn to_xml(&self) -> String {
        let soap = prefix::SOAP;
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><{soap}:Envelope xmlns:{soap}="{ns}"><{soap}:Body>{body}</{soap}:Body></{soap}:Envelope>"#,
            ns = ns::SOAP_ENV,
            body = self.body,
        )
    }
}
