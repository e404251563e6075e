use chrono::NaiveDate;
use tracing::debug;

use super::tree::{self, Element};
use crate::error::ProtocolError;
use crate::models::{
    AuthenticationAttribute, AuthenticationDataRequest, AuthenticationProvider,
    AuthenticationRequest, Ticket, UserInfo, UserInformation,
};
use crate::soap::ns;

const AUTH: Option<&str> = Some(ns::AUTHENTICATION);

/// Parses a response and fails on a SOAP fault before anything else is read
fn parse_response(xml: &str) -> Result<Element, ProtocolError> {
    let root = tree::parse(xml)?;
    if let Some(fault) = root.find(Some(ns::SOAP_ENV), "Fault") {
        let code = fault
            .child(None, "faultcode")
            .map(Element::text)
            .unwrap_or_default();
        let message = fault
            .child(None, "faultstring")
            .map(Element::text)
            .unwrap_or_default();
        return Err(ProtocolError::Fault { code, message });
    }
    Ok(root)
}

fn required_text(parent: &Element, local_name: &'static str) -> Result<String, ProtocolError> {
    parent
        .child(AUTH, local_name)
        .map(Element::text)
        .ok_or(ProtocolError::MissingElement(local_name))
}

/// Untrimmed variant for request fields, which are read back exactly as written
fn required_raw_text(
    parent: &Element,
    local_name: &'static str,
) -> Result<String, ProtocolError> {
    parent
        .child(AUTH, local_name)
        .map(Element::raw_text)
        .ok_or(ProtocolError::MissingElement(local_name))
}

fn parse_all<T>(parent: &Element, local_name: &'static str) -> Result<Vec<T>, ProtocolError>
where
    T: std::str::FromStr<Err = crate::models::UnknownValue>,
{
    parent
        .children(AUTH, local_name)
        .map(|e| e.text().parse::<T>().map_err(ProtocolError::from))
        .collect()
}

fn optional_raw_text(parent: &Element, local_name: &str) -> Option<String> {
    parent.child(AUTH, local_name).map(Element::raw_text)
}

/// Like [`Element::find`], but never descends into a `dsig:Signature`.
///
/// The enveloped transform leaves the Signature out of the digest, so
/// nothing inside it is covered.
fn find_covered<'a>(
    element: &'a Element,
    namespace: Option<&str>,
    local_name: &str,
) -> Option<&'a Element> {
    if element.is(Some(ns::XMLDSIG), "Signature") {
        return None;
    }
    if element.is(namespace, local_name) {
        return Some(element);
    }
    element
        .elements()
        .find_map(|e| find_covered(e, namespace, local_name))
}

/// Elements covered by the verified references `signed_ids`
fn signed_elements<'a>(
    root: &'a Element,
    signed_ids: &[String],
) -> Result<Vec<&'a Element>, ProtocolError> {
    let mut scopes = Vec::with_capacity(signed_ids.len());
    for id in signed_ids {
        match root.with_id(id).as_slice() {
            [element] => scopes.push(*element),
            [] => return Err(ProtocolError::MissingElement("signed element")),
            _ => {
                return Err(ProtocolError::InvalidValue {
                    element: "id",
                    reason: format!("'{id}' is used by more than one element"),
                });
            }
        }
    }
    Ok(scopes)
}

/// First `local_name` inside the signed elements.
///
/// A match found only outside them is reported as [`ProtocolError::Unsigned`].
fn find_signed<'a>(
    root: &'a Element,
    signed_ids: &[String],
    local_name: &'static str,
) -> Result<Option<&'a Element>, ProtocolError> {
    let found = signed_elements(root, signed_ids)?
        .into_iter()
        .find_map(|scope| find_covered(scope, AUTH, local_name));
    match found {
        Some(element) => Ok(Some(element)),
        None if root.find(AUTH, local_name).is_some() => {
            Err(ProtocolError::Unsigned(local_name))
        }
        None => Ok(None),
    }
}

fn ticket_of(element: Option<&Element>) -> Option<Ticket> {
    element
        .map(Element::text)
        .filter(|text| !text.is_empty())
        .map(Ticket::new)
}

/// Fails when `xml` is malformed or carries a SOAP fault
pub fn check_fault(xml: &str) -> Result<(), ProtocolError> {
    parse_response(xml).map(|_| ())
}

/// Extracts the ticket from an authentication response.
///
/// `Ok(None)` means the document parsed but carries no (or an empty) ticket.
pub fn decode_ticket(xml: &str) -> Result<Option<Ticket>, ProtocolError> {
    let root = parse_response(xml)?;
    Ok(ticket_of(root.find(AUTH, "ticket")))
}

/// [`decode_ticket`] restricted to the elements a verified signature covers
pub fn decode_signed_ticket(
    xml: &str,
    signed_ids: &[String],
) -> Result<Option<Ticket>, ProtocolError> {
    let root = parse_response(xml)?;
    Ok(ticket_of(find_signed(&root, signed_ids, "ticket")?))
}

/// Maps an `authenticationDataResponse` onto the logged-in user.
///
/// Proxy entries describe the represented party and are skipped.
pub fn decode_user_info(xml: &str) -> Result<UserInfo, ProtocolError> {
    let root = parse_response(xml)?;
    let response = root
        .find(AUTH, "authenticationDataResponse")
        .ok_or(ProtocolError::MissingElement("authenticationDataResponse"))?;
    user_info_from(response)
}

/// [`decode_user_info`] restricted to the elements a verified signature covers
pub fn decode_signed_user_info(
    xml: &str,
    signed_ids: &[String],
) -> Result<UserInfo, ProtocolError> {
    let root = parse_response(xml)?;
    let response = find_signed(&root, signed_ids, "authenticationDataResponse")?
        .ok_or(ProtocolError::MissingElement("authenticationDataResponse"))?;
    user_info_from(response)
}

fn user_info_from(response: &Element) -> Result<UserInfo, ProtocolError> {
    let mut personal_code = None;
    let mut info = UserInfo::new(String::new());

    for element in response.elements() {
        if element.namespace.as_deref() != AUTH {
            continue;
        }
        match element.local_name.as_str() {
            "authenticationProvider" => {
                info.auth_provider = Some(element.text().parse::<AuthenticationProvider>()?);
            }
            "authenticationAttribute" => {
                let attribute =
                    required_text(element, "attribute")?.parse::<AuthenticationAttribute>()?;
                let value = required_text(element, "value")?;
                match attribute {
                    AuthenticationAttribute::LtPersonalCode => personal_code = Some(value),
                    AuthenticationAttribute::LtCompanyCode => info.company_code = Some(value),
                    other => debug!(attribute = %other, "Ignoring authentication attribute"),
                }
            }
            "userInformation" => {
                let information =
                    required_text(element, "information")?.parse::<UserInformation>()?;
                let value = information_value(element)?;
                match information {
                    UserInformation::FirstName => info.first_name = Some(value),
                    UserInformation::LastName => info.last_name = Some(value),
                    UserInformation::Email => info.email = Some(value),
                    UserInformation::CompanyName => info.company_name = Some(value),
                    UserInformation::Birthday => {
                        let date = NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|e| {
                            ProtocolError::InvalidValue {
                                element: "birthday",
                                reason: format!("'{value}': {e}"),
                            }
                        })?;
                        info.birthday = Some(date);
                    }
                    other => debug!(information = %other, "Ignoring user information"),
                }
            }
            _ => {}
        }
    }

    info.personal_code = personal_code
        .filter(|code| !code.is_empty())
        .ok_or(ProtocolError::MissingElement("lt-personal-code"))?;
    Ok(info)
}

/// Reads `value/stringValue` or `value/dateValue` of a `userInformation` entry
fn information_value(element: &Element) -> Result<String, ProtocolError> {
    let value = element
        .child(AUTH, "value")
        .ok_or(ProtocolError::MissingElement("value"))?;
    value
        .child(AUTH, "stringValue")
        .or_else(|| value.child(AUTH, "dateValue"))
        .map(Element::text)
        .ok_or_else(|| ProtocolError::InvalidValue {
            element: "value",
            reason: "expected stringValue or dateValue".to_string(),
        })
}

/// Reads back a serialized authentication request
pub fn decode_authentication_request(xml: &str) -> Result<AuthenticationRequest, ProtocolError> {
    let root = tree::parse(xml)?;
    let request = root
        .find(AUTH, "authenticationRequest")
        .ok_or(ProtocolError::MissingElement("authenticationRequest"))?;

    let id = request
        .attribute("id")
        .ok_or(ProtocolError::MissingAttribute("id"))?;

    Ok(AuthenticationRequest {
        id: id.to_string(),
        pid: required_raw_text(request, "pid")?,
        service_target: required_text(request, "serviceTarget")?.parse()?,
        authentication_providers: parse_all(request, "authenticationProvider")?,
        authentication_attributes: parse_all(request, "authenticationAttribute")?,
        user_information: parse_all(request, "userInformation")?,
        proxy_authentication_attributes: parse_all(request, "proxyAuthenticationAttribute")?,
        proxy_user_information: parse_all(request, "proxyUserInformation")?,
        postback_url: optional_raw_text(request, "postbackUrl"),
        custom_data: optional_raw_text(request, "customData"),
    })
}

/// Reads back a serialized authentication data request
pub fn decode_authentication_data_request(
    xml: &str,
) -> Result<AuthenticationDataRequest, ProtocolError> {
    let root = tree::parse(xml)?;
    let request = root
        .find(AUTH, "authenticationDataRequest")
        .ok_or(ProtocolError::MissingElement("authenticationDataRequest"))?;

    let id = request
        .attribute("id")
        .ok_or(ProtocolError::MissingAttribute("id"))?;
    let include_source_data = match required_text(request, "includeSourceData")?.as_str() {
        "true" | "1" => true,
        "false" | "0" => false,
        other => {
            return Err(ProtocolError::InvalidValue {
                element: "includeSourceData",
                reason: format!("'{other}' is not a boolean"),
            });
        }
    };

    Ok(AuthenticationDataRequest {
        id: id.to_string(),
        pid: required_raw_text(request, "pid")?,
        ticket: Ticket::new(required_raw_text(request, "ticket")?),
        include_source_data,
    })
}
