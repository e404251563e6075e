use super::Ticket;
use super::vocabulary::{
    AuthenticationAttribute, AuthenticationProvider, ServiceTarget, UnknownValue, UserInformation,
};

/// Id of the element covered by the enveloped signature
pub const SIGNED_NODE_ID: &str = "uniqueNodeId";

/// Signed request asking the remote service for an authentication ticket.
///
/// List fields behave as ordered sets: the first insertion wins and
/// duplicates are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationRequest {
    pub id: String,
    pub pid: String,
    pub service_target: ServiceTarget,
    pub authentication_providers: Vec<AuthenticationProvider>,
    pub authentication_attributes: Vec<AuthenticationAttribute>,
    pub user_information: Vec<UserInformation>,
    pub proxy_authentication_attributes: Vec<AuthenticationAttribute>,
    pub proxy_user_information: Vec<UserInformation>,
    pub postback_url: Option<String>,
    pub custom_data: Option<String>,
}

impl AuthenticationRequest {
    /// Request for service `pid` targeting citizens, with nothing requested yet
    pub fn new(pid: impl Into<String>) -> Self {
        Self {
            id: SIGNED_NODE_ID.to_string(),
            pid: pid.into(),
            service_target: ServiceTarget::Citizen,
            authentication_providers: Vec::new(),
            authentication_attributes: Vec::new(),
            user_information: Vec::new(),
            proxy_authentication_attributes: Vec::new(),
            proxy_user_information: Vec::new(),
            postback_url: None,
            custom_data: None,
        }
    }

    pub fn with_service_target(mut self, target: ServiceTarget) -> Self {
        self.service_target = target;
        self
    }

    pub fn with_providers(
        mut self,
        providers: impl IntoIterator<Item = AuthenticationProvider>,
    ) -> Self {
        extend_unique(&mut self.authentication_providers, providers);
        self
    }

    pub fn with_attributes(
        mut self,
        attributes: impl IntoIterator<Item = AuthenticationAttribute>,
    ) -> Self {
        extend_unique(&mut self.authentication_attributes, attributes);
        self
    }

    pub fn with_user_information(
        mut self,
        information: impl IntoIterator<Item = UserInformation>,
    ) -> Self {
        extend_unique(&mut self.user_information, information);
        self
    }

    pub fn with_proxy_attributes(
        mut self,
        attributes: impl IntoIterator<Item = AuthenticationAttribute>,
    ) -> Self {
        extend_unique(&mut self.proxy_authentication_attributes, attributes);
        self
    }

    pub fn with_proxy_user_information(
        mut self,
        information: impl IntoIterator<Item = UserInformation>,
    ) -> Self {
        extend_unique(&mut self.proxy_user_information, information);
        self
    }

    /// URL the browser returns to after authenticating
    pub fn with_postback_url(mut self, url: impl Into<String>) -> Self {
        self.postback_url = Some(url.into());
        self
    }

    /// Opaque caller data echoed back with the callback
    pub fn with_custom_data(mut self, data: impl Into<String>) -> Self {
        self.custom_data = Some(data.into());
        self
    }

    /// Same-document reference to the signed root
    pub fn reference_uri(&self) -> String {
        format!("#{}", self.id)
    }
}

/// Signed request exchanging a ticket for the user's attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationDataRequest {
    pub id: String,
    pub pid: String,
    pub ticket: Ticket,
    pub include_source_data: bool,
}

impl AuthenticationDataRequest {
    pub fn new(pid: impl Into<String>, ticket: Ticket) -> Self {
        Self {
            id: SIGNED_NODE_ID.to_string(),
            pid: pid.into(),
            ticket,
            include_source_data: true,
        }
    }

    pub fn with_source_data(mut self, include: bool) -> Self {
        self.include_source_data = include;
        self
    }

    pub fn reference_uri(&self) -> String {
        format!("#{}", self.id)
    }
}

/// Attribute and information names requested from the remote service.
///
/// Parsed from a comma separated list mixing both vocabularies, e.g.
/// `lt-personal-code,firstName,email`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestedAttributes {
    pub attributes: Vec<AuthenticationAttribute>,
    pub user_information: Vec<UserInformation>,
}

impl RequestedAttributes {
    pub fn parse(list: &str) -> Result<Self, UnknownValue> {
        let mut requested = Self::default();
        for name in split_list(list) {
            if let Ok(attribute) = name.parse::<AuthenticationAttribute>() {
                extend_unique(&mut requested.attributes, [attribute]);
            } else if let Ok(information) = name.parse::<UserInformation>() {
                extend_unique(&mut requested.user_information, [information]);
            } else {
                return Err(UnknownValue {
                    kind: "requested attribute",
                    value: name.to_string(),
                });
            }
        }
        Ok(requested)
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.user_information.is_empty()
    }
}

/// Parse a comma separated list of authentication providers.
pub fn parse_providers(list: &str) -> Result<Vec<AuthenticationProvider>, UnknownValue> {
    let mut providers = Vec::new();
    for name in split_list(list) {
        extend_unique(&mut providers, [name.parse()?]);
    }
    Ok(providers)
}

fn split_list(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(str::trim).filter(|name| !name.is_empty())
}

fn extend_unique<T: PartialEq>(list: &mut Vec<T>, items: impl IntoIterator<Item = T>) {
    for item in items {
        if !list.contains(&item) {
            list.push(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_request_defaults() {
        let request = AuthenticationRequest::new("VSID000000000113");

        assert_eq!(request.id, SIGNED_NODE_ID);
        assert_eq!(request.service_target, ServiceTarget::Citizen);
        assert!(request.authentication_providers.is_empty());
        assert!(request.postback_url.is_none());
        assert_eq!(request.reference_uri(), "#uniqueNodeId");
    }

    #[test]
    fn test_lists_keep_first_insertion_order() {
        let request = AuthenticationRequest::new("pid")
            .with_providers([AuthenticationProvider::Bank, AuthenticationProvider::Eidas])
            .with_providers([AuthenticationProvider::Eidas, AuthenticationProvider::LoginPass])
            .with_user_information([UserInformation::Email, UserInformation::Email]);

        assert_eq!(
            request.authentication_providers,
            vec![
                AuthenticationProvider::Bank,
                AuthenticationProvider::Eidas,
                AuthenticationProvider::LoginPass
            ]
        );
        assert_eq!(request.user_information, vec![UserInformation::Email]);
    }

    #[test]
    fn test_data_request_includes_source_data() {
        let request = AuthenticationDataRequest::new("pid", Ticket::new("T-1"));
        assert!(request.include_source_data);
        assert!(!request.with_source_data(false).include_source_data);
    }

    #[test]
    fn test_parse_requested_attributes() {
        let requested =
            RequestedAttributes::parse("lt-personal-code, lt-company-code,firstName,lastName,email,,")
                .unwrap();

        assert_eq!(
            requested.attributes,
            vec![
                AuthenticationAttribute::LtPersonalCode,
                AuthenticationAttribute::LtCompanyCode
            ]
        );
        assert_eq!(
            requested.user_information,
            vec![
                UserInformation::FirstName,
                UserInformation::LastName,
                UserInformation::Email
            ]
        );
    }

    #[test]
    fn test_parse_requested_attributes_rejects_unknown() {
        let err = RequestedAttributes::parse("lt-personal-code,shoeSize").unwrap_err();
        assert_eq!(err.value, "shoeSize");
        assert!(RequestedAttributes::parse("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_providers() {
        let providers = parse_providers("auth.lt.bank,auth.eidas,auth.lt.bank").unwrap();
        assert_eq!(
            providers,
            vec![AuthenticationProvider::Bank, AuthenticationProvider::Eidas]
        );
        assert!(parse_providers("auth.lt.bank,bogus").is_err());
    }
}
