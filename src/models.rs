mod request;
mod user_info;
pub mod vocabulary;

use std::fmt;

use serde::Serialize;

pub use request::{
    AuthenticationDataRequest, AuthenticationRequest, RequestedAttributes, SIGNED_NODE_ID,
    parse_providers,
};
pub use user_info::UserInfo;
pub use vocabulary::{
    AuthenticationAttribute, AuthenticationProvider, ServiceTarget, UnknownValue, UserInformation,
};

/// Single-use token issued by the remote service.
///
/// Opaque to the client; no lifetime is assumed locally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Ticket(String);

impl Ticket {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Ticket {
    fn from(value: String) -> Self {
        Self(value)
    }
}
