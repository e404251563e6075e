//! Closed value sets of the authentication protocol.
//!
//! Each vocabulary maps to the exact strings exchanged on the wire. Parsing
//! an unknown string fails instead of falling back to a default.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use thiserror::Error;

/// A string outside of a protocol vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown {kind} value '{value}'")]
pub struct UnknownValue {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! vocabulary {
    (
        $(#[$meta:meta])*
        $name:ident ($kind:literal) {
            $($variant:ident => $value:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Every value, in protocol order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Wire representation
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownValue;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($value => Ok($name::$variant),)+
                    other => Err(UnknownValue {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }
    };
}

vocabulary! {
    /// Audience the relying service is registered for
    ServiceTarget("service target") {
        Citizen => "citizen",
        Business => "business",
        Provider => "provider",
    }
}

vocabulary! {
    /// Means by which the user may authenticate
    AuthenticationProvider("authentication provider") {
        LoginPass => "auth.login.pass",
        IdentityCard => "auth.lt.identity.card",
        GovernmentEmployeeCard => "auth.lt.government.employee.card",
        Bank => "auth.lt.bank",
        Eidas => "auth.eidas",
        SignatureProvider => "auth.signatureProvider",
        IltuIdentityCard => "auth.iltu.identity.card",
    }
}

vocabulary! {
    /// Identifying attributes returned for the authenticated party
    AuthenticationAttribute("authentication attribute") {
        LtPersonalCode => "lt-personal-code",
        LtCompanyCode => "lt-company-code",
        LtGovernmentEmployeeCode => "lt-government-employee-code",
        EidasEid => "eidas-eid",
        Login => "login",
        IltuPersonalCode => "iltu-personal-code",
    }
}

vocabulary! {
    /// Descriptive fields returned for the authenticated party
    UserInformation("user information") {
        Id => "id",
        FirstName => "firstName",
        LastName => "lastName",
        CompanyName => "companyName",
        Address => "address",
        Email => "email",
        PhoneNumber => "phoneNumber",
        Birthday => "birthday",
        Nationality => "nationality",
        ProxyType => "proxyType",
        ProxySource => "proxySource",
    }
}
