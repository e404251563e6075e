//! Enveloped XML signatures (XML-DSig, RSA-SHA1, exclusive C14N).

pub mod c14n;
mod error;
mod signer;
mod utils;
mod verifier;

pub use error::Error;
pub use signer::sign;
pub use verifier::{embedded_public_key, verify};

use serde::{Deserialize, Serialize};

use super::ns;

pub type Result<T> = std::result::Result<T, Error>;

pub mod algorithms {
    // Digest algorithms
    pub const SHA1: &str = "http://www.w3.org/2000/09/xmldsig#sha1";

    // Signature algorithms
    pub const RSA_SHA1: &str = "http://www.w3.org/2000/09/xmldsig#rsa-sha1";

    // Canonicalization algorithms
    pub const EXCLUSIVE_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";

    // Transform algorithms
    pub const ENVELOPED_SIGNATURE: &str = "http://www.w3.org/2000/09/xmldsig#enveloped-signature";
}

const SIGNATURE_ELEMENT: &str = "dsig:Signature";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signature {
    #[serde(rename(serialize = "@xmlns:dsig"), skip_deserializing)]
    pub xmlns: String,

    #[serde(rename(serialize = "dsig:SignedInfo", deserialize = "SignedInfo"))]
    pub signed_info: SignedInfo,

    #[serde(rename(serialize = "dsig:SignatureValue", deserialize = "SignatureValue"))]
    pub signature_value: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[serde(rename(serialize = "dsig:KeyInfo", deserialize = "KeyInfo"))]
    pub key_info: Option<KeyInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedInfo {
    #[serde(rename(
        serialize = "dsig:CanonicalizationMethod",
        deserialize = "CanonicalizationMethod"
    ))]
    pub canon_method: CanonicalizationMethod,

    #[serde(rename(serialize = "dsig:SignatureMethod", deserialize = "SignatureMethod"))]
    pub signature_method: SignatureMethod,

    #[serde(rename(serialize = "dsig:Reference", deserialize = "Reference"), default)]
    pub references: Vec<Reference>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalizationMethod {
    #[serde(rename = "@Algorithm")]
    pub algorithm: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[serde(rename(
        serialize = "ec:InclusiveNamespaces",
        deserialize = "InclusiveNamespaces"
    ))]
    pub inclusive_ns: Option<InclusiveNamespaces>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureMethod {
    #[serde(rename = "@Algorithm")]
    pub algorithm: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "@URI")]
    pub uri: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[serde(rename(serialize = "dsig:Transforms", deserialize = "Transforms"))]
    pub transforms: Option<Transforms>,

    #[serde(rename(serialize = "dsig:DigestMethod", deserialize = "DigestMethod"))]
    pub digest_method: DigestMethod,

    #[serde(rename(serialize = "dsig:DigestValue", deserialize = "DigestValue"))]
    pub digest_value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transforms {
    #[serde(rename(serialize = "dsig:Transform", deserialize = "Transform"), default)]
    pub transform: Vec<Transform>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transform {
    #[serde(rename = "@Algorithm")]
    pub algorithm: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[serde(rename(
        serialize = "ec:InclusiveNamespaces",
        deserialize = "InclusiveNamespaces"
    ))]
    pub inclusive_ns: Option<InclusiveNamespaces>,
}

/// Prefixes treated as inclusive by exclusive canonicalization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InclusiveNamespaces {
    #[serde(rename(serialize = "@xmlns:ec"), skip_deserializing)]
    pub xmlns: String,

    #[serde(rename = "@PrefixList")]
    pub prefix_list: String,
}

impl InclusiveNamespaces {
    pub fn new(prefix_list: impl Into<String>) -> Self {
        Self {
            xmlns: ns::EXC_C14N.to_string(),
            prefix_list: prefix_list.into(),
        }
    }

    pub fn prefixes(&self) -> Vec<&str> {
        self.prefix_list.split_whitespace().collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestMethod {
    #[serde(rename = "@Algorithm")]
    pub algorithm: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyInfo {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[serde(rename(serialize = "dsig:KeyValue", deserialize = "KeyValue"))]
    pub key_value: Option<KeyValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyValue {
    #[serde(rename(serialize = "dsig:RSAKeyValue", deserialize = "RSAKeyValue"))]
    pub rsa_key_value: RsaKeyValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RsaKeyValue {
    #[serde(rename(serialize = "dsig:Modulus", deserialize = "Modulus"))]
    pub modulus: String,

    #[serde(rename(serialize = "dsig:Exponent", deserialize = "Exponent"))]
    pub exponent: String,
}

impl Signature {
    fn new(signed_info: SignedInfo, key_info: Option<KeyInfo>) -> Self {
        Self {
            xmlns: ns::XMLDSIG.to_string(),
            signed_info,
            signature_value: String::new(),
            key_info,
        }
    }
}

/// Id referenced by a same-document URI (`#id`)
fn reference_id(uri: &str) -> Result<&str> {
    uri.strip_prefix('#')
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::MissingReference(uri.to_string()))
}
