use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use quick_xml::se::to_string_with_root as xml_to_string;
use tracing::debug;

use super::c14n::{self, Selector};
use super::*;
use crate::crypto::{Credential, HashAlg, rsa};

/// PrefixList entry standing for the default namespace
const DEFAULT_PREFIX: &str = "#default";

/// Sign `xml` with an enveloped signature over the element referenced by
/// `reference_uri` (`#id`).
///
/// The `dsig:Signature` element becomes the last child of the referenced
/// element; the rest of the document is left as is. RSA PKCS#1 v1.5 is
/// deterministic, so signing the same input twice yields identical output.
pub fn sign(xml: &str, reference_uri: &str, credential: &Credential) -> Result<String> {
    let id = reference_id(reference_uri)?;
    let prefix =
        utils::element_prefix_by_id(xml, id)?.unwrap_or_else(|| DEFAULT_PREFIX.to_string());
    let inclusive = [prefix.as_str()];

    // Digest the referenced element as the enveloped + exc-c14n transforms see it
    let content = c14n::canonicalize(xml, Selector::Id(id), &inclusive, true)?;
    let digest = HashAlg::Sha1.hash(content.as_bytes())?;

    let signed_info = SignedInfo {
        canon_method: CanonicalizationMethod {
            algorithm: algorithms::EXCLUSIVE_C14N.into(),
            inclusive_ns: Some(InclusiveNamespaces::new(prefix.as_str())),
        },
        signature_method: SignatureMethod {
            algorithm: algorithms::RSA_SHA1.into(),
        },
        references: vec![Reference {
            uri: reference_uri.to_string(),
            transforms: Some(Transforms {
                transform: vec![
                    Transform {
                        algorithm: algorithms::ENVELOPED_SIGNATURE.into(),
                        inclusive_ns: None,
                    },
                    Transform {
                        algorithm: algorithms::EXCLUSIVE_C14N.into(),
                        inclusive_ns: Some(InclusiveNamespaces::new(prefix.as_str())),
                    },
                ],
            }),
            digest_method: DigestMethod {
                algorithm: algorithms::SHA1.into(),
            },
            digest_value: BASE64.encode(&digest),
        }],
    };

    let public_key = credential.public_key();
    let key_info = KeyInfo {
        key_value: Some(KeyValue {
            rsa_key_value: RsaKeyValue {
                modulus: BASE64.encode(public_key.modulus()?),
                exponent: BASE64.encode(public_key.exponent()?),
            },
        }),
    };
    let mut signature = Signature::new(signed_info, Some(key_info));

    // SignedInfo is canonicalized in place so inherited namespaces resolve
    // exactly as a verifier will see them
    let draft =
        utils::append_child_by_id(xml, id, &xml_to_string(SIGNATURE_ELEMENT, &signature)?)?;
    let signed_info_c14n = c14n::canonicalize(
        &draft,
        Selector::Element {
            namespace: ns::XMLDSIG,
            local_name: "SignedInfo",
        },
        &inclusive,
        false,
    )?;

    let value = rsa::sign(credential.private_key(), signed_info_c14n.as_bytes())?;
    signature.signature_value = BASE64.encode(value);
    debug!(reference = reference_uri, "Signed document");

    utils::append_child_by_id(xml, id, &xml_to_string(SIGNATURE_ELEMENT, &signature)?)
}
