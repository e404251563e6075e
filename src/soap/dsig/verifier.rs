use base64::{Engine, engine::general_purpose::STANDARD as BASE64};

use super::c14n::{self, Selector};
use super::*;
use crate::crypto::{
    HashAlg,
    rsa::{self, RsaPublicKey},
};
use crate::soap::from_str as xml_from_str;

const SIGNED_INFO: Selector<'static> = Selector::Element {
    namespace: ns::XMLDSIG,
    local_name: "SignedInfo",
};

/// Verify the first enveloped signature of `xml` against `public_key`.
///
/// Returns the ids of the elements its references cover. Only content inside
/// those elements is vouched for by the signer.
pub fn verify(xml: &str, public_key: &RsaPublicKey) -> Result<Vec<String>> {
    let signature = extract_signature(xml)?;
    let signed_info = &signature.signed_info;

    if signed_info.signature_method.algorithm != algorithms::RSA_SHA1 {
        return Err(Error::UnsupportedAlgorithm(
            signed_info.signature_method.algorithm.clone(),
        ));
    }
    if signed_info.canon_method.algorithm != algorithms::EXCLUSIVE_C14N {
        return Err(Error::UnsupportedAlgorithm(
            signed_info.canon_method.algorithm.clone(),
        ));
    }
    if signed_info.references.is_empty() {
        return Err(Error::Invalid("SignedInfo carries no reference".into()));
    }

    // Verify reference digests
    let signed_ids = verify_references(xml, &signed_info.references)?;

    let prefixes = signed_info
        .canon_method
        .inclusive_ns
        .as_ref()
        .map(InclusiveNamespaces::prefixes)
        .unwrap_or_default();
    let signed_info_c14n = c14n::canonicalize(xml, SIGNED_INFO, &prefixes, false)?;

    let signature_bytes = decode_base64(&signature.signature_value)?;
    if !rsa::verify(public_key, signed_info_c14n.as_bytes(), &signature_bytes)? {
        return Err(Error::InvalidSignature);
    }
    Ok(signed_ids)
}

/// Public key published in the signature's `RSAKeyValue`.
///
/// This only tells who signed; trusting it is up to the caller.
pub fn embedded_public_key(xml: &str) -> Result<RsaPublicKey> {
    let signature = extract_signature(xml)?;
    let key_value = signature
        .key_info
        .and_then(|key_info| key_info.key_value)
        .ok_or_else(|| Error::Invalid("Signature carries no RSAKeyValue".into()))?
        .rsa_key_value;

    let modulus = decode_base64(&key_value.modulus)?;
    let exponent = decode_base64(&key_value.exponent)?;
    Ok(RsaPublicKey::from_components(&modulus, &exponent)?)
}

/// Verify digest values for all references
fn verify_references(xml: &str, references: &[Reference]) -> Result<Vec<String>> {
    let mut signed_ids = Vec::with_capacity(references.len());
    for reference in references {
        let id = reference_id(&reference.uri)?;

        let mut enveloped = false;
        let mut prefixes = None;
        for transform in reference.transforms.iter().flat_map(|t| &t.transform) {
            match transform.algorithm.as_str() {
                algorithms::ENVELOPED_SIGNATURE => enveloped = true,
                algorithms::EXCLUSIVE_C14N => {
                    prefixes = Some(
                        transform
                            .inclusive_ns
                            .as_ref()
                            .map(InclusiveNamespaces::prefixes)
                            .unwrap_or_default(),
                    );
                }
                alg => return Err(Error::UnsupportedAlgorithm(alg.to_string())),
            }
        }
        // Without an explicit transform the reference would fall back to inclusive C14N
        let prefixes = prefixes.ok_or_else(|| {
            Error::UnsupportedAlgorithm(format!(
                "reference {} is not exclusively canonicalized",
                reference.uri
            ))
        })?;

        let hash_alg = match reference.digest_method.algorithm.as_str() {
            algorithms::SHA1 => HashAlg::Sha1,
            alg => return Err(Error::UnsupportedAlgorithm(alg.to_string())),
        };

        let transformed = c14n::canonicalize(xml, Selector::Id(id), &prefixes, enveloped)
            .map_err(|err| match err {
                Error::ElementNotFound(_) => Error::MissingReference(reference.uri.clone()),
                other => other,
            })?;

        let computed_digest = hash_alg.hash(transformed.as_bytes())?;
        let expected_digest = decode_base64(&reference.digest_value)?;

        if computed_digest != expected_digest {
            return Err(Error::DigestMismatch(reference.uri.clone()));
        }
        signed_ids.push(id.to_string());
    }
    Ok(signed_ids)
}

fn extract_signature(xml: &str) -> Result<Signature> {
    let selector = Selector::Element {
        namespace: ns::XMLDSIG,
        local_name: "Signature",
    };
    let signature_xml = match c14n::canonicalize(xml, selector, &[], false) {
        Err(Error::ElementNotFound(_)) => return Err(Error::MissingSignature),
        other => other?,
    };
    xml_from_str(&signature_xml).map_err(Error::from)
}

/// Base64 values may be wrapped over several lines
fn decode_base64(value: &str) -> Result<Vec<u8>> {
    let compact: String = value.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    Ok(BASE64.decode(compact)?)
}
