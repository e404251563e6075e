use crate::crypto::HashAlg;
use crate::crypto::errors::{CryptoResult, Error};
use openssl::bn::BigNum;
use openssl::pkey::{HasPublic, Id, PKey, PKeyRef, Private, Public};
use openssl::rsa::Rsa;
use openssl::sign::{Signer, Verifier};

/// Signatures are always RSASSA-PKCS1-v1_5 over SHA-1 (XML-DSig `rsa-sha1`).
const SIGNATURE_DIGEST: HashAlg = HashAlg::Sha1;

fn ensure_rsa<T>(key: &PKeyRef<T>) -> CryptoResult<()> {
    if key.id() != Id::RSA {
        return Err(Error::UnsupportedKey(format!("{:?}", key.id())));
    }
    Ok(())
}

/// RSA private key wrapper
#[derive(Clone)]
pub struct RsaPrivateKey {
    key: PKey<Private>,
}

impl RsaPrivateKey {
    /// Generate a new RSA private key
    pub fn generate(bits: u32) -> CryptoResult<Self> {
        let rsa = Rsa::generate(bits)?;
        Ok(Self {
            key: PKey::from_rsa(rsa)?,
        })
    }

    /// Wrap an OpenSSL key, rejecting anything that is not RSA.
    pub fn from_pkey(key: PKey<Private>) -> CryptoResult<Self> {
        ensure_rsa(&key)?;
        Ok(Self { key })
    }

    /// Load from PEM-encoded PKCS#1/PKCS#8.
    pub fn from_pem(pem_bytes: impl AsRef<[u8]>) -> CryptoResult<Self> {
        Self::from_pkey(PKey::private_key_from_pem(pem_bytes.as_ref())?)
    }

    /// Get the corresponding public key
    pub fn public_key(&self) -> CryptoResult<RsaPublicKey> {
        let key = PKey::public_key_from_der(&self.key.public_key_to_der()?)?;
        Ok(RsaPublicKey { key })
    }

    /// Modulus size in bits
    pub fn bits(&self) -> u32 {
        self.key.bits()
    }

    /// Whether `public_key` is the public half of this key
    pub fn matches<T: HasPublic>(&self, public_key: &PKeyRef<T>) -> bool {
        self.key.public_eq(public_key)
    }

    /// Get the underlying OpenSSL private key
    pub fn pkey(&self) -> &PKey<Private> {
        &self.key
    }
}

impl std::fmt::Debug for RsaPrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaPrivateKey")
            .field("bits", &self.bits())
            .finish_non_exhaustive()
    }
}

/// RSA public key wrapper
#[derive(Debug, Clone)]
pub struct RsaPublicKey {
    key: PKey<Public>,
}

impl RsaPublicKey {
    /// Wrap an OpenSSL key, rejecting anything that is not RSA.
    pub fn from_pkey(key: PKey<Public>) -> CryptoResult<Self> {
        ensure_rsa(&key)?;
        Ok(Self { key })
    }

    /// Rebuild a key from its big-endian modulus and public exponent.
    pub fn from_components(modulus: &[u8], exponent: &[u8]) -> CryptoResult<Self> {
        if modulus.is_empty() || exponent.is_empty() {
            return Err(Error::Invalid("empty RSA key component".to_string()));
        }
        let rsa = Rsa::from_public_components(
            BigNum::from_slice(modulus)?,
            BigNum::from_slice(exponent)?,
        )?;
        Ok(Self {
            key: PKey::from_rsa(rsa)?,
        })
    }

    /// Big-endian modulus bytes
    pub fn modulus(&self) -> CryptoResult<Vec<u8>> {
        Ok(self.key.rsa()?.n().to_vec())
    }

    /// Big-endian public exponent bytes
    pub fn exponent(&self) -> CryptoResult<Vec<u8>> {
        Ok(self.key.rsa()?.e().to_vec())
    }

    /// Export key in SubjectPublicKeyInfo DER format
    pub fn to_der(&self) -> CryptoResult<Vec<u8>> {
        Ok(self.key.public_key_to_der()?)
    }

    /// Modulus size in bits
    pub fn bits(&self) -> u32 {
        self.key.bits()
    }

    /// Get the underlying OpenSSL public key
    pub fn pkey(&self) -> &PKey<Public> {
        &self.key
    }
}

impl PartialEq for RsaPublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.key.public_eq(&other.key)
    }
}

/// Sign data using RSA private key (PKCS#1 v1.5 with a SHA-1 DigestInfo)
pub fn sign(private_key: &RsaPrivateKey, data: impl AsRef<[u8]>) -> CryptoResult<Vec<u8>> {
    let mut signer = Signer::new((&SIGNATURE_DIGEST).into(), private_key.pkey())?;
    signer.update(data.as_ref())?;
    Ok(signer.sign_to_vec()?)
}

/// Verify RSA signature
pub fn verify(
    public_key: &RsaPublicKey,
    data: impl AsRef<[u8]>,
    signature: &[u8],
) -> CryptoResult<bool> {
    let mut verifier = Verifier::new((&SIGNATURE_DIGEST).into(), public_key.pkey())?;
    verifier.update(data.as_ref())?;
    Ok(verifier.verify(signature)?)
}
