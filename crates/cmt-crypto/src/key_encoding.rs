//! Public key encoding.
//!
//! Public keys travel as base64 (standard alphabet, padded) of the DER
//! `SubjectPublicKeyInfo` structure, the same form Java's `X509EncodedKeySpec`
//! produces. Decoding enforces the key policy: only RSA keys with an
//! acceptable modulus size are let through.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rsa::pkcs8::{DecodePublicKey, EncodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::RsaPublicKey;

use crate::error::CryptoError;
use crate::hash::key_fingerprint;

/// Default modulus size for generated key pairs.
pub const DEFAULT_RSA_BITS: usize = 2048;

/// Smallest modulus accepted from a counterparty.
pub const MIN_RSA_BITS: usize = 2048;

/// Largest modulus accepted from a counterparty.
pub const MAX_RSA_BITS: usize = 4096;

/// OAEP-SHA256 overhead: two digests plus two bytes.
const OAEP_SHA256_OVERHEAD: usize = 2 * 32 + 2;

/// Which asymmetric keys the encoder and key managers accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPolicy {
    pub min_modulus_bits: usize,
    pub max_modulus_bits: usize,
}

impl Default for KeyPolicy {
    fn default() -> Self {
        Self {
            min_modulus_bits: MIN_RSA_BITS,
            max_modulus_bits: MAX_RSA_BITS,
        }
    }
}

impl KeyPolicy {
    /// Reject keys whose modulus is outside the configured bounds.
    pub fn check(&self, key: &RsaPublicKey) -> Result<(), CryptoError> {
        let bits = key.n().bits();
        if bits < self.min_modulus_bits {
            return Err(CryptoError::InvalidKeyFormat("modulus below minimum size"));
        }
        if bits > self.max_modulus_bits {
            return Err(CryptoError::InvalidKeyFormat("modulus above maximum size"));
        }
        Ok(())
    }
}

/// An RSA public key with its canonical DER encoding.
#[derive(Clone, PartialEq, Eq)]
pub struct AsymmetricPublicKey {
    key: RsaPublicKey,
    der: Vec<u8>,
}

impl AsymmetricPublicKey {
    /// Wrap a structured key, computing its canonical encoding.
    pub fn from_rsa(key: RsaPublicKey) -> Result<Self, CryptoError> {
        let der = key
            .to_public_key_der()
            .map_err(|_| CryptoError::Encoding)?
            .as_bytes()
            .to_vec();
        Ok(Self { key, der })
    }

    pub fn rsa(&self) -> &RsaPublicKey {
        &self.key
    }

    /// DER `SubjectPublicKeyInfo` bytes.
    pub fn to_der(&self) -> &[u8] {
        &self.der
    }

    pub fn modulus_bits(&self) -> usize {
        self.key.n().bits()
    }

    /// Modulus length in bytes; also the length of every ciphertext.
    pub fn modulus_len(&self) -> usize {
        self.key.size()
    }

    /// Largest plaintext OAEP-SHA256 can wrap under this key.
    pub fn max_wrap_len(&self) -> usize {
        self.key.size().saturating_sub(OAEP_SHA256_OVERHEAD)
    }

    pub fn fingerprint(&self) -> String {
        key_fingerprint(&self.der)
    }
}

impl std::fmt::Debug for AsymmetricPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsymmetricPublicKey")
            .field("bits", &self.modulus_bits())
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

/// Converts public keys to and from their transport string form.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyEncoder {
    policy: KeyPolicy,
}

impl KeyEncoder {
    pub fn new(policy: KeyPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &KeyPolicy {
        &self.policy
    }

    /// Encode a public key as base64 DER. Deterministic; the DER is already
    /// canonical once the key exists.
    pub fn encode_public_key(&self, key: &AsymmetricPublicKey) -> String {
        STANDARD.encode(key.to_der())
    }

    /// Decode a base64 DER public key, enforcing the key policy.
    ///
    /// Embedded ASCII whitespace is ignored so line-wrapped base64 is accepted.
    pub fn decode_public_key(&self, encoded: &str) -> Result<AsymmetricPublicKey, CryptoError> {
        let compact = strip_ascii_whitespace(encoded);
        if compact.is_empty() {
            return Err(CryptoError::InvalidKeyFormat("empty key"));
        }

        let der = STANDARD
            .decode(compact.as_bytes())
            .map_err(|_| CryptoError::InvalidKeyFormat("not valid base64"))?;

        let key = RsaPublicKey::from_public_key_der(&der)
            .map_err(|_| CryptoError::InvalidKeyFormat("not an RSA SubjectPublicKeyInfo"))?;
        self.policy.check(&key)?;

        let decoded = AsymmetricPublicKey::from_rsa(key)?;
        if decoded.to_der() != der.as_slice() {
            return Err(CryptoError::InvalidKeyFormat("non-canonical key encoding"));
        }
        Ok(decoded)
    }
}

pub(crate) fn strip_ascii_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_ascii_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::rsa_key;
    use rand_core::OsRng;
    use rsa::RsaPrivateKey;

    fn public_key() -> AsymmetricPublicKey {
        AsymmetricPublicKey::from_rsa(rsa_key(0).to_public_key()).unwrap()
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let encoder = KeyEncoder::default();
        let key = public_key();

        let encoded = encoder.encode_public_key(&key);
        let decoded = encoder.decode_public_key(&encoded).unwrap();

        assert_eq!(decoded, key);
        assert_eq!(encoder.encode_public_key(&decoded), encoded);
    }

    #[test]
    fn test_encoding_is_x509_spki() {
        let encoded = KeyEncoder::default().encode_public_key(&public_key());
        // DER SEQUENCE header + rsaEncryption OID for a 2048-bit key
        assert!(encoded.starts_with("MIIBIjANBgkqhkiG9w0BAQEFAAOCAQ8AMIIBCgKCAQEA"));
    }

    #[test]
    fn test_line_wrapped_input_accepted() {
        let encoder = KeyEncoder::default();
        let key = public_key();
        let encoded = encoder.encode_public_key(&key);

        let wrapped: String = encoded
            .as_bytes()
            .chunks(76)
            .map(|c| std::str::from_utf8(c).unwrap())
            .collect::<Vec<_>>()
            .join("\n");

        assert_eq!(encoder.decode_public_key(&wrapped).unwrap(), key);
    }

    #[test]
    fn test_rejects_empty_and_invalid_base64() {
        let encoder = KeyEncoder::default();
        assert_eq!(
            encoder.decode_public_key("   "),
            Err(CryptoError::InvalidKeyFormat("empty key"))
        );
        assert_eq!(
            encoder.decode_public_key("not*base64!"),
            Err(CryptoError::InvalidKeyFormat("not valid base64"))
        );
    }

    #[test]
    fn test_rejects_truncated_key() {
        let encoder = KeyEncoder::default();
        let der = public_key().to_der().to_vec();
        let truncated = STANDARD.encode(&der[..der.len() - 10]);
        assert!(matches!(
            encoder.decode_public_key(&truncated),
            Err(CryptoError::InvalidKeyFormat(_))
        ));
    }

    #[test]
    fn test_rejects_trailing_garbage() {
        let encoder = KeyEncoder::default();
        let mut der = public_key().to_der().to_vec();
        der.extend_from_slice(&[0, 0]);
        assert!(encoder.decode_public_key(&STANDARD.encode(&der)).is_err());
    }

    #[test]
    fn test_rejects_other_algorithm_oid() {
        let encoder = KeyEncoder::default();
        let mut der = public_key().to_der().to_vec();
        // rsaEncryption (1.2.840.113549.1.1.1) -> sha1WithRSAEncryption (...1.1.5)
        let oid = [0x06, 0x09, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x01];
        let pos = der.windows(oid.len()).position(|w| w == oid).unwrap();
        der[pos + oid.len() - 1] = 0x05;

        assert!(matches!(
            encoder.decode_public_key(&STANDARD.encode(&der)),
            Err(CryptoError::InvalidKeyFormat(_))
        ));
    }

    #[test]
    fn test_rejects_small_modulus() {
        let weak = RsaPrivateKey::new(&mut OsRng, 1024).unwrap();
        let weak_pub = AsymmetricPublicKey::from_rsa(weak.to_public_key()).unwrap();
        let encoder = KeyEncoder::default();
        let encoded = encoder.encode_public_key(&weak_pub);

        assert!(matches!(
            encoder.decode_public_key(&encoded),
            Err(CryptoError::InvalidKeyFormat(_))
        ));
        assert_eq!(
            encoder.policy().check(weak_pub.rsa()),
            Err(CryptoError::InvalidKeyFormat("modulus below minimum size"))
        );
    }

    #[test]
    fn test_max_wrap_len_for_2048_bits() {
        let key = public_key();
        assert_eq!(key.modulus_bits(), 2048);
        assert_eq!(key.modulus_len(), 256);
        assert_eq!(key.max_wrap_len(), 190);
    }

    #[test]
    fn test_debug_shows_fingerprint_only() {
        let key = public_key();
        let dbg = format!("{:?}", key);
        assert!(dbg.contains(&key.fingerprint()));
        assert!(!dbg.contains("MIIB"));
    }
}
