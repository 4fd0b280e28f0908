use sha2::{Digest, Sha256};

pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut h = Sha256::new();
    h.update(data);
    h.finalize().into()
}

/// Short hex fingerprint of a DER-encoded public key.
///
/// Used to name keys in logs without logging the key itself.
pub fn key_fingerprint(spki_der: &[u8]) -> String {
    hex::encode(&sha256(spki_der)[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            hex::encode(sha256(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_fingerprint_is_short_and_stable() {
        let fp = key_fingerprint(b"some key");
        assert_eq!(fp.len(), 16);
        assert_eq!(fp, key_fingerprint(b"some key"));
        assert_ne!(fp, key_fingerprint(b"other key"));
    }
}
