//! Diffie-Hellman key agreement over the fixed 1024-bit RFC-3526 modulus.

use num_bigint::BigUint;
use rand::RngCore;

use super::define::PUBLIC_KEY_LENGTH;
use super::errors::HandshakeError;

/// The RFC-2409 1024-bit Oakley Group 2 modulus, generator 2.
///
/// This is the same fixed modulus used by every Adobe-compatible complex
/// handshake implementation (e.g. librtmp's `DH1024p`); it is never
/// regenerated.
const DH_MODULUS_HEX: &str = concat!(
    "FFFFFFFF FFFFFFFF C90FDAA2 2168C234 C4C6628B 80DC1CD1",
    "29024E08 8A67CC74 020BBEA6 3B139B22 514A0879 8E3404DD",
    "EF9519B3 CD3A431B 302B0A6D F25F1437 4FE1356D 6D51C245",
    "E485B576 625E7EC6 F44C42E9 A637ED6B 0BFF5CB6 F406B7ED",
    "EE386BFB 5A899FA5 AE9F2411 7C4B1FE6 49286651 ECE65381",
    "FFFFFFFF FFFFFFFF",
);

fn dh_modulus() -> BigUint {
    let cleaned: String = DH_MODULUS_HEX.chars().filter(|c| !c.is_whitespace()).collect();
    BigUint::parse_bytes(cleaned.as_bytes(), 16).expect("modulus constant is valid hex")
}

/// One side's Diffie-Hellman state: a private scalar and the derived public key.
pub struct DhKeyPair {
    private: BigUint,
    public: [u8; PUBLIC_KEY_LENGTH],
}

impl DhKeyPair {
    /// Generates a random private scalar and computes `2^private mod MODULUS`.
    pub fn generate() -> Result<Self, HandshakeError> {
        let modulus = dh_modulus();

        let mut scalar_bytes = [0u8; PUBLIC_KEY_LENGTH];
        rand::rng().fill_bytes(&mut scalar_bytes);
        let private = BigUint::from_bytes_be(&scalar_bytes);

        let base = BigUint::from(2u32);
        let public = base.modpow(&private, &modulus);

        Ok(Self {
            private,
            public: normalize_public_key(&public),
        })
    }

    /// Our own 128-byte public key, normalized per spec.md §3.
    pub fn public_key(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.public
    }

    /// Combines our private scalar with the peer's 128-byte public key to
    /// produce the shared secret. The byte length of the result is whatever
    /// `BigUint::to_bytes_be` produces; callers must use it verbatim as HMAC
    /// key material (spec.md §4.4).
    pub fn shared_secret(&self, peer_public_key: &[u8; PUBLIC_KEY_LENGTH]) -> Vec<u8> {
        let modulus = dh_modulus();
        let peer = BigUint::from_bytes_be(peer_public_key);
        peer.modpow(&self.private, &modulus).to_bytes_be()
    }
}

/// Left-zero-pads a short big-endian encoding up to 128 bytes, or drops the
/// leading sign byte(s) of an over-long one, so the result is always exactly
/// 128 bytes (spec.md §3 invariant; see also the Design Note in §9).
fn normalize_public_key(value: &BigUint) -> [u8; PUBLIC_KEY_LENGTH] {
    let bytes = value.to_bytes_be();
    let mut out = [0u8; PUBLIC_KEY_LENGTH];

    if bytes.len() >= PUBLIC_KEY_LENGTH {
        let start = bytes.len() - PUBLIC_KEY_LENGTH;
        out.copy_from_slice(&bytes[start..]);
    } else {
        let pad = PUBLIC_KEY_LENGTH - bytes.len();
        out[pad..].copy_from_slice(&bytes);
    }

    out
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_public_key_is_always_128_bytes() {
        for _ in 0..8 {
            let pair = DhKeyPair::generate().unwrap();
            assert_eq!(pair.public_key().len(), PUBLIC_KEY_LENGTH);
        }
    }

    #[test]
    fn test_normalize_pads_short_values() {
        let small = BigUint::from(42u32);
        let padded = normalize_public_key(&small);
        assert_eq!(padded.len(), PUBLIC_KEY_LENGTH);
        assert_eq!(&padded[..PUBLIC_KEY_LENGTH - 1], &[0u8; PUBLIC_KEY_LENGTH - 1][..]);
        assert_eq!(padded[PUBLIC_KEY_LENGTH - 1], 42);
    }

    #[test]
    fn test_normalize_truncates_long_values() {
        let mut bytes = vec![0xFFu8; PUBLIC_KEY_LENGTH + 1];
        bytes[0] = 0x01; // simulate a leading sign byte
        let huge = BigUint::from_bytes_be(&bytes);
        let truncated = normalize_public_key(&huge);
        assert_eq!(truncated.len(), PUBLIC_KEY_LENGTH);
        assert_eq!(&truncated[..], &bytes[1..]);
    }

    #[test]
    fn test_shared_secret_agreement() {
        let alice = DhKeyPair::generate().unwrap();
        let bob = DhKeyPair::generate().unwrap();

        let alice_secret = alice.shared_secret(bob.public_key());
        let bob_secret = bob.shared_secret(alice.public_key());

        assert_eq!(alice_secret, bob_secret);
    }
}
