//! RC4 cipher pair derivation and the post-handshake keystream warm-up.

use cipher::consts::U16;
use cipher::{KeyInit, StreamCipher};
use rc4::Rc4;

use super::define::RTMP_HANDSHAKE_SIZE;
use super::digest::hmac_sha256;
use super::errors::HandshakeError;

/// The first 16 bytes of an HMAC-SHA-256 output, the RC4 key size this
/// handshake uses (spec.md §4.5).
const RC4_KEY_LENGTH: usize = 16;

/// A pair of independent RC4 stream states, one per direction.
///
/// Both states have already consumed exactly [`RTMP_HANDSHAKE_SIZE`] bytes of
/// keystream by the time this is constructed (spec.md §3, §4.5).
pub struct CipherPair {
    out: Rc4<U16>,
    inn: Rc4<U16>,
}

impl CipherPair {
    /// Derives `key_out = HMAC-SHA-256(key=shared_secret, message=peer_public_key)`
    /// and `key_in = HMAC-SHA-256(key=shared_secret, message=own_public_key)`,
    /// builds both RC4 states from the first 16 bytes of each, and warms each
    /// one up by discarding [`RTMP_HANDSHAKE_SIZE`] bytes of keystream.
    pub fn derive(shared_secret: &[u8], own_public_key: &[u8], peer_public_key: &[u8]) -> Result<Self, HandshakeError> {
        let key_out_digest = hmac_sha256(shared_secret, peer_public_key).map_err(|_| HandshakeError::CryptoUnavailable)?;
        let key_in_digest = hmac_sha256(shared_secret, own_public_key).map_err(|_| HandshakeError::CryptoUnavailable)?;

        let mut out = Rc4::<U16>::new_from_slice(&key_out_digest[..RC4_KEY_LENGTH])
            .map_err(|_| HandshakeError::CryptoUnavailable)?;
        let mut inn = Rc4::<U16>::new_from_slice(&key_in_digest[..RC4_KEY_LENGTH])
            .map_err(|_| HandshakeError::CryptoUnavailable)?;

        warm_up(&mut out);
        warm_up(&mut inn);

        Ok(Self { out, inn })
    }

    /// Decrypts `buf` in place using the inbound cipher state.
    pub fn update_in(&mut self, buf: &mut [u8]) {
        self.inn.apply_keystream(buf);
    }

    /// Encrypts `buf` in place using the outbound cipher state.
    pub fn update_out(&mut self, buf: &mut [u8]) {
        self.out.apply_keystream(buf);
    }
}

/// Discards [`RTMP_HANDSHAKE_SIZE`] bytes of keystream to harden RC4's weak
/// early output (spec.md §4.5).
fn warm_up(cipher: &mut Rc4<U16>) {
    let mut scratch = [0u8; RTMP_HANDSHAKE_SIZE];
    cipher.apply_keystream(&mut scratch);
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_cipher_pair_is_reversible_across_peers() {
        let shared_secret = b"shared-secret-material".to_vec();
        let own_public = [1u8; 128];
        let peer_public = [2u8; 128];

        let mut a = CipherPair::derive(&shared_secret, &own_public, &peer_public).unwrap();
        let mut b = CipherPair::derive(&shared_secret, &peer_public, &own_public).unwrap();

        let plaintext = b"hello world".to_vec();
        let mut buf = plaintext.clone();
        a.update_out(&mut buf);
        b.update_in(&mut buf);

        assert_eq!(buf, plaintext);
    }
}
