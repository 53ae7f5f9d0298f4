//! HMAC-SHA-256 digest computation over a packet with a 32-byte "hole" excised.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::define::{DIGEST_LENGTH, RTMP_HANDSHAKE_SIZE};
use super::errors::DigestError;

type HmacSha256 = Hmac<Sha256>;

/// Computes `HMAC-SHA-256(key, packet[0..off] || packet[off+32..])`.
///
/// This is the single digest primitive used throughout the handshake: to
/// produce one's own digest before filling the slot, and to verify the
/// peer's after extracting theirs. See spec.md §4.2.
pub fn digest_excluding(packet: &[u8; RTMP_HANDSHAKE_SIZE], offset: usize, key: &[u8]) -> Result<[u8; DIGEST_LENGTH], DigestError> {
    if offset + DIGEST_LENGTH > RTMP_HANDSHAKE_SIZE {
        return Err(DigestError::DigestLengthNotCorrect);
    }

    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| DigestError::CannotGenerate)?;
    mac.update(&packet[..offset]);
    mac.update(&packet[offset + DIGEST_LENGTH..]);

    let result = mac.finalize().into_bytes();
    let mut out = [0u8; DIGEST_LENGTH];
    out.copy_from_slice(&result);
    Ok(out)
}

/// Computes `HMAC-SHA-256(key, message)` over an arbitrary byte slice.
///
/// Used both for the part-two (C2/S2) digest, which covers a plain 1504-byte
/// prefix rather than a packet-with-a-hole, and for key derivation (DH shared
/// secret -> RC4 key material, SWF verification).
pub fn hmac_sha256(key: &[u8], message: &[u8]) -> Result<[u8; DIGEST_LENGTH], DigestError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| DigestError::CannotGenerate)?;
    mac.update(message);
    let result = mac.finalize().into_bytes();
    let mut out = [0u8; DIGEST_LENGTH];
    out.copy_from_slice(&result);
    Ok(out)
}
