//! Optional application-layer SWF-verification response, precomputed from S1.

use byteorder::{BigEndian, WriteBytesExt};

use super::define::{DIGEST_LENGTH, SWF_VERIFICATION_LENGTH};
use super::digest::hmac_sha256;
use super::errors::HandshakeError;

/// Computes the 42-byte SWF-verification pong bound to `swf_hash` and `swf_size`.
///
/// `s1_tail` is the last 32 bytes of the server's S1 (its own part-one digest),
/// used here as the HMAC key. See spec.md §4.7.
pub fn compute_swfv_bytes(swf_hash: &[u8; DIGEST_LENGTH], swf_size: u32, s1_tail: &[u8; DIGEST_LENGTH]) -> Result<[u8; SWF_VERIFICATION_LENGTH], HandshakeError> {
    let digest = hmac_sha256(s1_tail, swf_hash)?;

    let mut out = Vec::with_capacity(SWF_VERIFICATION_LENGTH);
    out.write_u8(0x01)?;
    out.write_u8(0x01)?;
    out.write_u32::<BigEndian>(swf_size)?;
    out.write_u32::<BigEndian>(swf_size)?;
    out.extend_from_slice(&digest);

    let mut fixed = [0u8; SWF_VERIFICATION_LENGTH];
    fixed.copy_from_slice(&out);
    Ok(fixed)
}
