//! Construction and validation of the 1536-byte C1/C2/S1/S2 packets.

use byteorder::{BigEndian, ByteOrder};
use rand::RngCore;

use super::define::{DIGEST_LENGTH, PUBLIC_KEY_LENGTH, RTMP_HANDSHAKE_SIZE, ValidationType};
use super::dh::DhKeyPair;
use super::digest::digest_excluding;
use super::errors::HandshakeError;

fn random_packet() -> [u8; RTMP_HANDSHAKE_SIZE] {
    let mut packet = [0u8; RTMP_HANDSHAKE_SIZE];
    rand::rng().fill_bytes(&mut packet);
    packet
}

/// Builds a type-0 part-one packet: `P[0..4] = 0`, `P[4..8] = version`, the
/// rest random (spec.md §4.6 step 2, §9 "Randomness in type-0 packets").
pub fn new_part_one_plain(version: [u8; 4]) -> [u8; RTMP_HANDSHAKE_SIZE] {
    let mut packet = random_packet();
    packet[0..4].copy_from_slice(&[0, 0, 0, 0]);
    packet[4..8].copy_from_slice(&version);
    packet
}

/// Builds a type-1/2 part-one packet with its DH public key and digest filled
/// in at the validation-type's computed offsets (spec.md §4.1, §4.6 step 2).
pub fn new_part_one_digest(
    version: [u8; 4],
    validation_type: ValidationType,
    role_const: &[u8],
) -> Result<([u8; RTMP_HANDSHAKE_SIZE], [u8; DIGEST_LENGTH], DhKeyPair), HandshakeError> {
    let mut packet = random_packet();
    packet[0..4].copy_from_slice(&[0, 0, 0, 0]);
    packet[4..8].copy_from_slice(&version);

    let dh = DhKeyPair::generate()?;
    let pk_spec = validation_type
        .public_key_offset_spec()
        .ok_or(HandshakeError::Misuse("new_part_one_digest called with validation type 0"))?;
    let pk_offset = super::define::offset_from_fingerprint(&packet, pk_spec);
    packet[pk_offset..pk_offset + PUBLIC_KEY_LENGTH].copy_from_slice(dh.public_key());

    let digest_spec = validation_type
        .digest_offset_spec()
        .ok_or(HandshakeError::Misuse("new_part_one_digest called with validation type 0"))?;
    let digest_offset = super::define::offset_from_fingerprint(&packet, digest_spec);
    let digest = digest_excluding(&packet, digest_offset, role_const)?;
    packet[digest_offset..digest_offset + DIGEST_LENGTH].copy_from_slice(&digest);

    Ok((packet, digest, dh))
}

/// Validates a peer's type-1/2 part-one packet against a candidate
/// validation type, returning the embedded digest and DH public key on
/// success (spec.md §4.6).
pub fn verify_part_one_digest(
    packet: &[u8; RTMP_HANDSHAKE_SIZE],
    validation_type: ValidationType,
    peer_role_const: &[u8],
) -> Result<([u8; DIGEST_LENGTH], [u8; PUBLIC_KEY_LENGTH]), HandshakeError> {
    let digest_spec = validation_type
        .digest_offset_spec()
        .ok_or(HandshakeError::Misuse("verify_part_one_digest called with validation type 0"))?;
    let digest_offset = super::define::offset_from_fingerprint(packet, digest_spec);

    let expected = digest_excluding(packet, digest_offset, peer_role_const)?;
    let actual = &packet[digest_offset..digest_offset + DIGEST_LENGTH];

    if actual != expected {
        return Err(HandshakeError::PeerValidationFailure);
    }

    let pk_spec = validation_type
        .public_key_offset_spec()
        .ok_or(HandshakeError::Misuse("verify_part_one_digest called with validation type 0"))?;
    let pk_offset = super::define::offset_from_fingerprint(packet, pk_spec);
    let mut public_key = [0u8; PUBLIC_KEY_LENGTH];
    public_key.copy_from_slice(&packet[pk_offset..pk_offset + PUBLIC_KEY_LENGTH]);

    let mut digest = [0u8; DIGEST_LENGTH];
    digest.copy_from_slice(actual);

    Ok((digest, public_key))
}

/// Builds a type-1/2 part-two packet: a fresh random 1536-byte packet with
/// its trailing 32 bytes overwritten with `HMAC-SHA-256(key, packet[..1504])`,
/// where `key = HMAC-SHA-256(peer_digest, role_const_crud)` (spec.md §4.6).
pub fn new_part_two_digest(peer_digest: &[u8; DIGEST_LENGTH], role_const_crud: &[u8]) -> Result<[u8; RTMP_HANDSHAKE_SIZE], HandshakeError> {
    let key = super::digest::hmac_sha256(role_const_crud, peer_digest)?;
    let mut packet = random_packet();
    let body_len = RTMP_HANDSHAKE_SIZE - DIGEST_LENGTH;
    let digest = super::digest::hmac_sha256(&key, &packet[..body_len])?;
    packet[body_len..].copy_from_slice(&digest);
    Ok(packet)
}

/// Returns whether a received type-1/2 part-two packet's trailing 32-byte
/// digest matches the one derived from `own_digest` (the digest this side
/// embedded in its own part-one) and `role_const_crud`.
pub fn verify_part_two_digest(packet: &[u8; RTMP_HANDSHAKE_SIZE], own_digest: &[u8; DIGEST_LENGTH], role_const_crud: &[u8]) -> Result<bool, HandshakeError> {
    let key = super::digest::hmac_sha256(role_const_crud, own_digest)?;
    let body_len = RTMP_HANDSHAKE_SIZE - DIGEST_LENGTH;
    let expected = super::digest::hmac_sha256(&key, &packet[..body_len])?;
    Ok(expected == packet[body_len..])
}

/// Builds the type-0 part-two packet: the peer's part-one, with the first 4
/// bytes overwritten with `peer_time` and the next 4 zeroed (spec.md §4.6
/// step 4, testable law 6).
pub fn new_part_two_echo(peer_part_one: &[u8; RTMP_HANDSHAKE_SIZE], peer_time: u32) -> [u8; RTMP_HANDSHAKE_SIZE] {
    let mut packet = *peer_part_one;
    BigEndian::write_u32(&mut packet[0..4], peer_time);
    packet[4..8].copy_from_slice(&[0, 0, 0, 0]);
    packet
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;
    use crate::handshake::define::{CLIENT_CONST, DEFAULT_CLIENT_VERSION};

    #[test]
    fn test_part_one_plain_layout() {
        let packet = new_part_one_plain(DEFAULT_CLIENT_VERSION);
        assert_eq!(&packet[0..4], &[0, 0, 0, 0]);
        assert_eq!(&packet[4..8], &DEFAULT_CLIENT_VERSION);
    }

    #[test]
    fn test_part_one_digest_round_trip() {
        let (packet, digest, _dh) = new_part_one_digest(DEFAULT_CLIENT_VERSION, ValidationType::Type1, CLIENT_CONST).unwrap();
        let (verified_digest, _pubkey) = verify_part_one_digest(&packet, ValidationType::Type1, CLIENT_CONST).unwrap();
        assert_eq!(digest, verified_digest);
    }

    #[test]
    fn test_part_one_digest_rejects_wrong_type() {
        let (packet, _digest, _dh) = new_part_one_digest(DEFAULT_CLIENT_VERSION, ValidationType::Type1, CLIENT_CONST).unwrap();
        assert!(verify_part_one_digest(&packet, ValidationType::Type2, CLIENT_CONST).is_err());
    }

    #[test]
    fn test_part_two_echo() {
        let peer_part_one = {
            let mut p = [9u8; RTMP_HANDSHAKE_SIZE];
            p[0..4].copy_from_slice(&123u32.to_be_bytes());
            p
        };
        let echoed = new_part_two_echo(&peer_part_one, 456);
        assert_eq!(&echoed[0..4], &456u32.to_be_bytes());
        assert_eq!(&echoed[4..8], &[0, 0, 0, 0]);
        assert_eq!(&echoed[8..], &peer_part_one[8..]);
    }

    #[test]
    fn test_part_two_digest_round_trip() {
        let digest = [3u8; DIGEST_LENGTH];
        let packet = new_part_two_digest(&digest, CLIENT_CONST).unwrap();
        assert!(verify_part_two_digest(&packet, &digest, CLIENT_CONST).unwrap());
        assert!(!verify_part_two_digest(&packet, &[4u8; DIGEST_LENGTH], CLIENT_CONST).unwrap());
    }
}
