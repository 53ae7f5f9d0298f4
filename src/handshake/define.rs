//! Wire-format constants and small value types shared by every handshake component.

nutype_enum::nutype_enum! {
    /// The one-byte version marker exchanged as C0/S0.
    pub enum RtmpVersion(u8) {
        /// Plain RTMP.
        Plain = 0x03,
        /// Encrypted RTMP (RTMPE).
        Encrypted = 0x06,
    }
}

/// Size in bytes of a C1/C2/S1/S2 packet.
pub const RTMP_HANDSHAKE_SIZE: usize = 1536;

/// Size in bytes of the leading time+version header in C1/S1.
pub const TIME_VERSION_LENGTH: usize = 8;

/// Size in bytes of a validation digest.
pub const DIGEST_LENGTH: usize = 32;

/// Size in bytes of a DH public key as carried on the wire.
pub const PUBLIC_KEY_LENGTH: usize = 128;

/// Size in bytes of the computed SWF-verification response.
pub const SWF_VERIFICATION_LENGTH: usize = 42;

/// `(pointer, modulus, increment)` triple used by the offset-from-fingerprint rule.
#[derive(Debug, Clone, Copy)]
pub struct OffsetSpec {
    pub pointer: usize,
    pub modulus: usize,
    pub increment: usize,
}

/// Which of the two Adobe-compatible digest-validated schemes is in force.
///
/// `Type0` is the legacy echo handshake: no digest, no DH, no RC4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationType {
    Type0,
    Type1,
    Type2,
}

impl ValidationType {
    /// Offset spec for the 32-byte digest slot, per spec.md §4.1.
    pub fn digest_offset_spec(self) -> Option<OffsetSpec> {
        match self {
            ValidationType::Type0 => None,
            ValidationType::Type1 => Some(OffsetSpec {
                pointer: 8,
                modulus: 728,
                increment: 12,
            }),
            ValidationType::Type2 => Some(OffsetSpec {
                pointer: 772,
                modulus: 728,
                increment: 776,
            }),
        }
    }

    /// Offset spec for the 128-byte DH public-key slot, per spec.md §4.1.
    pub fn public_key_offset_spec(self) -> Option<OffsetSpec> {
        match self {
            ValidationType::Type0 => None,
            ValidationType::Type1 => Some(OffsetSpec {
                pointer: 1532,
                modulus: 632,
                increment: 772,
            }),
            ValidationType::Type2 => Some(OffsetSpec {
                pointer: 768,
                modulus: 632,
                increment: 8,
            }),
        }
    }

    /// The other non-zero validation type. Used by the client's fallback retry.
    pub fn alternate(self) -> Option<ValidationType> {
        match self {
            ValidationType::Type1 => Some(ValidationType::Type2),
            ValidationType::Type2 => Some(ValidationType::Type1),
            ValidationType::Type0 => None,
        }
    }
}

/// Maps a peer's 4-byte version field (big-endian u32) to a validation type.
///
/// See spec.md §4.3 for the table this implements.
pub fn validation_type_from_version(version: u32) -> ValidationType {
    match version {
        0x09007C02 | 0x09009702 | 0x09009F02 | 0x0900F602 | 0x0A000202 | 0x0A000C02 | 0x80000102 => ValidationType::Type1,
        0x80000302 | 0x0A002002 => ValidationType::Type2,
        _ => ValidationType::Type0,
    }
}

/// The client's default own-version, `09 00 7C 02` (selects validation type 1).
pub const DEFAULT_CLIENT_VERSION: [u8; 4] = [0x09, 0x00, 0x7C, 0x02];

/// The server's default own-version, `03 05 01 01`.
pub const DEFAULT_SERVER_VERSION: [u8; 4] = [0x03, 0x05, 0x01, 0x01];

/// `"Genuine Adobe Flash Player 001"`.
pub const CLIENT_CONST: &[u8] = b"Genuine Adobe Flash Player 001";

/// `"Genuine Adobe Flash Media Server 001"`.
pub const SERVER_CONST: &[u8] = b"Genuine Adobe Flash Media Server 001";

/// 32 fixed bytes appended to the role constants to form the `*_CRUD` keys.
pub const RANDOM_CRUD: [u8; 32] = [
    0xF0, 0xEE, 0xC2, 0x4A, 0x80, 0x68, 0xBE, 0xE8, 0x2E, 0x00, 0xD0, 0xD1, 0x02, 0x9E, 0x7E, 0x57, 0x6E, 0xEC, 0x5D, 0x2D,
    0x29, 0x80, 0x6F, 0xAB, 0x93, 0xB8, 0xE6, 0x36, 0xCF, 0xEB, 0x31, 0xAE,
];

/// Phase of a client-side handshake. Enforces the call order from spec.md §5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientHandshakeState {
    /// Need to call `encode_c0`/`encode_c1`.
    Initial,
    /// C0/C1 sent, waiting to call `decode_server_all`.
    AwaitingServer,
    /// S0/S1/S2 validated, waiting to call `encode_c2`.
    AwaitingC2,
    /// Handshake finished.
    Finish,
}

/// Phase of a server-side handshake. Enforces the call order from spec.md §5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerHandshakeState {
    /// Need to call `decode_client_0_and_1`.
    ReadC0C1,
    /// C0/C1 read, need to call the `encode_s0`/`encode_s1`/`encode_s2` trio.
    WriteS0S1S2,
    /// S0/S1/S2 written, waiting to call `decode_client_2`.
    ReadC2,
    /// Handshake finished.
    Finish,
}

fn sum_u8(bytes: &[u8]) -> u32 {
    bytes.iter().map(|&b| b as u32).sum()
}

/// The offset-from-fingerprint rule: read 4 bytes at `spec.pointer`, sum them as
/// unsigned 8-bit values, reduce modulo `spec.modulus`, then add `spec.increment`.
///
/// The result always lies in `[increment, increment + modulus)` (spec.md §8, law 8).
pub fn offset_from_fingerprint(packet: &[u8; RTMP_HANDSHAKE_SIZE], spec: OffsetSpec) -> usize {
    let fingerprint = sum_u8(&packet[spec.pointer..spec.pointer + 4]);
    (fingerprint as usize % spec.modulus) + spec.increment
}
