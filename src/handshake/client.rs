//! Client-side handshake state machine: C0/C1 out, S0/S1/S2 in, C2 out.

use std::io;

use byteorder::{BigEndian, ReadBytesExt};
use bytes::Bytes;
use scuffle_bytes_util::BytesCursorExt;

use super::cipher::CipherPair;
use super::config::ClientHandshakeConfig;
use super::define::{
    CLIENT_CONST, ClientHandshakeState, DEFAULT_CLIENT_VERSION, DIGEST_LENGTH, PUBLIC_KEY_LENGTH, RTMP_HANDSHAKE_SIZE,
    RANDOM_CRUD, RtmpVersion, SERVER_CONST, SWF_VERIFICATION_LENGTH, ValidationType, validation_type_from_version,
};
use super::dh::DhKeyPair;
use super::errors::HandshakeError;
use super::packet;
use super::swf::compute_swfv_bytes;

fn client_const_crud() -> Vec<u8> {
    let mut v = CLIENT_CONST.to_vec();
    v.extend_from_slice(&RANDOM_CRUD);
    v
}

fn server_const_crud() -> Vec<u8> {
    let mut v = SERVER_CONST.to_vec();
    v.extend_from_slice(&RANDOM_CRUD);
    v
}

/// Drives the client side of the RTMP/RTMPE handshake.
///
/// Methods must be called in the order `encode_c0` -> `encode_c1` ->
/// `decode_server_all` -> `encode_c2`, matching spec.md §4.6 and §5. Calling
/// them out of order returns [`HandshakeError::Misuse`].
pub struct ClientHandshake {
    state: ClientHandshakeState,
    rtmpe: bool,
    own_version: [u8; 4],
    validation_type: ValidationType,

    dh: Option<DhKeyPair>,
    own_part_one_digest: Option<[u8; DIGEST_LENGTH]>,
    peer_part_one_digest: Option<[u8; DIGEST_LENGTH]>,
    peer_public_key: Option<[u8; PUBLIC_KEY_LENGTH]>,
    peer_version: Option<[u8; 4]>,
    peer_time: u32,

    own_part_one: Option<[u8; RTMP_HANDSHAKE_SIZE]>,
    peer_part_one: Option<[u8; RTMP_HANDSHAKE_SIZE]>,

    swf_hash: Option<[u8; DIGEST_LENGTH]>,
    swf_size: u32,
    swfv_bytes: Option<[u8; SWF_VERIFICATION_LENGTH]>,

    cipher: Option<CipherPair>,
}

impl ClientHandshake {
    /// Creates a new client handshake session from application configuration.
    pub fn new(config: ClientHandshakeConfig) -> Self {
        let validation_type = validation_type_from_version(BigEndian::read_u32(&config.client_version));

        Self {
            state: ClientHandshakeState::Initial,
            rtmpe: config.rtmpe,
            own_version: config.client_version,
            validation_type,
            dh: None,
            own_part_one_digest: None,
            peer_part_one_digest: None,
            peer_public_key: None,
            peer_version: None,
            peer_time: 0,
            own_part_one: None,
            peer_part_one: None,
            swf_hash: config.swf_hash,
            swf_size: config.swf_size,
            swfv_bytes: None,
            cipher: None,
        }
    }

    /// Whether the session negotiated RTMPE. May downgrade to `false` after
    /// `decode_server_all` if the server replied with plain RTMP (S0 = `0x03`).
    pub fn is_rtmpe(&self) -> bool {
        self.rtmpe
    }

    /// The server's advertised 4-byte version, available after `decode_server_all`.
    pub fn peer_version(&self) -> Option<[u8; 4]> {
        self.peer_version
    }

    /// The client's own C1, retained only for validation type 0 (spec.md §3).
    pub fn own_part_one(&self) -> Option<&[u8; RTMP_HANDSHAKE_SIZE]> {
        self.own_part_one.as_ref()
    }

    /// The client's own part-one digest, retained for validation types 1/2
    /// (spec.md §3's `own_part_one_digest` field).
    pub fn own_part_one_digest(&self) -> Option<&[u8; DIGEST_LENGTH]> {
        self.own_part_one_digest.as_ref()
    }

    /// The precomputed SWF-verification response, if `swf_hash` was configured.
    pub fn swfv_bytes(&self) -> Option<&[u8; SWF_VERIFICATION_LENGTH]> {
        self.swfv_bytes.as_ref()
    }

    /// Decrypts `buf` in place. No-op unless RTMPE is active and the cipher
    /// pair has been constructed.
    pub fn cipher_update_in(&mut self, buf: &mut [u8]) {
        if let Some(cipher) = self.cipher.as_mut() {
            cipher.update_in(buf);
        }
    }

    /// Encrypts `buf` in place. No-op unless RTMPE is active and the cipher
    /// pair has been constructed.
    pub fn cipher_update_out(&mut self, buf: &mut [u8]) {
        if let Some(cipher) = self.cipher.as_mut() {
            cipher.update_out(buf);
        }
    }

    /// Step 1: the one-byte C0, `0x06` if RTMPE else `0x03`.
    pub fn encode_c0(&mut self) -> Result<u8, HandshakeError> {
        if self.state != ClientHandshakeState::Initial {
            return Err(HandshakeError::Misuse("encode_c0 called out of order"));
        }
        Ok(if self.rtmpe {
            RtmpVersion::Encrypted.0
        } else {
            RtmpVersion::Plain.0
        })
    }

    /// Step 2: the 1536-byte C1.
    pub fn encode_c1(&mut self) -> Result<[u8; RTMP_HANDSHAKE_SIZE], HandshakeError> {
        if self.state != ClientHandshakeState::Initial {
            return Err(HandshakeError::Misuse("encode_c1 called out of order"));
        }

        let packet = match self.validation_type {
            ValidationType::Type0 => {
                let packet = packet::new_part_one_plain(self.own_version);
                self.own_part_one = Some(packet);
                packet
            }
            ValidationType::Type1 | ValidationType::Type2 => {
                let (packet, digest, dh) = packet::new_part_one_digest(self.own_version, self.validation_type, CLIENT_CONST)?;
                self.own_part_one_digest = Some(digest);
                self.dh = Some(dh);
                packet
            }
        };

        self.state = ClientHandshakeState::AwaitingServer;
        tracing::debug!(validation_type = ?self.validation_type, "client sent C0/C1");
        Ok(packet)
    }

    /// Step 3: reads S0 (1 byte), S1 (1536 bytes), and S2 (1536 bytes) from `stream`.
    pub fn decode_server_all(&mut self, stream: &mut io::Cursor<Bytes>) -> Result<(), HandshakeError> {
        if self.state != ClientHandshakeState::AwaitingServer {
            return Err(HandshakeError::Misuse("decode_server_all called out of order"));
        }

        let s0 = stream.read_u8()?;
        if self.rtmpe && s0 != RtmpVersion::Encrypted.0 {
            tracing::debug!("server does not support RTMPE, downgrading to plain RTMP");
            self.rtmpe = false;
        }

        let s1_bytes = stream.extract_bytes(RTMP_HANDSHAKE_SIZE)?;
        let mut s1 = [0u8; RTMP_HANDSHAKE_SIZE];
        s1.copy_from_slice(&s1_bytes);

        self.peer_time = BigEndian::read_u32(&s1[0..4]);
        self.peer_version = Some([s1[4], s1[5], s1[6], s1[7]]);

        if let Some(swf_hash) = self.swf_hash {
            let mut tail = [0u8; DIGEST_LENGTH];
            tail.copy_from_slice(&s1[RTMP_HANDSHAKE_SIZE - DIGEST_LENGTH..]);
            self.swfv_bytes = Some(compute_swfv_bytes(&swf_hash, self.swf_size, &tail)?);
        }

        match self.validation_type {
            ValidationType::Type0 => {
                self.peer_part_one = Some(s1);
            }
            ValidationType::Type1 | ValidationType::Type2 => {
                self.verify_server_digest_with_fallback(&s1)?;
            }
        }

        let s2_bytes = stream.extract_bytes(RTMP_HANDSHAKE_SIZE)?;
        let mut s2 = [0u8; RTMP_HANDSHAKE_SIZE];
        s2.copy_from_slice(&s2_bytes);

        if self.validation_type != ValidationType::Type0 {
            let own_digest = self.own_part_one_digest.expect("set in encode_c1 for non-zero validation type");
            if !packet::verify_part_two_digest(&s2, &own_digest, &server_const_crud())? {
                return Err(HandshakeError::Part2ValidationFailure);
            }
        }

        self.state = ClientHandshakeState::AwaitingC2;
        Ok(())
    }

    /// Tries `self.validation_type` against S1; on failure, retries with the
    /// alternate non-zero type (spec.md §4.3, §8 law 7). Double failure aborts.
    fn verify_server_digest_with_fallback(&mut self, s1: &[u8; RTMP_HANDSHAKE_SIZE]) -> Result<(), HandshakeError> {
        match packet::verify_part_one_digest(s1, self.validation_type, SERVER_CONST) {
            Ok((digest, public_key)) => {
                self.peer_part_one_digest = Some(digest);
                self.peer_public_key = Some(public_key);
                self.construct_cipher_if_rtmpe()?;
                Ok(())
            }
            Err(_) => {
                let alternate = self
                    .validation_type
                    .alternate()
                    .expect("non-zero validation type always has an alternate");
                tracing::debug!(from = ?self.validation_type, to = ?alternate, "retrying handshake with alternate validation type");

                let (digest, public_key) = packet::verify_part_one_digest(s1, alternate, SERVER_CONST)?;
                self.validation_type = alternate;
                self.peer_part_one_digest = Some(digest);
                self.peer_public_key = Some(public_key);
                self.construct_cipher_if_rtmpe()?;
                Ok(())
            }
        }
    }

    fn construct_cipher_if_rtmpe(&mut self) -> Result<(), HandshakeError> {
        if !self.rtmpe {
            return Ok(());
        }
        let dh = self.dh.as_ref().ok_or(HandshakeError::CryptoUnavailable)?;
        let peer_public_key = self.peer_public_key.ok_or(HandshakeError::CryptoUnavailable)?;
        let shared_secret = dh.shared_secret(&peer_public_key);
        let cipher = CipherPair::derive(&shared_secret, dh.public_key(), &peer_public_key)?;
        self.cipher = Some(cipher);
        tracing::debug!("RTMPE cipher pair constructed and warmed up");
        Ok(())
    }

    /// Step 4: the 1536-byte C2.
    pub fn encode_c2(&mut self) -> Result<[u8; RTMP_HANDSHAKE_SIZE], HandshakeError> {
        if self.state != ClientHandshakeState::AwaitingC2 {
            return Err(HandshakeError::Misuse("encode_c2 called out of order"));
        }

        let packet = match self.validation_type {
            ValidationType::Type0 => {
                let peer_part_one = self.peer_part_one.expect("set in decode_server_all for type 0");
                packet::new_part_two_echo(&peer_part_one, self.peer_time)
            }
            ValidationType::Type1 | ValidationType::Type2 => {
                let peer_digest = self.peer_part_one_digest.expect("set in decode_server_all for non-zero type");
                packet::new_part_two_digest(&peer_digest, &client_const_crud())?
            }
        };

        self.state = ClientHandshakeState::Finish;
        tracing::debug!("client handshake complete");
        Ok(packet)
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_encode_c1_sets_header() {
        let mut client = ClientHandshake::new(ClientHandshakeConfig {
            client_version: DEFAULT_CLIENT_VERSION,
            ..Default::default()
        });
        client.encode_c0().unwrap();
        let c1 = client.encode_c1().unwrap();
        assert_eq!(c1.len(), RTMP_HANDSHAKE_SIZE);
        assert_eq!(&c1[0..4], &[0, 0, 0, 0]);
        assert_eq!(&c1[4..8], &DEFAULT_CLIENT_VERSION);
    }

    #[test]
    fn test_out_of_order_call_is_misuse() {
        let mut client = ClientHandshake::new(ClientHandshakeConfig::default());
        let err = client.encode_c2().unwrap_err();
        assert!(matches!(err, HandshakeError::Misuse(_)));
    }
}
