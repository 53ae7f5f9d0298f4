//! The RTMP/RTMPE handshake engine: client and server state machines,
//! digest/DH/RC4 primitives, and SWF verification.

mod cipher;
mod client;
mod config;
mod define;
mod dh;
mod digest;
mod errors;
mod packet;
mod server;
mod swf;

pub use client::ClientHandshake;
pub use config::ClientHandshakeConfig;
pub use define::{
    DEFAULT_CLIENT_VERSION, DEFAULT_SERVER_VERSION, DIGEST_LENGTH, PUBLIC_KEY_LENGTH, RTMP_HANDSHAKE_SIZE,
    SWF_VERIFICATION_LENGTH, ValidationType,
};
pub use errors::{DigestError, HandshakeError};
pub use server::ServerHandshake;

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use std::io;

    use bytes::{Bytes, BytesMut};

    use super::*;

    fn run_round_trip(client_version: [u8; 4], rtmpe: bool) -> (ClientHandshake, ServerHandshake) {
        let mut client = ClientHandshake::new(ClientHandshakeConfig {
            rtmpe,
            client_version,
            ..Default::default()
        });
        let mut server = ServerHandshake::new();

        let c0 = client.encode_c0().unwrap();
        let c1 = client.encode_c1().unwrap();

        let mut c0c1 = BytesMut::new();
        c0c1.extend_from_slice(&[c0]);
        c0c1.extend_from_slice(&c1);
        server.decode_client_0_and_1(&mut io::Cursor::new(c0c1.freeze())).unwrap();

        let s0 = server.encode_s0().unwrap();
        let s1 = server.encode_s1().unwrap();
        let s2 = server.encode_s2().unwrap();

        let mut s0s1s2 = BytesMut::new();
        s0s1s2.extend_from_slice(&[s0]);
        s0s1s2.extend_from_slice(&s1);
        s0s1s2.extend_from_slice(&s2);
        client.decode_server_all(&mut io::Cursor::new(s0s1s2.freeze())).unwrap();

        let c2 = client.encode_c2().unwrap();
        server.decode_client_2(&mut io::Cursor::new(Bytes::copy_from_slice(&c2))).unwrap();

        (client, server)
    }

    // S1: Type-0 plain round trip.
    #[test]
    fn test_scenario_type0_plain_round_trip() {
        let (_client, _server) = run_round_trip([0, 0, 0, 0], false);
    }

    // S2: Type-1 plain round trip.
    #[test]
    fn test_scenario_type1_plain_round_trip() {
        let (client, _server) = run_round_trip(DEFAULT_CLIENT_VERSION, false);
        assert!(!client.is_rtmpe());
    }

    // S3: Type-2 RTMPE round trip, encrypt/decrypt across the pair.
    #[test]
    fn test_scenario_type2_rtmpe_round_trip() {
        let (mut client, mut server) = run_round_trip([0x0A, 0x00, 0x20, 0x02], true);
        assert!(client.is_rtmpe());
        assert!(server.is_rtmpe());

        let plaintext = b"hello world".to_vec();
        let mut buf = plaintext.clone();
        client.cipher_update_out(&mut buf);
        server.cipher_update_in(&mut buf);
        assert_eq!(buf, plaintext);

        let mut buf2 = plaintext.clone();
        server.cipher_update_out(&mut buf2);
        client.cipher_update_in(&mut buf2);
        assert_eq!(buf2, plaintext);
    }

    // S4: RTMPE downgrade when the server replies with plain RTMP's S0.
    #[test]
    fn test_scenario_rtmpe_downgrade() {
        let mut client = ClientHandshake::new(ClientHandshakeConfig {
            rtmpe: true,
            client_version: [0, 0, 0, 0],
            ..Default::default()
        });
        client.encode_c0().unwrap();
        client.encode_c1().unwrap();

        let mut s0s1s2 = BytesMut::new();
        s0s1s2.extend_from_slice(&[0x03]); // plain RTMP S0
        s0s1s2.extend_from_slice(&[0u8; RTMP_HANDSHAKE_SIZE]);
        s0s1s2.extend_from_slice(&[0u8; RTMP_HANDSHAKE_SIZE]);

        client.decode_server_all(&mut io::Cursor::new(s0s1s2.freeze())).unwrap();
        assert!(!client.is_rtmpe());
    }

    #[test]
    fn test_client_server_validation_type_symmetry() {
        for version in [[0x09, 0x00, 0x7C, 0x02], [0x0A, 0x00, 0x20, 0x02]] {
            let (_client, server) = run_round_trip(version, false);
            assert_eq!(server.peer_version(), version);
        }
    }

    // S5: scheme auto-fallback. The client picks type 1 locally, but the
    // peer's S1 only validates under type 2; the client adopts type 2 and the
    // handshake still succeeds.
    #[test]
    fn test_scenario_scheme_auto_fallback() {
        use super::define::{RANDOM_CRUD, SERVER_CONST};
        use super::packet;

        let mut client = ClientHandshake::new(ClientHandshakeConfig {
            client_version: DEFAULT_CLIENT_VERSION, // selects type 1 locally
            ..Default::default()
        });
        client.encode_c0().unwrap();
        client.encode_c1().unwrap();

        let client_own_digest = *client.own_part_one_digest().unwrap();

        let (s1, _s1_digest, _server_dh) =
            packet::new_part_one_digest(DEFAULT_SERVER_VERSION, ValidationType::Type2, SERVER_CONST).unwrap();

        let mut server_const_crud = SERVER_CONST.to_vec();
        server_const_crud.extend_from_slice(&RANDOM_CRUD);
        let s2 = packet::new_part_two_digest(&client_own_digest, &server_const_crud).unwrap();

        let mut s0s1s2 = BytesMut::new();
        s0s1s2.extend_from_slice(&[0x03]);
        s0s1s2.extend_from_slice(&s1);
        s0s1s2.extend_from_slice(&s2);

        client.decode_server_all(&mut io::Cursor::new(s0s1s2.freeze())).unwrap();
        client.encode_c2().unwrap();
    }

    // S6: SWF verification against a canned S1 with a known trailing 32 bytes.
    #[test]
    fn test_scenario_swf_verification() {
        let swf_hash = [0x5Au8; DIGEST_LENGTH];
        let swf_size = 12345u32;

        let mut client = ClientHandshake::new(ClientHandshakeConfig {
            client_version: [0, 0, 0, 0], // type 0, no digest validation required
            swf_hash: Some(swf_hash),
            swf_size,
            ..Default::default()
        });
        client.encode_c0().unwrap();
        client.encode_c1().unwrap();

        let s1_tail = [0x22u8; DIGEST_LENGTH];
        let mut s1 = [0u8; RTMP_HANDSHAKE_SIZE];
        s1[RTMP_HANDSHAKE_SIZE - DIGEST_LENGTH..].copy_from_slice(&s1_tail);

        let mut s0s1s2 = BytesMut::new();
        s0s1s2.extend_from_slice(&[0x03]);
        s0s1s2.extend_from_slice(&s1);
        s0s1s2.extend_from_slice(&[0u8; RTMP_HANDSHAKE_SIZE]);

        client.decode_server_all(&mut io::Cursor::new(s0s1s2.freeze())).unwrap();

        let expected = super::digest::hmac_sha256(&s1_tail, &swf_hash).unwrap();
        let swfv = client.swfv_bytes().unwrap();
        assert_eq!(&swfv[0..2], &[0x01, 0x01]);
        assert_eq!(&swfv[2..6], &swf_size.to_be_bytes());
        assert_eq!(&swfv[6..10], &swf_size.to_be_bytes());
        assert_eq!(&swfv[10..42], &expected[..]);
    }
}
