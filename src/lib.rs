#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]

mod handshake;

pub use handshake::{
    ClientHandshake, ClientHandshakeConfig, DEFAULT_CLIENT_VERSION, DEFAULT_SERVER_VERSION, DigestError, HandshakeError,
    PUBLIC_KEY_LENGTH, RTMP_HANDSHAKE_SIZE, ServerHandshake, SWF_VERIFICATION_LENGTH, ValidationType,
};
