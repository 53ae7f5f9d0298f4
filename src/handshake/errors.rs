#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    /// Digest mismatch in the peer's part-one (C1/S1), after both validation-type
    /// candidates have been tried on the client side.
    #[error("peer validation failed")]
    PeerValidationFailure,
    /// Digest mismatch in the peer's part-two (C2/S2). Fatal on the client side;
    /// the server side tolerates this (see spec.md §9) and never returns it.
    #[error("part two validation failed")]
    Part2ValidationFailure,
    /// DH or RC4 primitives failed to initialize.
    #[error("crypto primitive unavailable")]
    CryptoUnavailable,
    /// An operation was called out of the role-specific order documented in spec.md §4.6.
    #[error("handshake operation called out of order: {0}")]
    Misuse(&'static str),
    #[error("digest error: {0}")]
    Digest(#[from] DigestError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error("digest length not correct")]
    DigestLengthNotCorrect,
    #[error("cannot generate digest")]
    CannotGenerate,
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use byteorder::ReadBytesExt;

    use super::*;

    #[test]
    fn test_error_display() {
        let err = HandshakeError::Digest(DigestError::CannotGenerate);
        assert_eq!(err.to_string(), "digest error: cannot generate digest");

        let err = HandshakeError::Digest(DigestError::DigestLengthNotCorrect);
        assert_eq!(err.to_string(), "digest error: digest length not correct");

        let err = HandshakeError::Io(std::io::Cursor::new(Vec::<u8>::new()).read_u8().unwrap_err());
        assert_eq!(err.to_string(), "io error: failed to fill whole buffer");

        assert_eq!(HandshakeError::PeerValidationFailure.to_string(), "peer validation failed");
        assert_eq!(
            HandshakeError::Part2ValidationFailure.to_string(),
            "part two validation failed"
        );
        assert_eq!(HandshakeError::CryptoUnavailable.to_string(), "crypto primitive unavailable");
        assert_eq!(
            HandshakeError::Misuse("encode_c2 called before decode_server_all").to_string(),
            "handshake operation called out of order: encode_c2 called before decode_server_all"
        );
    }
}
