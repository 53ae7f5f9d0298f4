//! The handful of application-configuration fields the handshake consumes.

use serde_derive::Deserialize;

use super::define::{DEFAULT_CLIENT_VERSION, DIGEST_LENGTH};

/// Options consumed by [`super::client::ClientHandshake::new`].
///
/// Deserializable so the surrounding application can load it straight out of
/// its own configuration file alongside unrelated settings; the handshake
/// engine itself never reads a config file.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientHandshakeConfig {
    /// Negotiate RTMPE (RC4-encrypted) instead of plain RTMP.
    #[serde(default)]
    pub rtmpe: bool,
    /// Overrides the 4-byte version the client advertises in C1.
    /// Defaults to [`DEFAULT_CLIENT_VERSION`], which selects validation type 1.
    #[serde(default = "default_client_version")]
    pub client_version: [u8; 4],
    /// Pre-shared SWF content hash, if SWF verification is required.
    #[serde(default)]
    pub swf_hash: Option<[u8; DIGEST_LENGTH]>,
    /// Size in bytes of the SWF file `swf_hash` was computed over.
    #[serde(default)]
    pub swf_size: u32,
}

fn default_client_version() -> [u8; 4] {
    DEFAULT_CLIENT_VERSION
}

impl Default for ClientHandshakeConfig {
    fn default() -> Self {
        Self {
            rtmpe: false,
            client_version: DEFAULT_CLIENT_VERSION,
            swf_hash: None,
            swf_size: 0,
        }
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientHandshakeConfig::default();
        assert!(!config.rtmpe);
        assert_eq!(config.client_version, DEFAULT_CLIENT_VERSION);
        assert!(config.swf_hash.is_none());
    }

    #[test]
    fn test_deserialize_partial_config() {
        let json = r#"{"rtmpe": true}"#;
        let config: ClientHandshakeConfig = serde_json::from_str(json).unwrap();
        assert!(config.rtmpe);
        assert_eq!(config.client_version, DEFAULT_CLIENT_VERSION);
    }
}
