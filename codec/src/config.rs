//! Codec limits.

use serde::{Deserialize, Serialize};
use thor_tx_common::{MAX_RLP_DEPTH, MAX_TX_SIZE};

/// Bounds applied to untrusted input before and during decoding.
///
/// Hosting applications can embed this in their own configuration; missing
/// keys fall back to the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodecConfig {
    /// Maximum RLP nesting depth.
    pub max_depth: usize,
    /// Largest encoded transaction accepted by decode, prefix included.
    pub max_encoded_len: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_depth: MAX_RLP_DEPTH,
            max_encoded_len: MAX_TX_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CodecConfig::default();
        assert_eq!(config.max_depth, 16);
        assert_eq!(config.max_encoded_len, 65536);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: CodecConfig = serde_json::from_str(r#"{"max_encoded_len": 1024}"#).unwrap();
        assert_eq!(config.max_encoded_len, 1024);
        assert_eq!(config.max_depth, 16);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(serde_json::from_str::<CodecConfig>(r#"{"depth": 3}"#).is_err());
    }
}
