//! Error types for the Thor transaction codec.
//!
//! Every failure carries the dotted path of the field or profile that failed
//! (`tx.clauses.#1.to`) and, where one exists, a rendering of the offending
//! raw value. Rendered values are truncated so that attacker-sized buffers do
//! not end up verbatim in logs.

use thiserror::Error;

/// Longest rendering of an offending value kept inside an error.
const MAX_RENDERED_VALUE: usize = 64;

/// Errors produced by the codec.
///
/// Malformed input is an expected condition at this boundary, so every
/// variant is returned to the caller; nothing is recovered locally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// A value does not satisfy its kind's contract during encode.
    #[error("invalid field encoding at `{context}`: {reason} (value: {value})")]
    InvalidFieldEncoding {
        context: String,
        value: String,
        reason: String,
    },

    /// Bytes do not satisfy a kind's contract during decode.
    #[error("invalid field decoding at `{context}`: {reason} (value: {value})")]
    InvalidFieldDecoding {
        context: String,
        value: String,
        reason: String,
    },

    /// RLP structure malformed, truncated, non-canonical, or matching no profile.
    #[error("invalid encoding at `{context}`: {reason}")]
    InvalidEncoding { context: String, reason: String },

    /// Signature material could not be used to recover a signer.
    #[error("invalid signature at `{context}`: {reason}")]
    InvalidSignature { context: String, reason: String },

    /// The typed request is in a state the requested operation does not accept.
    #[error("invalid transaction: {reason}")]
    InvalidTransaction { reason: String },
}

impl CodecError {
    /// Builds an [`CodecError::InvalidFieldEncoding`].
    pub fn field_encoding(
        context: impl Into<String>,
        value: impl AsRef<str>,
        reason: impl Into<String>,
    ) -> Self {
        CodecError::InvalidFieldEncoding {
            context: context.into(),
            value: truncate(value.as_ref()),
            reason: reason.into(),
        }
    }

    /// Builds an [`CodecError::InvalidFieldDecoding`] from the raw bytes that failed.
    pub fn field_decoding(
        context: impl Into<String>,
        raw: &[u8],
        reason: impl Into<String>,
    ) -> Self {
        CodecError::InvalidFieldDecoding {
            context: context.into(),
            value: truncate(&format!("0x{}", hex::encode(raw))),
            reason: reason.into(),
        }
    }

    /// Builds an [`CodecError::InvalidEncoding`].
    pub fn encoding(context: impl Into<String>, reason: impl Into<String>) -> Self {
        CodecError::InvalidEncoding {
            context: context.into(),
            reason: reason.into(),
        }
    }

    /// Builds an [`CodecError::InvalidSignature`].
    pub fn signature(context: impl Into<String>, reason: impl Into<String>) -> Self {
        CodecError::InvalidSignature {
            context: context.into(),
            reason: reason.into(),
        }
    }

    /// Builds an [`CodecError::InvalidTransaction`].
    pub fn transaction(reason: impl Into<String>) -> Self {
        CodecError::InvalidTransaction {
            reason: reason.into(),
        }
    }

    /// Returns true if this error was raised while encoding a value.
    #[inline]
    pub fn is_encoding_error(&self) -> bool {
        matches!(self, CodecError::InvalidFieldEncoding { .. })
    }

    /// Returns true if this error was raised while decoding bytes.
    #[inline]
    pub fn is_decoding_error(&self) -> bool {
        matches!(
            self,
            CodecError::InvalidFieldDecoding { .. }
                | CodecError::InvalidEncoding { .. }
                | CodecError::InvalidSignature { .. }
        )
    }

    /// Returns the field path the error refers to, if any.
    pub fn context(&self) -> Option<&str> {
        match self {
            CodecError::InvalidFieldEncoding { context, .. }
            | CodecError::InvalidFieldDecoding { context, .. }
            | CodecError::InvalidEncoding { context, .. }
            | CodecError::InvalidSignature { context, .. } => Some(context),
            CodecError::InvalidTransaction { .. } => None,
        }
    }
}

fn truncate(value: &str) -> String {
    if value.len() <= MAX_RENDERED_VALUE {
        return value.to_owned();
    }
    let mut end = MAX_RENDERED_VALUE;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &value[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let enc = CodecError::field_encoding("tx.gas", "-1", "negative");
        assert!(enc.is_encoding_error());
        assert!(!enc.is_decoding_error());

        let dec = CodecError::field_decoding("tx.nonce", &[0x00, 0x01], "leading zero");
        assert!(dec.is_decoding_error());
        assert_eq!(dec.context(), Some("tx.nonce"));

        let tx = CodecError::transaction("already signed");
        assert!(tx.context().is_none());
    }

    #[test]
    fn test_decoding_value_rendered_as_hex() {
        let err = CodecError::field_decoding("tx.chainTag", &[0x00, 0x2a], "leading zero");
        match err {
            CodecError::InvalidFieldDecoding { value, .. } => assert_eq!(value, "0x002a"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_long_values_truncated() {
        let raw = [0xabu8; 200];
        let err = CodecError::field_decoding("tx.signature", &raw, "bad length");
        let CodecError::InvalidFieldDecoding { value, .. } = err else {
            panic!("wrong variant");
        };
        assert!(value.ends_with("..."));
        assert_eq!(value.len(), MAX_RENDERED_VALUE + 3);
    }

    #[test]
    fn test_display_mentions_context() {
        let err = CodecError::encoding("tx", "invalid encoded transaction request");
        assert_eq!(
            err.to_string(),
            "invalid encoding at `tx`: invalid encoded transaction request"
        );
    }
}
