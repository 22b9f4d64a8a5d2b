use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Opaque session identity issued once at join time.
/// Uses CSPRNG bytes; the core only ever compares tokens for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionToken([u8; 32]);

impl SessionToken {
    /// Generate a new cryptographically secure session token
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Create from bytes (for deserialization)
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl Default for SessionToken {
    fn default() -> Self {
        Self::generate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_generate_unique() {
        let t1 = SessionToken::generate();
        let t2 = SessionToken::generate();
        assert_ne!(t1, t2);
    }

    #[test]
    fn test_token_from_bytes() {
        let original = SessionToken::generate();
        let restored = SessionToken::from_bytes(*original.as_bytes());
        assert_eq!(original, restored);
    }

    #[test]
    fn test_token_serde_roundtrip() {
        let token = SessionToken::generate();
        let json = serde_json::to_value(&token).unwrap();
        let back: SessionToken = serde_json::from_value(json).unwrap();
        assert_eq!(token, back);
    }
}
