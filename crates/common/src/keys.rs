use serde::{Deserialize, Serialize};
use std::fmt;

/// A payment key hash identifying an on-chain party
/// Used for the registry authority and for transaction required-signer lists
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyHash(pub [u8; 28]);

impl KeyHash {
    /// Create a new key hash from a 28-byte array
    pub fn new(bytes: [u8; 28]) -> Self {
        Self(bytes)
    }

    /// Get the inner bytes
    pub fn as_bytes(&self) -> &[u8; 28] {
        &self.0
    }

    /// Convert to hexadecimal string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Create from hexadecimal string
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 28 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 28];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Display for KeyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_hash_hex_roundtrip() {
        let key = KeyHash::new([7u8; 28]);
        let hex = key.to_hex();
        let decoded = KeyHash::from_hex(&hex).unwrap();
        assert_eq!(key, decoded);
    }

    #[test]
    fn test_key_hash_invalid_length() {
        let result = KeyHash::from_hex("0102030405");
        assert!(result.is_err());
    }
}
