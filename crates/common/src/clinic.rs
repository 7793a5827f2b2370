use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest clinic identifier the registry accepts, in bytes.
///
/// Map keys must fit a single CBOR byte-string chunk so that the canonical
/// key order of the on-chain map is the plain byte order of the identifier.
pub const MAX_CLINIC_ID_LEN: usize = 64;

/// Opaque identifier of a clinic, the key of the on-chain registry map.
///
/// Ordering is the natural byte order of the identifier, which is also the
/// canonical serialization order of the registry map.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClinicId(Vec<u8>);

impl ClinicId {
    /// Create a clinic id from raw bytes
    pub fn new(bytes: Vec<u8>) -> Result<Self, hex::FromHexError> {
        if bytes.is_empty() || bytes.len() > MAX_CLINIC_ID_LEN {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        Ok(Self(bytes))
    }

    /// Get the inner bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Convert to hexadecimal string
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Create from hexadecimal string
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        Self::new(hex::decode(s)?)
    }
}

impl fmt::Display for ClinicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
