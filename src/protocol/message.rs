//! Typed results decoded from response frames.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of the session key returned by the get-key exchange
pub const SESSION_KEY_SIZE: usize = 64;

/// Salt and host nonce returned by the identify exchange; inputs to the
/// caller's authentication computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentificationResponse {
    pub salt: Vec<u8>,
    pub nonce: Vec<u8>,
}

/// Session key material; wiped from memory on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SessionKey([u8; SESSION_KEY_SIZE]);

impl SessionKey {
    pub fn new(bytes: [u8; SESSION_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SESSION_KEY_SIZE] {
        &self.0
    }
}

impl TryFrom<&[u8]> for SessionKey {
    type Error = std::array::TryFromSliceError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        <[u8; SESSION_KEY_SIZE]>::try_from(bytes).map(Self)
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey(..)")
    }
}
