//! Canonical length-prefixed concatenation
//!
//! Every field is framed as a 4-byte big-endian length followed by its payload:
//! ```text
//! string:  [u32 BE len][len bytes]
//! type:    [u32 BE 4][u32 BE type value]
//! ```
//! No separators and no terminator. The framing feeds both the PBKDF2 salt
//! derivation and the permute plaintext, so it must stay bit-exact.

use nigori_core::{NigoriError, NigoriResult, NigoriType};

/// Builder for the canonical byte string.
#[derive(Debug, Default, Clone)]
pub struct NigoriStream {
    buf: Vec<u8>,
}

impl NigoriStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `[u32 BE len][bytes]`. Fields longer than `u32::MAX` cannot be framed.
    pub fn push_bytes(&mut self, value: &[u8]) -> NigoriResult<&mut Self> {
        let len = u32::try_from(value.len())
            .map_err(|_| NigoriError::Precondition("field longer than u32::MAX bytes"))?;
        self.buf.extend_from_slice(&len.to_be_bytes());
        self.buf.extend_from_slice(value);
        Ok(self)
    }

    pub fn push_str(&mut self, value: &str) -> NigoriResult<&mut Self> {
        self.push_bytes(value.as_bytes())
    }

    /// Append `[u32 BE 4][u32 BE type]`.
    pub fn push_type(&mut self, ty: NigoriType) -> &mut Self {
        let size = std::mem::size_of::<u32>() as u32;
        self.buf.extend_from_slice(&size.to_be_bytes());
        self.buf.extend_from_slice(&ty.as_u32().to_be_bytes());
        self
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}
