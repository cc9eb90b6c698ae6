// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Cursor for ROS1 serialized message data.
//!
//! ROS1 serialization is little-endian with no alignment padding. Strings
//! and dynamic arrays carry a `u32` length prefix; fixed arrays do not.
//!
//! # Example
//!
//! ```
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use bagframes::encoding::ros1::Ros1Cursor;
//!
//! let data = [2, 0, 0, 0, b'h', b'i', 42];
//! let mut cursor = Ros1Cursor::new(&data);
//! assert_eq!(cursor.read_string()?, "hi");
//! assert_eq!(cursor.read_u8()?, 42);
//! # Ok(())
//! # }
//! ```

use crate::core::{ExtractError, Result};

/// Read cursor over one ROS1 serialized message.
pub struct Ros1Cursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Ros1Cursor<'a> {
    /// Create a cursor at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Current read position.
    #[inline]
    pub fn position(&self) -> usize {
        self.offset
    }

    /// Bytes left to read.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.offset)
    }

    /// Check if at end of buffer.
    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.offset >= self.data.len()
    }

    fn too_short(&self, needed: usize) -> ExtractError {
        ExtractError::decode(
            "ros1",
            format!(
                "buffer too short: need {needed} bytes at offset {}, {} left",
                self.offset,
                self.remaining()
            ),
        )
    }

    /// Read a byte slice.
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        if count > self.remaining() {
            return Err(self.too_short(count));
        }
        let start = self.offset;
        self.offset += count;
        Ok(&self.data[start..self.offset])
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Read a u32 value.
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    /// Read a length-prefixed UTF-8 string.
    ///
    /// Invalid UTF-8 is replaced rather than rejected.
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_u32()? as usize;
        let bytes = self.read_bytes(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Read a length-prefixed `uint8[]`.
    pub fn read_byte_array(&mut self) -> Result<&'a [u8]> {
        let len = self.read_u32()? as usize;
        self.read_bytes(len)
    }

    /// Read a ROS `time` as `(sec, nsec)`.
    pub fn read_time(&mut self) -> Result<(u32, u32)> {
        let sec = self.read_u32()?;
        let nsec = self.read_u32()?;
        Ok((sec, nsec))
    }
}
