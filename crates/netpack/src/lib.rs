//! # Netpack
//!
//! The byte codec underneath every generated rpc sender and receiver.
//!
//! ## Philosophy
//!
//! - **Untagged**: Both peers were generated from the same declarations, so the
//!   payload carries no type information. Values are written back to back.
//! - **Owned Writers**: Each send builds its own `Writer`. Nothing is shared
//!   between calls, so concurrent senders never observe each other's bytes.
//! - **Bounded Readers**: A `Reader` is a zero-copy, bounds-checked cursor over a
//!   received message.
//!
//! ## Format
//!
//! - **Message**: `[Hash: 2b][Arg 0][Arg 1]...`
//! - **Fixed-width scalars**: `[Data: N]`
//! - **Strings**: `[Len: varint 7-bit][UTF-8: Len]`
//!
//! All integers are Little-Endian.

pub mod hash;
pub mod primitives;

#[cfg(test)]
mod tests;

/// Source of the `primitives` module, scanned by `netrpc-build` to register
/// the built-in serializers.
#[doc(hidden)]
pub const PRIMITIVES_SOURCE: &str = include_str!("primitives.rs");

/// Netpack decoding errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Buffer exhausted while reading.
    UnexpectedEnd { needed: usize, remaining: usize },
    /// A bool byte other than 0 or 1.
    InvalidBool(u8),
    /// String or char data is not valid UTF-8.
    InvalidUtf8,
    /// A varint length ran past five bytes or overflowed `u32`.
    LengthOverflow,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::UnexpectedEnd { needed, remaining } => {
                write!(f, "Unexpected end of message: needed {} bytes, {} remaining", needed, remaining)
            }
            Error::InvalidBool(b) => write!(f, "Invalid bool byte: {:#04x}", b),
            _ => write!(f, "{:?}", self),
        }
    }
}

impl std::error::Error for Error {}

/// Specialized `Result` for Netpack operations.
pub type Result<T> = std::result::Result<T, Error>;

/// An append-only byte buffer owned by a single send.
#[derive(Debug, Default, Clone)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    /// Creates a new writer with a capacity suited to small rpc messages.
    pub fn new() -> Self {
        Self { buf: Vec::with_capacity(64) }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { buf: Vec::with_capacity(capacity) }
    }

    /// Clears the buffer, keeping its allocation.
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Returns a view of the bytes written so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the writer and returns the final byte vector.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Appends a single byte.
    pub fn write_byte(&mut self, b: u8) {
        self.buf.push(b);
    }

    /// Appends raw bytes with no length header.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Appends `v` as a 7-bit varint, low groups first.
    ///
    /// Each byte carries seven bits of payload; the high bit marks a continuation.
    pub fn write_var_u32(&mut self, v: u32) {
        self.write_var_u64(u64::from(v));
    }

    /// Same encoding as `write_var_u32`, for values that may not fit in 32
    /// bits. Readers only accept lengths up to `u32::MAX`.
    pub fn write_var_u64(&mut self, mut v: u64) {
        while v >= 0x80 {
            self.buf.push((v as u8) | 0x80);
            v >>= 7;
        }
        self.buf.push(v as u8);
    }
}

/// A bounds-checked cursor over a received message.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Returns the number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Returns the offset of the next unread byte.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Reads a single byte.
    pub fn read_byte(&mut self) -> Result<u8> {
        let bytes = self.read_bytes(1)?;
        Ok(bytes[0])
    }

    /// Reads exactly `n` bytes without copying.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let remaining = self.remaining();
        if n > remaining {
            return Err(Error::UnexpectedEnd { needed: n, remaining });
        }
        let start = self.pos;
        self.pos += n;
        Ok(&self.buf[start..self.pos])
    }

    /// Reads exactly `N` bytes into an array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Reads a 7-bit varint written by `Writer::write_var_u32`.
    ///
    /// # Errors
    /// Returns `Error::LengthOverflow` if the encoding is longer than five bytes
    /// or the decoded value does not fit in a `u32`.
    pub fn read_var_u32(&mut self) -> Result<u32> {
        let mut value: u32 = 0;
        for i in 0..5 {
            let b = self.read_byte()?;
            let group = (b & 0x7f) as u32;
            if i == 4 && group > 0x0f {
                return Err(Error::LengthOverflow);
            }
            value |= group << (7 * i);
            if b & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(Error::LengthOverflow)
    }
}
