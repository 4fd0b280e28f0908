//! Transcript module for canonical associated data.
//!
//! Appends tagged data in a fixed format so the same logical header yields
//! the same bytes on both ends of the channel.

use bytes::{BufMut, BytesMut};

/// Standard tag constants for transcript fields.
pub mod tags {
    pub const DOMAIN: u32 = 0;
    pub const VERSION: u32 = 1;
    pub const KEY_WRAP: u32 = 2;
    pub const CIPHER: u32 = 3;
    pub const ENCRYPTED_KEY: u32 = 4;
}

/// A minimal deterministic transcript builder.
/// We append (tag, len, bytes) tuples so the same logical data encodes the same everywhere.
#[derive(Clone, Debug, Default)]
pub struct Transcript {
    buf: BytesMut,
}

impl Transcript {
    /// Create a new transcript with the given domain separator.
    pub fn new(domain: &'static str) -> Self {
        let mut t = Self { buf: BytesMut::with_capacity(128) };
        t.append_bytes(tags::DOMAIN, domain.as_bytes());
        t
    }

    /// Append raw bytes with a tag.
    pub fn append_bytes(&mut self, tag: u32, data: &[u8]) -> &mut Self {
        // tag (u32 be) + len (u32 be) + data
        self.buf.put_u32(tag);
        self.buf.put_u32(data.len() as u32);
        self.buf.extend_from_slice(data);
        self
    }

    /// Append a u32 value with a tag.
    pub fn append_u32(&mut self, tag: u32, v: u32) -> &mut Self {
        self.buf.put_u32(tag);
        self.buf.put_u32(4);
        self.buf.put_u32(v);
        self
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}
