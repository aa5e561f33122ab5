// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Binary stream codec.
//!
//! Every argument, address and remote event is serialized through this module.
//!
//! # Wire format
//!
//! - Primitives: fixed-width, **native** byte order (no varints, no padding).
//!   Cross-architecture links need a normalization layer in the transport.
//! - `bool`: one byte, `0` or `1`.
//! - Narrow strings: UTF-8 bytes followed by a `0` terminator.
//! - Wide strings: UTF-16 code units followed by a `0u16` terminator.
//! - Buffers: `u32` byte count, then the raw bytes.
//!
//! # Failure contract
//!
//! A write or read either transfers the full value or fails with a
//! [`StreamError`] and leaves the cursor exactly where it was before the call.
//! On a failed read the caller must not use any partially decoded state.
//!
//! # Buffer types
//!
//! - [`SharedBuffer`]: owned, reference counted, copy-on-write, growable.
//! - [`BufferView`] / [`BufferViewMut`]: borrowed, fixed size, never resize.

mod buffer;
mod codec;
mod view;

pub use buffer::SharedBuffer;
pub use codec::{
    append_string, end_string, read_buffer, read_string, write_buffer, write_string, Streamable,
    WideString,
};
pub use view::{BufferView, BufferViewMut};

use std::fmt;

/// Codec error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    WriteFailed { offset: usize, reason: String },
    ReadFailed { offset: usize, reason: String },
    InvalidData { reason: String },
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::WriteFailed { offset, reason } => {
                write!(f, "write failed at offset {}: {}", offset, reason)
            }
            StreamError::ReadFailed { offset, reason } => {
                write!(f, "read failed at offset {}: {}", offset, reason)
            }
            StreamError::InvalidData { reason } => write!(f, "invalid data: {}", reason),
        }
    }
}

impl std::error::Error for StreamError {}

pub type StreamResult<T> = core::result::Result<T, StreamError>;

/// Writable byte stream with an explicit write cursor.
pub trait OutStream {
    /// Write all of `data` at the cursor, or nothing.
    fn write_bytes(&mut self, data: &[u8]) -> StreamResult<()>;

    /// Current write cursor.
    fn write_position(&self) -> usize;

    /// Move the write cursor (used to roll back composite writes).
    fn set_write_position(&mut self, pos: usize);

    /// Size of the used data. Fixed-size streams report the cursor.
    fn used_len(&self) -> usize {
        self.write_position()
    }

    /// Drop used data past `len`. Fixed-size streams never shrink.
    fn truncate_to(&mut self, _len: usize) {}
}

/// Readable byte stream with an explicit read cursor.
pub trait InStream {
    /// Bytes between the read cursor and the end of the used data.
    fn unread(&self) -> &[u8];

    /// Current read cursor.
    fn read_position(&self) -> usize;

    /// Move the read cursor (used to roll back composite reads).
    fn set_read_position(&mut self, pos: usize);

    /// Number of bytes left to read.
    fn remaining(&self) -> usize {
        self.unread().len()
    }

    /// Advance the cursor by `len` bytes without copying.
    fn skip(&mut self, len: usize) -> StreamResult<()> {
        if len > self.remaining() {
            return Err(StreamError::ReadFailed {
                offset: self.read_position(),
                reason: "unexpected end of stream".into(),
            });
        }
        let pos = self.read_position();
        self.set_read_position(pos + len);
        Ok(())
    }

    /// Fill `out` from the cursor, or read nothing.
    fn read_bytes(&mut self, out: &mut [u8]) -> StreamResult<()> {
        let unread = self.unread();
        if out.len() > unread.len() {
            return Err(StreamError::ReadFailed {
                offset: self.read_position(),
                reason: "unexpected end of stream".into(),
            });
        }
        out.copy_from_slice(&unread[..out.len()]);
        self.skip(out.len())
    }
}

/// Run a composite write; restore the write cursor and the used size if any
/// step fails.
pub(crate) fn write_atomically<W, T, F>(out: &mut W, f: F) -> StreamResult<T>
where
    W: OutStream + ?Sized,
    F: FnOnce(&mut W) -> StreamResult<T>,
{
    let pos = out.write_position();
    let len = out.used_len();
    let result = f(out);
    if result.is_err() {
        out.truncate_to(len);
        out.set_write_position(pos);
    }
    result
}

/// Run a composite read; restore the read cursor if any step fails.
pub(crate) fn read_atomically<R, T, F>(input: &mut R, f: F) -> StreamResult<T>
where
    R: InStream + ?Sized,
    F: FnOnce(&mut R) -> StreamResult<T>,
{
    let pos = input.read_position();
    let result = f(input);
    if result.is_err() {
        input.set_read_position(pos);
    }
    result
}
