// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Borrowed, fixed-size stream views (no ownership, never resize).

use super::{InStream, OutStream, StreamError, StreamResult};

/// Read-only view over borrowed bytes.
pub struct BufferView<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> BufferView<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    /// Whole underlying slice.
    pub fn as_slice(&self) -> &'a [u8] {
        self.buffer
    }

    pub fn is_eof(&self) -> bool {
        self.offset >= self.buffer.len()
    }
}

impl InStream for BufferView<'_> {
    #[inline]
    fn unread(&self) -> &[u8] {
        self.buffer.get(self.offset..).unwrap_or(&[])
    }

    #[inline]
    fn read_position(&self) -> usize {
        self.offset
    }

    fn set_read_position(&mut self, pos: usize) {
        self.offset = pos.min(self.buffer.len());
    }
}

/// Writable view over a borrowed, fixed-size slice.
///
/// A write that does not fit fails and leaves the cursor untouched.
pub struct BufferViewMut<'a> {
    buffer: &'a mut [u8],
    offset: usize,
}

impl<'a> BufferViewMut<'a> {
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    /// Bytes written so far.
    pub fn written(&self) -> &[u8] {
        &self.buffer[..self.offset]
    }

    /// Free space after the cursor.
    pub fn capacity_left(&self) -> usize {
        self.buffer.len().saturating_sub(self.offset)
    }
}

impl OutStream for BufferViewMut<'_> {
    fn write_bytes(&mut self, data: &[u8]) -> StreamResult<()> {
        if data.len() > self.capacity_left() {
            return Err(StreamError::WriteFailed {
                offset: self.offset,
                reason: "buffer too small".into(),
            });
        }
        self.buffer[self.offset..self.offset + data.len()].copy_from_slice(data);
        self.offset += data.len();
        Ok(())
    }

    #[inline]
    fn write_position(&self) -> usize {
        self.offset
    }

    fn set_write_position(&mut self, pos: usize) {
        self.offset = pos.min(self.buffer.len());
    }
}
