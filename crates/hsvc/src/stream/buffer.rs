// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reference-counted, copy-on-write byte buffer with read and write cursors.

use super::{InStream, OutStream, StreamResult, Streamable};
use std::fmt;
use std::sync::Arc;

/// Owned byte buffer shared by reference count.
///
/// Cloning shares the storage; the first mutation of a shared buffer copies it
/// (`Arc::make_mut`), so a clone handed to another event never observes later
/// writes. Each handle keeps its own read and write cursors.
///
/// The *used size* is the length of the stored data. Writes past the end grow
/// it; writes inside it overwrite.
#[derive(Clone, Default)]
pub struct SharedBuffer {
    data: Arc<Vec<u8>>,
    read_pos: usize,
    write_pos: usize,
}

impl SharedBuffer {
    /// Empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty buffer with preallocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Arc::new(Vec::with_capacity(capacity)),
            read_pos: 0,
            write_pos: 0,
        }
    }

    /// Wrap existing bytes. Read cursor at start, write cursor at end.
    pub fn from_vec(data: Vec<u8>) -> Self {
        let write_pos = data.len();
        Self {
            data: Arc::new(data),
            read_pos: 0,
            write_pos,
        }
    }

    /// Copy bytes into a new buffer.
    pub fn from_slice(data: &[u8]) -> Self {
        Self::from_vec(data.to_vec())
    }

    /// Used size in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Used bytes.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// True if another handle shares this storage.
    #[inline]
    pub fn is_shared(&self) -> bool {
        Arc::strong_count(&self.data) > 1
    }

    /// True if both handles point at the same storage.
    #[inline]
    pub fn shares_storage(&self, other: &SharedBuffer) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Resize the used data, zero-filling growth. Copies first if shared.
    pub fn resize(&mut self, len: usize) {
        Arc::make_mut(&mut self.data).resize(len, 0);
        self.read_pos = self.read_pos.min(len);
        self.write_pos = self.write_pos.min(len);
    }

    /// Drop all data and reset both cursors. Detaches from shared storage.
    pub fn clear(&mut self) {
        if self.is_shared() {
            self.data = Arc::new(Vec::new());
        } else {
            Arc::make_mut(&mut self.data).clear();
        }
        self.read_pos = 0;
        self.write_pos = 0;
    }

    /// Move the read cursor back to the beginning.
    #[inline]
    pub fn rewind(&mut self) {
        self.read_pos = 0;
    }

    /// Move the write cursor to the end of the used data.
    #[inline]
    pub fn seek_write_end(&mut self) {
        self.write_pos = self.data.len();
    }

    /// Borrowed read view over the used data.
    pub fn view(&self) -> super::BufferView<'_> {
        super::BufferView::new(&self.data)
    }

    /// Extract the bytes, copying only if the storage is shared.
    pub fn into_vec(self) -> Vec<u8> {
        Arc::try_unwrap(self.data).unwrap_or_else(|shared| (*shared).clone())
    }

    /// Encode `value` at the write cursor.
    #[inline]
    pub fn write<T: Streamable>(&mut self, value: &T) -> StreamResult<()> {
        value.write_to(self)
    }

    /// Decode a `T` at the read cursor.
    #[inline]
    pub fn read<T: Streamable>(&mut self) -> StreamResult<T> {
        T::read_from(self)
    }
}

impl OutStream for SharedBuffer {
    fn write_bytes(&mut self, data: &[u8]) -> StreamResult<()> {
        let end = self.write_pos + data.len();
        let storage = Arc::make_mut(&mut self.data);
        if end > storage.len() {
            storage.resize(end, 0);
        }
        storage[self.write_pos..end].copy_from_slice(data);
        self.write_pos = end;
        Ok(())
    }

    #[inline]
    fn write_position(&self) -> usize {
        self.write_pos
    }

    fn set_write_position(&mut self, pos: usize) {
        self.write_pos = pos.min(self.data.len());
    }

    #[inline]
    fn used_len(&self) -> usize {
        self.data.len()
    }

    fn truncate_to(&mut self, len: usize) {
        if len < self.data.len() {
            Arc::make_mut(&mut self.data).truncate(len);
            self.read_pos = self.read_pos.min(len);
            self.write_pos = self.write_pos.min(len);
        }
    }
}

impl InStream for SharedBuffer {
    #[inline]
    fn unread(&self) -> &[u8] {
        self.data.get(self.read_pos..).unwrap_or(&[])
    }

    #[inline]
    fn read_position(&self) -> usize {
        self.read_pos
    }

    fn set_read_position(&mut self, pos: usize) {
        self.read_pos = pos.min(self.data.len());
    }
}

impl PartialEq for SharedBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for SharedBuffer {}

impl fmt::Debug for SharedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedBuffer")
            .field("len", &self.data.len())
            .field("read_pos", &self.read_pos)
            .field("write_pos", &self.write_pos)
            .field("shared", &self.is_shared())
            .finish()
    }
}

impl From<Vec<u8>> for SharedBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self::from_vec(data)
    }
}

impl From<&[u8]> for SharedBuffer {
    fn from(data: &[u8]) -> Self {
        Self::from_slice(data)
    }
}
