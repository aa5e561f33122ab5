// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `Streamable` encode/decode for primitives, strings and buffers.

use super::{
    read_atomically, write_atomically, InStream, OutStream, SharedBuffer, StreamError,
    StreamResult,
};

/// Symmetric binary encoding over [`OutStream`] / [`InStream`].
///
/// Implementations must honor the module failure contract: on `Err` the
/// stream cursor is back where it was before the call.
pub trait Streamable: Sized {
    fn write_to<W: OutStream + ?Sized>(&self, out: &mut W) -> StreamResult<()>;
    fn read_from<R: InStream + ?Sized>(input: &mut R) -> StreamResult<Self>;
}

/// Generate `Streamable` for fixed-width numeric types (native byte order).
///
/// A single `write_bytes` / `read_bytes` call is all-or-nothing, so no
/// explicit rollback is needed here.
macro_rules! impl_streamable_ne {
    ($($type:ty),* $(,)?) => {
        $(
            impl Streamable for $type {
                #[inline]
                fn write_to<W: OutStream + ?Sized>(&self, out: &mut W) -> StreamResult<()> {
                    out.write_bytes(&self.to_ne_bytes())
                }

                #[inline]
                fn read_from<R: InStream + ?Sized>(input: &mut R) -> StreamResult<Self> {
                    let mut bytes = [0u8; std::mem::size_of::<$type>()];
                    input.read_bytes(&mut bytes)?;
                    Ok(<$type>::from_ne_bytes(bytes))
                }
            }
        )*
    };
}

impl_streamable_ne!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

impl Streamable for bool {
    fn write_to<W: OutStream + ?Sized>(&self, out: &mut W) -> StreamResult<()> {
        out.write_bytes(&[u8::from(*self)])
    }

    fn read_from<R: InStream + ?Sized>(input: &mut R) -> StreamResult<Self> {
        let pos = input.read_position();
        match u8::read_from(input)? {
            0 => Ok(false),
            1 => Ok(true),
            other => {
                input.set_read_position(pos);
                Err(StreamError::InvalidData {
                    reason: format!("bool byte {:#04x} at offset {}", other, pos),
                })
            }
        }
    }
}

// ============================================================================
// Narrow strings (UTF-8, NUL terminated)
// ============================================================================

/// Write `value` followed by the terminator.
pub fn write_string<W: OutStream + ?Sized>(out: &mut W, value: &str) -> StreamResult<()> {
    write_atomically(out, |out| {
        append_string(out, value)?;
        end_string(out)
    })
}

/// Write `value` without the terminator.
///
/// Several appends may be chained before a single [`end_string`].
pub fn append_string<W: OutStream + ?Sized>(out: &mut W, value: &str) -> StreamResult<()> {
    if value.as_bytes().contains(&0) {
        return Err(StreamError::WriteFailed {
            offset: out.write_position(),
            reason: "string contains interior NUL".into(),
        });
    }
    out.write_bytes(value.as_bytes())
}

/// Terminate a string started with [`append_string`].
#[inline]
pub fn end_string<W: OutStream + ?Sized>(out: &mut W) -> StreamResult<()> {
    out.write_bytes(&[0])
}

/// Read up to and including the terminator.
pub fn read_string<R: InStream + ?Sized>(input: &mut R) -> StreamResult<String> {
    let pos = input.read_position();
    let unread = input.unread();
    let Some(end) = unread.iter().position(|&b| b == 0) else {
        return Err(StreamError::ReadFailed {
            offset: pos,
            reason: "missing string terminator".into(),
        });
    };
    let value = std::str::from_utf8(&unread[..end])
        .map_err(|e| StreamError::InvalidData {
            reason: format!("string at offset {} is not UTF-8: {}", pos, e),
        })?
        .to_owned();
    input.skip(end + 1)?;
    Ok(value)
}

impl Streamable for String {
    fn write_to<W: OutStream + ?Sized>(&self, out: &mut W) -> StreamResult<()> {
        write_string(out, self)
    }

    fn read_from<R: InStream + ?Sized>(input: &mut R) -> StreamResult<Self> {
        read_string(input)
    }
}

// ============================================================================
// Wide strings (UTF-16 code units, NUL terminated)
// ============================================================================

/// UTF-16 string as raw code units (no terminator stored).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct WideString(pub Vec<u16>);

impl WideString {
    /// Lossy conversion back to UTF-8.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf16_lossy(&self.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for WideString {
    fn from(value: &str) -> Self {
        WideString(value.encode_utf16().collect())
    }
}

impl Streamable for WideString {
    fn write_to<W: OutStream + ?Sized>(&self, out: &mut W) -> StreamResult<()> {
        if self.0.contains(&0) {
            return Err(StreamError::WriteFailed {
                offset: out.write_position(),
                reason: "wide string contains interior NUL".into(),
            });
        }
        let mut bytes = Vec::with_capacity((self.0.len() + 1) * 2);
        for unit in self.0.iter().chain(std::iter::once(&0u16)) {
            bytes.extend_from_slice(&unit.to_ne_bytes());
        }
        out.write_bytes(&bytes)
    }

    fn read_from<R: InStream + ?Sized>(input: &mut R) -> StreamResult<Self> {
        let pos = input.read_position();
        let units: Vec<u16> = input
            .unread()
            .chunks_exact(2)
            .map(|pair| u16::from_ne_bytes([pair[0], pair[1]]))
            .take_while(|&unit| unit != 0)
            .collect();
        let consumed = (units.len() + 1) * 2;
        if consumed > input.remaining() {
            return Err(StreamError::ReadFailed {
                offset: pos,
                reason: "missing wide string terminator".into(),
            });
        }
        input.skip(consumed)?;
        Ok(WideString(units))
    }
}

// ============================================================================
// Buffers and sequences (u32 length prefix)
// ============================================================================

fn length_prefix(len: usize, offset: usize) -> StreamResult<u32> {
    u32::try_from(len).map_err(|_| StreamError::WriteFailed {
        offset,
        reason: format!("length {} exceeds u32 prefix", len),
    })
}

/// Write a `u32` length followed by the raw bytes.
pub fn write_buffer<W: OutStream + ?Sized>(out: &mut W, data: &[u8]) -> StreamResult<()> {
    let len = length_prefix(data.len(), out.write_position())?;
    write_atomically(out, |out| {
        len.write_to(out)?;
        out.write_bytes(data)
    })
}

/// Decode a length-prefixed buffer from `src` into `dest`.
///
/// `dest` is resized to the decoded length and rewound. If `dest` shares its
/// storage with `src` the call is a no-op returning the current used size.
pub fn read_buffer(src: &mut SharedBuffer, dest: &mut SharedBuffer) -> StreamResult<usize> {
    if dest.shares_storage(src) {
        return Ok(dest.len());
    }
    let bytes = read_length_prefixed(src)?;
    dest.clear();
    dest.write_bytes(bytes.as_slice())?;
    dest.rewind();
    Ok(dest.len())
}

fn read_length_prefixed<R: InStream + ?Sized>(input: &mut R) -> StreamResult<Vec<u8>> {
    read_atomically(input, |input| {
        let len = u32::read_from(input)? as usize;
        let mut bytes = vec![0u8; len.min(input.remaining())];
        if bytes.len() < len {
            return Err(StreamError::ReadFailed {
                offset: input.read_position(),
                reason: format!("buffer of {} bytes truncated", len),
            });
        }
        input.read_bytes(&mut bytes)?;
        Ok(bytes)
    })
}

impl Streamable for SharedBuffer {
    fn write_to<W: OutStream + ?Sized>(&self, out: &mut W) -> StreamResult<()> {
        write_buffer(out, self.as_slice())
    }

    fn read_from<R: InStream + ?Sized>(input: &mut R) -> StreamResult<Self> {
        read_length_prefixed(input).map(SharedBuffer::from_vec)
    }
}

impl<T: Streamable> Streamable for Vec<T> {
    fn write_to<W: OutStream + ?Sized>(&self, out: &mut W) -> StreamResult<()> {
        let count = length_prefix(self.len(), out.write_position())?;
        write_atomically(out, |out| {
            count.write_to(out)?;
            self.iter().try_for_each(|item| item.write_to(out))
        })
    }

    fn read_from<R: InStream + ?Sized>(input: &mut R) -> StreamResult<Self> {
        read_atomically(input, |input| {
            let count = u32::read_from(input)? as usize;
            // Each element takes at least one byte; cap the preallocation.
            let mut items = Vec::with_capacity(count.min(input.remaining()));
            for _ in 0..count {
                items.push(T::read_from(input)?);
            }
            Ok(items)
        })
    }
}

impl<A: Streamable, B: Streamable> Streamable for (A, B) {
    fn write_to<W: OutStream + ?Sized>(&self, out: &mut W) -> StreamResult<()> {
        write_atomically(out, |out| {
            self.0.write_to(out)?;
            self.1.write_to(out)
        })
    }

    fn read_from<R: InStream + ?Sized>(input: &mut R) -> StreamResult<Self> {
        read_atomically(input, |input| Ok((A::read_from(input)?, B::read_from(input)?)))
    }
}
