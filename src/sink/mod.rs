//! Bit sinks: where encoded bits are accumulated and read back.
//!
//! Two back-ends implement the same `BitWrite`/`BitRead` interface:
//! - `Buffer`: a growable chain of one-byte nodes for sequential execution.
//!   Capacity is unbounded, so appends never fail for lack of space.
//! - `BitPool`: one preallocated flat byte region shared by every unit of a
//!   parallel batch, carved into disjoint fixed-size per-unit regions.
//!
//! Both store bits MSB-first within each byte node.

pub mod buffer;
pub mod pool;

pub use buffer::Buffer;
pub use pool::{compressed_bytes, packed_layout, BitPool, PoolInfo, PoolReader, PoolWriter};

use bitvec::prelude::*;

use crate::error::AseError;
use crate::traits::BitRead;

/// Number of bits held by a single node.
pub const NODE_BITS: u32 = 8;
/// Widest single append/read any sink supports.
pub const MAX_SINK_WIDTH: u32 = u32::BITS;

/// Stores the low `width` bits of `value` into `node` starting at bit `offset`.
/// `offset + width` must not exceed `NODE_BITS`.
pub(crate) fn put_bits(node: &mut u8, offset: u32, value: u32, width: u32) {
    let bits = node.view_bits_mut::<Msb0>();
    bits[offset as usize..(offset + width) as usize].store_be::<u8>(value as u8);
}

/// Loads `width` bits from `node` starting at bit `offset`.
pub(crate) fn get_bits(node: u8, offset: u32, width: u32) -> u32 {
    let bits = node.view_bits::<Msb0>();
    bits[offset as usize..(offset + width) as usize].load_be::<u8>() as u32
}

/// The low `width` bits of `value` shifted down from bit `shift`.
pub(crate) fn take_bits(value: u32, shift: u32, width: u32) -> u32 {
    (value >> shift) & ((1u32 << width) - 1)
}

pub(crate) fn check_width(width: u32, max_width: u32) -> Result<(), AseError> {
    if width > max_width || width > MAX_SINK_WIDTH {
        return Err(AseError::InvalidWidth { width, max_width });
    }
    Ok(())
}

//==================================================================================
// Bounded Reads
//==================================================================================

/// Caps a reader at a declared bit length.
///
/// Decompression reads through this wrapper so that a declared `counts`
/// shorter than the real stream surfaces as `BufferUnderrun` instead of
/// silently reading into bits the caller never declared.
pub struct Bounded<'a, R: BitRead + ?Sized> {
    inner: &'a mut R,
    start: u64,
    limit: u64,
}

impl<'a, R: BitRead + ?Sized> Bounded<'a, R> {
    pub fn new(inner: &'a mut R, limit: u64) -> Self {
        let start = inner.bits_read();
        Self {
            inner,
            start,
            limit,
        }
    }
}

impl<R: BitRead + ?Sized> BitRead for Bounded<'_, R> {
    fn read(&mut self, width: u32) -> Result<u32, AseError> {
        let consumed = self.bits_read();
        if consumed + width as u64 > self.limit {
            return Err(AseError::BufferUnderrun {
                requested: width as u64,
                available: self.limit - consumed,
            });
        }
        self.inner.read(width)
    }

    fn bits_read(&self) -> u64 {
        self.inner.bits_read() - self.start
    }
}
