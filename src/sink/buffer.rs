//! The sequential bit sink.
//!
//! A `Buffer` is an owned chain of one-byte nodes kept in a single arena
//! (`Vec<u8>`), so nodes are released together with the buffer. Writes
//! commit at the tail node (`current`, `t_offset`); reads consume from the
//! head node (`head`, `h_offset`). A new node is appended whenever the tail
//! is full, so the buffer grows one node at a time and never shrinks.

use crate::error::AseError;
use crate::sink::{check_width, get_bits, put_bits, take_bits, NODE_BITS};
use crate::traits::{BitRead, BitWrite};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buffer {
    nodes: Vec<u8>,
    /// Node currently being read.
    head: usize,
    /// Node currently being written.
    current: usize,
    /// Bits consumed from the head node.
    h_offset: u32,
    /// Bits committed to the tail node.
    t_offset: u32,
    max_width: u32,
}

impl Buffer {
    /// Creates an empty buffer accepting writes of at most `max_width` bits.
    pub fn new(max_width: u32) -> Self {
        Self {
            nodes: vec![0],
            head: 0,
            current: 0,
            h_offset: 0,
            t_offset: 0,
            max_width,
        }
    }

    /// Rebuilds a buffer from transmitted bytes holding `bit_len` valid bits.
    pub fn from_bytes(bytes: &[u8], bit_len: u64, max_width: u32) -> Result<Self, AseError> {
        let available = bytes.len() as u64 * NODE_BITS as u64;
        if bit_len > available {
            return Err(AseError::BufferUnderrun {
                requested: bit_len,
                available,
            });
        }
        if bit_len == 0 {
            return Ok(Self::new(max_width));
        }

        let current = ((bit_len - 1) / NODE_BITS as u64) as usize;
        let t_offset = (bit_len - current as u64 * NODE_BITS as u64) as u32;
        Ok(Self {
            nodes: bytes[..=current].to_vec(),
            head: 0,
            current,
            h_offset: 0,
            t_offset,
            max_width,
        })
    }

    pub fn max_width(&self) -> u32 {
        self.max_width
    }

    /// The committed nodes. Bits past `bits_written()` in the last node are zero.
    pub fn as_bytes(&self) -> &[u8] {
        let used = if self.bits_written() == 0 {
            0
        } else {
            self.current + 1
        };
        &self.nodes[..used]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Moves the read cursor back to the first bit.
    pub fn rewind(&mut self) {
        self.head = 0;
        self.h_offset = 0;
    }
}

impl BitWrite for Buffer {
    fn append(&mut self, value: u32, width: u32) -> Result<(), AseError> {
        check_width(width, self.max_width)?;

        let mut remaining = width;
        while remaining > 0 {
            if self.t_offset == NODE_BITS {
                self.nodes.push(0);
                self.current += 1;
                self.t_offset = 0;
            }
            let take = remaining.min(NODE_BITS - self.t_offset);
            let chunk = take_bits(value, remaining - take, take);
            put_bits(&mut self.nodes[self.current], self.t_offset, chunk, take);
            self.t_offset += take;
            remaining -= take;
        }
        Ok(())
    }

    fn bits_written(&self) -> u64 {
        self.current as u64 * NODE_BITS as u64 + self.t_offset as u64
    }
}

impl BitRead for Buffer {
    fn read(&mut self, width: u32) -> Result<u32, AseError> {
        check_width(width, self.max_width)?;
        let available = self.bits_written() - self.bits_read();
        if width as u64 > available {
            return Err(AseError::BufferUnderrun {
                requested: width as u64,
                available,
            });
        }

        let mut value = 0u32;
        let mut remaining = width;
        while remaining > 0 {
            if self.h_offset == NODE_BITS {
                self.head += 1;
                self.h_offset = 0;
            }
            let take = remaining.min(NODE_BITS - self.h_offset);
            let chunk = get_bits(self.nodes[self.head], self.h_offset, take);
            value = (value << take) | chunk;
            self.h_offset += take;
            remaining -= take;
        }
        Ok(value)
    }

    fn bits_read(&self) -> u64 {
        self.head as u64 * NODE_BITS as u64 + self.h_offset as u64
    }
}
