//! The parallel bit sink.
//!
//! A `BitPool` is one flat, preallocated byte array shared by all execution
//! units of a batch. Each unit owns a disjoint region `[base, base + capacity)`
//! sized before launch from the unit's `output_size`. Regions never move or
//! grow while units are running, so units write without any coordination.
//! A `PoolInfo` per unit records the bit accounting for its region.

use serde::{Deserialize, Serialize};

use crate::error::AseError;
use crate::sink::{check_width, get_bits, put_bits, take_bits, NODE_BITS};
use crate::traits::{BitRead, BitWrite};
use crate::utils::{bits_to_bytes, split_regions_mut};

//==================================================================================
// 1. Per-Unit Accounting
//==================================================================================

/// Bit-accounting record for one execution unit's pool region.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolInfo {
    /// Execution unit that owns the region.
    pub unit: usize,
    /// Byte offset of the region inside the pool.
    pub base: usize,
    /// Region size in bytes.
    pub capacity: usize,
    /// Bits consumed from the head node (read side).
    pub h_offset: u32,
    /// Bits committed to the tail node (write side).
    pub t_offset: u32,
    /// Widest single append/read allowed.
    pub max_width: u32,
    /// Tail node index within the region (write side).
    pub index: usize,
    /// Head node index within the region (read side).
    pub head: usize,
    /// Bits written by the unit.
    pub counts: u64,
}

impl PoolInfo {
    pub fn new(unit: usize, base: usize, capacity: usize, max_width: u32) -> Self {
        Self {
            unit,
            base,
            capacity,
            h_offset: 0,
            t_offset: 0,
            max_width,
            index: 0,
            head: 0,
            counts: 0,
        }
    }

    pub fn capacity_bits(&self) -> u64 {
        self.capacity as u64 * NODE_BITS as u64
    }

    /// Bits consumed by the last read pass over this region.
    pub fn bits_consumed(&self) -> u64 {
        self.head as u64 * NODE_BITS as u64 + self.h_offset as u64
    }

    /// Bytes actually occupied by the unit's output.
    pub fn used_bytes(&self) -> usize {
        bits_to_bytes(self.counts)
    }
}

/// Rebuilds the records of a packed pool from the per-unit bit counts alone.
///
/// Regions follow each other with `ceil(counts / 8)` bytes each, exactly as
/// `BitPool::pack` lays them out.
pub fn packed_layout(counts: &[u64], max_widths: &[u32]) -> Vec<PoolInfo> {
    let mut base = 0;
    counts
        .iter()
        .zip(max_widths)
        .enumerate()
        .map(|(unit, (&count, &max_width))| {
            let capacity = bits_to_bytes(count);
            let mut info = PoolInfo::new(unit, base, capacity, max_width);
            info.counts = count;
            base += capacity;
            info
        })
        .collect()
}

/// Aggregate compressed size of a batch: `sum(ceil(counts / 8))`.
pub fn compressed_bytes(infos: &[PoolInfo]) -> usize {
    infos.iter().map(PoolInfo::used_bytes).sum()
}

//==================================================================================
// 2. The Pool
//==================================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitPool {
    bytes: Vec<u8>,
}

impl BitPool {
    /// Reserves one region per capacity, laid out back to back.
    pub fn allocate(capacities: &[usize], max_width: u32) -> (Self, Vec<PoolInfo>) {
        let mut infos = Vec::with_capacity(capacities.len());
        let mut base = 0;
        for (unit, &capacity) in capacities.iter().enumerate() {
            infos.push(PoolInfo::new(unit, base, capacity, max_width));
            base += capacity;
        }
        (Self { bytes: vec![0; base] }, infos)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Hands out one writer per region. `infos` must come from `allocate` on
    /// this pool; the writers borrow disjoint slices and may run concurrently.
    pub fn writers<'a>(&'a mut self, infos: &'a mut [PoolInfo]) -> Vec<PoolWriter<'a>> {
        let regions = split_regions_mut(&mut self.bytes, infos.iter().map(|info| info.capacity));
        regions
            .into_iter()
            .zip(infos.iter_mut())
            .map(|(region, info)| PoolWriter { region, info })
            .collect()
    }

    /// Compacts the used part of every region into a contiguous pool.
    ///
    /// Regions are re-laid out by a prefix sum over `ceil(counts / 8)`; the
    /// returned `PoolInfo`s carry the new bases and capacities.
    pub fn pack(&self, infos: &[PoolInfo]) -> (BitPool, Vec<PoolInfo>) {
        let mut packed = Vec::with_capacity(compressed_bytes(infos));
        let mut packed_infos = Vec::with_capacity(infos.len());
        for info in infos {
            let used = info.used_bytes();
            let mut rebased = *info;
            rebased.base = packed.len();
            rebased.capacity = used;
            packed.extend_from_slice(&self.bytes[info.base..info.base + used]);
            packed_infos.push(rebased);
        }
        (BitPool { bytes: packed }, packed_infos)
    }

    /// Opens `info`'s region of `bytes` for reading `info.counts` bits.
    pub fn reader<'a>(bytes: &'a [u8], info: &PoolInfo) -> Result<PoolReader<'a>, AseError> {
        let end = info.base + info.used_bytes();
        if end > bytes.len() {
            return Err(AseError::BufferUnderrun {
                requested: info.counts,
                available: (bytes.len().saturating_sub(info.base) * NODE_BITS as usize) as u64,
            });
        }
        let mut info = *info;
        info.head = 0;
        info.h_offset = 0;
        Ok(PoolReader {
            region: &bytes[info.base..end],
            info,
        })
    }
}

//==================================================================================
// 3. Region Views
//==================================================================================

/// Write access to one unit's region.
#[derive(Debug)]
pub struct PoolWriter<'a> {
    region: &'a mut [u8],
    info: &'a mut PoolInfo,
}

impl PoolWriter<'_> {
    pub fn info(&self) -> &PoolInfo {
        self.info
    }
}

impl BitWrite for PoolWriter<'_> {
    fn append(&mut self, value: u32, width: u32) -> Result<(), AseError> {
        check_width(width, self.info.max_width)?;
        let requested_bits = self.info.counts + width as u64;
        if requested_bits > self.info.capacity_bits() {
            return Err(AseError::PoolOverflow {
                unit: self.info.unit,
                requested_bits,
                capacity_bits: self.info.capacity_bits(),
            });
        }

        let mut remaining = width;
        while remaining > 0 {
            if self.info.t_offset == NODE_BITS {
                self.info.index += 1;
                self.info.t_offset = 0;
            }
            let take = remaining.min(NODE_BITS - self.info.t_offset);
            let chunk = take_bits(value, remaining - take, take);
            put_bits(
                &mut self.region[self.info.index],
                self.info.t_offset,
                chunk,
                take,
            );
            self.info.t_offset += take;
            remaining -= take;
        }
        self.info.counts = requested_bits;
        Ok(())
    }

    fn bits_written(&self) -> u64 {
        self.info.counts
    }
}

/// Read access to one unit's region, bounded by the unit's `counts`.
#[derive(Debug)]
pub struct PoolReader<'a> {
    region: &'a [u8],
    info: PoolInfo,
}

impl PoolReader<'_> {
    /// The accounting record after reading; `bits_consumed()` reports progress.
    pub fn into_info(self) -> PoolInfo {
        self.info
    }
}

impl BitRead for PoolReader<'_> {
    fn read(&mut self, width: u32) -> Result<u32, AseError> {
        check_width(width, self.info.max_width)?;
        let available = self.info.counts - self.bits_read();
        if width as u64 > available {
            return Err(AseError::BufferUnderrun {
                requested: width as u64,
                available,
            });
        }

        let mut value = 0u32;
        let mut remaining = width;
        while remaining > 0 {
            if self.info.h_offset == NODE_BITS {
                self.info.head += 1;
                self.info.h_offset = 0;
            }
            let take = remaining.min(NODE_BITS - self.info.h_offset);
            let chunk = get_bits(self.region[self.info.head], self.info.h_offset, take);
            value = (value << take) | chunk;
            self.info.h_offset += take;
            remaining -= take;
        }
        Ok(value)
    }

    fn bits_read(&self) -> u64 {
        self.info.bits_consumed()
    }
}
