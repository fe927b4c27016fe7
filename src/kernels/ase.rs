//! This module contains the adaptive stream-based entropy (ASE) coding kernel.
//!
//! The coder keeps a small move-to-front lookup table of recently seen bytes.
//! A byte found in the table is emitted as a `1` flag followed by its table
//! index in just enough bits to address the live entries; any other byte is
//! emitted as a `0` flag followed by its 8 raw bits. "Entropy culling"
//! periodically shrinks the live part of the table so that index codes stay
//! short when the stream's alphabet narrows.
//!
//! Encoder and decoder run the exact same table updates, so the decoder needs
//! nothing but the parameters and the bit stream itself.

use crate::error::AseError;
use crate::traits::{BitRead, BitWrite, SymbolCoder, SymbolModel};
use crate::types::{ModelParams, SYMBOL_BITS};

/// Number of bits needed to address `n` distinct slots (`ceil(log2(n))`).
pub(crate) fn index_bits(n: usize) -> u32 {
    if n <= 1 {
        0
    } else {
        usize::BITS - (n - 1).leading_zeros()
    }
}

//==================================================================================
// 1. Lookup Table
//==================================================================================

/// The adaptive state of one ASE coder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTable {
    entries: Vec<u8>,
    occupied: usize,
    counter: u32,
    culling_num: u32,
}

impl LookupTable {
    pub fn new(params: &ModelParams) -> Self {
        Self {
            entries: vec![0; params.entry_size as usize],
            occupied: 0,
            counter: params.global_counter,
            culling_num: params.global_counter,
        }
    }

    /// The live entries, most recently used first.
    pub fn live_entries(&self) -> &[u8] {
        &self.entries[..self.occupied]
    }

    pub fn occupied(&self) -> usize {
        self.occupied
    }

    /// Hits remaining before the next culling step.
    pub fn counter(&self) -> u32 {
        self.counter
    }

    fn find(&self, symbol: u8) -> Option<usize> {
        self.live_entries().iter().position(|&entry| entry == symbol)
    }

    /// Width of an index code under the current occupancy.
    fn index_width(&self) -> u32 {
        index_bits(self.occupied)
    }

    /// Moves the entry at `hit` to the front, then culls.
    fn promote(&mut self, hit: usize) {
        self.entries[..=hit].rotate_right(1);
        self.cull();
    }

    /// Inserts a new symbol at the front, dropping the last slot when full.
    fn register(&mut self, symbol: u8) {
        let len = self.entries.len();
        self.entries.copy_within(0..len - 1, 1);
        self.entries[0] = symbol;
        self.occupied = (self.occupied + 1).min(len);
    }

    fn cull(&mut self) {
        if self.counter > 0 {
            self.counter -= 1;
        } else {
            self.occupied = self.occupied.saturating_sub(1);
            self.counter = self.culling_num;
        }
    }
}

//==================================================================================
// 2. Coder
//==================================================================================

/// One chunk's worth of ASE coding state.
#[derive(Debug, Clone)]
pub struct AseCoder {
    table: LookupTable,
}

impl AseCoder {
    pub fn new(params: &ModelParams) -> Self {
        Self {
            table: LookupTable::new(params),
        }
    }

    pub fn table(&self) -> &LookupTable {
        &self.table
    }
}

impl SymbolCoder for AseCoder {
    fn encode_symbol<W: BitWrite + ?Sized>(
        &mut self,
        symbol: u8,
        sink: &mut W,
    ) -> Result<(), AseError> {
        match self.table.find(symbol) {
            Some(hit) => {
                // Flag and index go out as one code: `1` then `width` index bits.
                let width = self.table.index_width();
                sink.append((1 << width) | hit as u32, width + 1)?;
                self.table.promote(hit);
            }
            None => {
                // The leading bit of a 9-bit literal is the `0` flag.
                sink.append(symbol as u32, SYMBOL_BITS + 1)?;
                self.table.register(symbol);
            }
        }
        Ok(())
    }

    fn decode_symbol<R: BitRead + ?Sized>(&mut self, source: &mut R) -> Result<u8, AseError> {
        if source.read(1)? == 1 {
            let width = self.table.index_width();
            let hit = if width > 0 {
                source.read(width)? as usize
            } else {
                0
            };
            if hit >= self.table.occupied {
                return Err(AseError::DesyncError(format!(
                    "table index {} decoded with only {} live entries",
                    hit, self.table.occupied
                )));
            }
            let symbol = self.table.entries[hit];
            self.table.promote(hit);
            Ok(symbol)
        } else {
            let symbol = source.read(SYMBOL_BITS)? as u8;
            self.table.register(symbol);
            Ok(symbol)
        }
    }
}

//==================================================================================
// 3. Model
//==================================================================================

/// The default `SymbolModel`: ASE lookup-table coding.
#[derive(Debug, Clone, Copy, Default)]
pub struct AseModel;

impl SymbolModel for AseModel {
    type Coder = AseCoder;

    fn coder(&self, params: &ModelParams) -> AseCoder {
        AseCoder::new(params)
    }

    fn max_code_width(&self, params: &ModelParams) -> u32 {
        1 + SYMBOL_BITS.max(index_bits(params.entry_size as usize))
    }
}
