//! This module defines the shared traits at the two seams of the codec:
//! bit sinks (where encoded bits go) and symbol models (what produces them).

use crate::error::AseError;
use crate::types::ModelParams;

//==================================================================================
// 1. Bit Sinks
//==================================================================================

/// The write side of a bit sink. Implemented by the growable `Buffer` and by
/// the fixed-region `PoolWriter`.
pub trait BitWrite {
    /// Appends the low `width` bits of `value`, most significant bit first.
    fn append(&mut self, value: u32, width: u32) -> Result<(), AseError>;

    /// Total number of bits committed so far.
    fn bits_written(&self) -> u64;
}

/// The read side of a bit sink.
pub trait BitRead {
    /// Consumes `width` bits and returns them right-aligned.
    fn read(&mut self, width: u32) -> Result<u32, AseError>;

    /// Total number of bits consumed so far.
    fn bits_read(&self) -> u64;
}

//==================================================================================
// 2. Symbol Model
//==================================================================================

/// A pluggable adaptive encoder/decoder for one contiguous chunk.
///
/// Implementations must be deterministic for a fixed `ModelParams` and input,
/// must decode unambiguously given only the number of emitted bits, and must
/// emit between one and `max_code_width` bits for every symbol.
pub trait SymbolModel: Sync {
    type Coder: SymbolCoder;

    /// Creates a coder in its initial state. Every chunk gets a fresh coder.
    fn coder(&self, params: &ModelParams) -> Self::Coder;

    /// Widest code this model can emit for one symbol under `params`.
    fn max_code_width(&self, params: &ModelParams) -> u32;

    /// Upper bound on the bits emitted for `chunk_len` symbols.
    fn worst_case_bits(&self, params: &ModelParams, chunk_len: usize) -> Result<u64, AseError> {
        (chunk_len as u64)
            .checked_mul(self.max_code_width(params) as u64)
            .ok_or_else(|| {
                AseError::InvalidPartition(format!(
                    "worst case for a {}-byte chunk overflows the bit counter",
                    chunk_len
                ))
            })
    }
}

/// The per-chunk adaptive state of a `SymbolModel`.
pub trait SymbolCoder {
    fn encode_symbol<W: BitWrite + ?Sized>(&mut self, symbol: u8, sink: &mut W)
        -> Result<(), AseError>;

    fn decode_symbol<R: BitRead + ?Sized>(&mut self, source: &mut R) -> Result<u8, AseError>;
}
