//! Compress/decompress engines.
//!
//! `sequential` runs one symbol-model instance over a whole batch into a
//! growable `Buffer`. `parallel` runs one instance per execution unit into a
//! preallocated `BitPool`. Both drive the model through the per-chunk
//! helpers below, so a chunk is coded identically in either mode.

pub mod parallel;
pub mod sequential;

pub use parallel::{ParallelRunner, ParallelDecompressed};

use crate::error::AseError;
use crate::sink::Bounded;
use crate::traits::{BitRead, BitWrite, SymbolCoder, SymbolModel};
use crate::types::ModelParams;

/// Encodes `chunk` with a fresh coder, returning the bits it appended to `sink`.
pub(crate) fn encode_chunk<M, W>(
    model: &M,
    params: &ModelParams,
    chunk: &[u8],
    sink: &mut W,
) -> Result<u64, AseError>
where
    M: SymbolModel,
    W: BitWrite + ?Sized,
{
    let start = sink.bits_written();
    let mut coder = model.coder(params);
    for &symbol in chunk {
        coder.encode_symbol(symbol, sink)?;
    }
    Ok(sink.bits_written() - start)
}

/// Decodes exactly `output.len()` symbols from at most `counts` bits of
/// `source`, returning the number of bits consumed.
///
/// The loop is bounded by the output length, so a wrong `counts` can never
/// hang: too few bits surface as `BufferUnderrun`, too many as `DesyncError`.
pub(crate) fn decode_chunk<M, R>(
    model: &M,
    params: &ModelParams,
    source: &mut R,
    output: &mut [u8],
    counts: u64,
) -> Result<u64, AseError>
where
    M: SymbolModel,
    R: BitRead + ?Sized,
{
    let mut coder = model.coder(params);
    let mut bounded = Bounded::new(source, counts);
    for slot in output.iter_mut() {
        *slot = coder.decode_symbol(&mut bounded)?;
    }

    let consumed = bounded.bits_read();
    if consumed != counts {
        return Err(AseError::DesyncError(format!(
            "decoded {} bytes from {} bits, but {} bits were declared",
            output.len(),
            consumed,
            counts
        )));
    }
    Ok(consumed)
}
