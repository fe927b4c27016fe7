// In: src/chunk_pipeline/orchestrator/sequential.rs

//! The sequential engine: one worker, one symbol-model instance, one `Buffer`.
//!
//! The codec is not self-terminating. The bit count returned by `compress` is
//! the only thing a later `decompress` needs to know where the stream ends,
//! and it must be carried out-of-band by the caller.

use crate::chunk_pipeline::descriptor::{CompDescriptor, DecompDescriptor};
use crate::chunk_pipeline::orchestrator::{decode_chunk, encode_chunk};
use crate::error::AseError;
use crate::sink::Buffer;
use crate::traits::SymbolModel;

/// Compresses the first `desc.total_size()` bytes of `input` into a fresh buffer.
///
/// Returns the exact number of bits written together with the buffer.
pub fn compress<M: SymbolModel>(
    model: &M,
    input: &[u8],
    desc: &CompDescriptor,
) -> Result<(u64, Buffer), AseError> {
    let total_size = desc.total_size();
    if total_size == 0 {
        return Err(AseError::InvalidPartition(
            "cannot compress zero bytes of input".to_string(),
        ));
    }
    if total_size > input.len() {
        return Err(AseError::InvalidPartition(format!(
            "descriptor covers {} bytes but input holds {}",
            total_size,
            input.len()
        )));
    }

    let mut buffer = Buffer::new(desc.max_width());
    let bit_count = encode_chunk(model, desc.params(), &input[..total_size], &mut buffer)?;

    log::debug!(
        "sequential compress: {} bytes -> {} bits ({} nodes) with {}",
        total_size,
        bit_count,
        buffer.node_count(),
        desc.params()
    );
    Ok((bit_count, buffer))
}

/// Reconstructs `desc.total_size()` bytes by reading exactly `desc.counts()`
/// bits from the buffer's read cursor.
///
/// Returns the number of bits consumed, which equals `desc.counts()` on
/// success; any difference is reported as `DesyncError`.
pub fn decompress<M: SymbolModel>(
    model: &M,
    buffer: &mut Buffer,
    desc: &DecompDescriptor,
) -> Result<(u64, Vec<u8>), AseError> {
    let mut output = vec![0u8; desc.total_size()];
    let consumed = decode_chunk(model, desc.params(), buffer, &mut output, desc.counts())?;

    log::debug!(
        "sequential decompress: {} bits -> {} bytes with {}",
        consumed,
        output.len(),
        desc.params()
    );
    Ok((consumed, output))
}
