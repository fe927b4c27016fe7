// In: src/bridge/stream.rs

//! Driving a codec over a byte stream.
//!
//! The driving loop reads the source in `read_chunk_size` batches, compresses
//! each batch, immediately decompresses it again, and writes the restored
//! bytes to the sink. Along the way it accumulates the sizes and the time
//! spent in each phase. A short read marks the end of the stream.

use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use crate::bridge::codec::{Codec, CompressedBatch};
use crate::error::AseError;
use crate::traits::SymbolModel;
use crate::utils::bits_to_bytes;

//==================================================================================
// 1. Sources & Sinks
//==================================================================================

/// Where batches are read from.
pub trait ChunkSource {
    /// Fills as much of `buf` as the source can provide, returning the number
    /// of bytes read. Fewer than `buf.len()` bytes means the source is drained.
    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, AseError>;
}

/// Where restored bytes are written to.
pub trait ChunkSink {
    fn write_chunk(&mut self, data: &[u8]) -> Result<(), AseError>;

    fn finish(&mut self) -> Result<(), AseError> {
        Ok(())
    }
}

impl<R: Read> ChunkSource for R {
    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, AseError> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(filled)
    }
}

impl<W: Write> ChunkSink for W {
    fn write_chunk(&mut self, data: &[u8]) -> Result<(), AseError> {
        Ok(self.write_all(data)?)
    }

    fn finish(&mut self) -> Result<(), AseError> {
        Ok(self.flush()?)
    }
}

//==================================================================================
// 2. Run Statistics
//==================================================================================

/// Totals gathered over one pass of the driving loop.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunStats {
    pub batches: usize,
    /// Bytes read from the source.
    pub raw_bytes: u64,
    /// `sum(ceil(bits / 8))` over the compressed batches.
    pub compressed_bytes: u64,
    /// `sum(ceil(bits / 8))` over the bits the decompressor consumed.
    pub decompressed_bytes: u64,
    pub compress_time: Duration,
    pub decompress_time: Duration,
}

impl RunStats {
    /// Compressed size as a percentage of the raw size.
    pub fn compression_rate(&self) -> f64 {
        if self.raw_bytes == 0 {
            return 0.0;
        }
        self.compressed_bytes as f64 / self.raw_bytes as f64 * 100.0
    }
}

//==================================================================================
// 3. Driving Loops
//==================================================================================

/// Reads `source` to the end, round-tripping each batch through `codec` and
/// writing the restored bytes to `sink`.
pub fn run_round_trip<M, S, K>(
    codec: &Codec<M>,
    source: &mut S,
    sink: &mut K,
) -> Result<RunStats, AseError>
where
    M: SymbolModel,
    S: ChunkSource + ?Sized,
    K: ChunkSink + ?Sized,
{
    let mut stats = RunStats::default();
    let mut input = vec![0u8; codec.config().read_chunk_size];

    loop {
        let nread = source.read_chunk(&mut input)?;
        if nread == 0 {
            break;
        }
        let batch_input = &input[..nread];

        let started = Instant::now();
        let batch = codec.compress_batch(batch_input)?;
        stats.compress_time += started.elapsed();
        stats.compressed_bytes += batch.compressed_bytes() as u64;

        let started = Instant::now();
        let output = codec.decompress_batch(&batch)?;
        stats.decompress_time += started.elapsed();
        // A successful decompression consumed exactly the declared counts.
        stats.decompressed_bytes += batch
            .manifest
            .counts
            .iter()
            .map(|&bits| bits_to_bytes(bits) as u64)
            .sum::<u64>();

        sink.write_chunk(&output)?;
        stats.raw_bytes += nread as u64;
        stats.batches += 1;

        if nread < input.len() {
            break;
        }
    }
    sink.finish()?;

    log::info!(
        "round trip: {} batches, raw {} bytes, compressed {} bytes ({:.2}%), decompressed {} bytes, compress {:?}, decompress {:?}",
        stats.batches,
        stats.raw_bytes,
        stats.compressed_bytes,
        stats.compression_rate(),
        stats.decompressed_bytes,
        stats.compress_time,
        stats.decompress_time
    );
    Ok(stats)
}

/// Compresses `source` batch by batch, handing each batch to `on_batch`.
pub fn compress_stream<M, S, F>(
    codec: &Codec<M>,
    source: &mut S,
    mut on_batch: F,
) -> Result<usize, AseError>
where
    M: SymbolModel,
    S: ChunkSource + ?Sized,
    F: FnMut(CompressedBatch) -> Result<(), AseError>,
{
    let mut input = vec![0u8; codec.config().read_chunk_size];
    let mut batches = 0;
    loop {
        let nread = source.read_chunk(&mut input)?;
        if nread == 0 {
            break;
        }
        on_batch(codec.compress_batch(&input[..nread])?)?;
        batches += 1;
        if nread < input.len() {
            break;
        }
    }
    Ok(batches)
}

/// Restores `batches` in order into `sink`, returning the bytes written.
pub fn decompress_stream<'b, M, I, K>(
    codec: &Codec<M>,
    batches: I,
    sink: &mut K,
) -> Result<u64, AseError>
where
    M: SymbolModel,
    I: IntoIterator<Item = &'b CompressedBatch>,
    K: ChunkSink + ?Sized,
{
    let mut written = 0u64;
    for batch in batches {
        let output = codec.decompress_batch(batch)?;
        sink.write_chunk(&output)?;
        written += output.len() as u64;
    }
    sink.finish()?;
    Ok(written)
}
