// In: src/chunk_pipeline/orchestrator/parallel.rs

//! The parallel engine: one symbol-model instance per execution unit.
//!
//! Units are independent rayon tasks. During compression each unit reads its
//! own disjoint slice of the input and writes only its own pool region;
//! during decompression each unit reads its own region and writes its own
//! slice of the output. Nothing shared is mutated while units run, so the
//! only synchronization is the join at the end of the batch. A failure in
//! any unit fails the whole batch.

use rayon::prelude::*;

use crate::chunk_pipeline::descriptor::{
    validate_coverage, ChunkLayout, ParallelCompDescriptor, ParallelDecompDescriptor,
};
use crate::chunk_pipeline::orchestrator::{decode_chunk, encode_chunk};
use crate::error::AseError;
use crate::sink::{compressed_bytes, BitPool, PoolInfo};
use crate::traits::SymbolModel;
use crate::utils::split_regions_mut;

//==================================================================================
// 1. Worker Pool
//==================================================================================

/// Where parallel units are scheduled: rayon's global pool or a dedicated one.
#[derive(Debug, Default)]
pub struct ParallelRunner {
    pool: Option<rayon::ThreadPool>,
}

impl ParallelRunner {
    /// Runs units on rayon's global pool.
    pub fn global() -> Self {
        Self { pool: None }
    }

    /// Runs units on a dedicated pool of `num_threads` workers.
    pub fn with_threads(num_threads: usize) -> Result<Self, AseError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("ase-unit-{}", i))
            .build()?;
        Ok(Self { pool: Some(pool) })
    }

    pub fn num_threads(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }

    fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}

//==================================================================================
// 2. Compression
//==================================================================================

/// Compresses `input` on rayon's global pool. See `compress_with`.
pub fn compress<M: SymbolModel>(
    model: &M,
    input: &[u8],
    descs: &[ParallelCompDescriptor],
) -> Result<(Vec<PoolInfo>, BitPool), AseError> {
    compress_with(&ParallelRunner::global(), model, input, descs)
}

/// Compresses every unit's chunk into its own region of a fresh pool.
///
/// Regions are sized from each descriptor's `output_size`, which is checked
/// against the model's worst-case expansion before any unit is launched.
/// Returns one `PoolInfo` per unit (its `counts` is the exact bit length)
/// and the pool in its reserved-stride layout. Callers that ship the pool
/// must compact it with `BitPool::pack` first; the packed regions can be
/// located again from the counts alone with `packed_layout`.
pub fn compress_with<M: SymbolModel>(
    runner: &ParallelRunner,
    model: &M,
    input: &[u8],
    descs: &[ParallelCompDescriptor],
) -> Result<(Vec<PoolInfo>, BitPool), AseError> {
    let total_size = validate_coverage(descs, input.len())?;
    for desc in descs {
        let worst_case = model.worst_case_bits(desc.params(), desc.chunk_size())?;
        let capacity_bits = desc.output_size() as u64 * 8;
        if capacity_bits < worst_case {
            return Err(AseError::PoolOverflow {
                unit: desc.unit(),
                requested_bits: worst_case,
                capacity_bits,
            });
        }
    }

    let capacities: Vec<usize> = descs.iter().map(|d| d.output_size()).collect();
    let max_width = descs.iter().map(|d| d.max_width()).max().unwrap_or(0);
    let (mut pool, mut infos) = BitPool::allocate(&capacities, max_width);

    {
        let writers = pool.writers(&mut infos);
        let results: Vec<Result<u64, AseError>> = runner.install(|| {
            writers
                .into_par_iter()
                .zip(descs.par_iter())
                .map(|(mut writer, desc)| {
                    let bits = encode_chunk(model, desc.params(), &input[desc.range()], &mut writer)?;
                    log::debug!(
                        "unit {} (block {}): {} bytes -> {} bits",
                        desc.unit(),
                        desc.block(),
                        desc.chunk_size(),
                        bits
                    );
                    Ok(bits)
                })
                .collect()
        });
        // Every unit has joined here; surface the first failure for the batch.
        results.into_iter().collect::<Result<Vec<_>, _>>()?;
    }

    log::info!(
        "parallel compress: {} bytes over {} units -> {} bytes (pool reserved {})",
        total_size,
        infos.len(),
        compressed_bytes(&infos),
        pool.len()
    );
    Ok((infos, pool))
}

//==================================================================================
// 3. Decompression
//==================================================================================

/// The result of a parallel decompression batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParallelDecompressed {
    /// Per-unit accounting after reading; `bits_consumed()` equals `counts`.
    pub infos: Vec<PoolInfo>,
    pub output: Vec<u8>,
}

/// Decompresses on rayon's global pool. See `decompress_with`.
pub fn decompress<M: SymbolModel>(
    model: &M,
    pool: &[u8],
    infos: &[PoolInfo],
    descs: &[ParallelDecompDescriptor],
) -> Result<ParallelDecompressed, AseError> {
    decompress_with(&ParallelRunner::global(), model, pool, infos, descs)
}

/// Reconstructs every unit's chunk from its pool region.
///
/// `pool` may be the reserved-stride pool returned by compression or a packed
/// one; each unit is located through its `PoolInfo::base`. The descriptors
/// must carry the same counts, in the same unit order, as `infos`.
pub fn decompress_with<M: SymbolModel>(
    runner: &ParallelRunner,
    model: &M,
    pool: &[u8],
    infos: &[PoolInfo],
    descs: &[ParallelDecompDescriptor],
) -> Result<ParallelDecompressed, AseError> {
    let total_size = validate_coverage(descs, usize::MAX)?;
    if infos.len() != descs.len() {
        return Err(AseError::DesyncError(format!(
            "{} pool records for {} execution units",
            infos.len(),
            descs.len()
        )));
    }
    for (info, desc) in infos.iter().zip(descs) {
        if info.unit != desc.unit() || info.counts != desc.counts() {
            return Err(AseError::DesyncError(format!(
                "unit {} declares {} bits but pool record for unit {} holds {}",
                desc.unit(),
                desc.counts(),
                info.unit,
                info.counts
            )));
        }
    }

    let mut output = vec![0u8; total_size];
    let regions = split_regions_mut(&mut output, descs.iter().map(|d| d.chunk_size()));
    let results: Vec<Result<PoolInfo, AseError>> = runner.install(|| {
        regions
            .into_par_iter()
            .zip(descs.par_iter())
            .zip(infos.par_iter())
            .map(|((region, desc), info)| {
                let mut reader = BitPool::reader(pool, info)?;
                decode_chunk(model, desc.params(), &mut reader, region, desc.counts())?;
                Ok(reader.into_info())
            })
            .collect()
    });
    let infos = results.into_iter().collect::<Result<Vec<_>, _>>()?;

    log::info!(
        "parallel decompress: {} units -> {} bytes",
        infos.len(),
        total_size
    );
    Ok(ParallelDecompressed { infos, output })
}
