// In: src/chunk_pipeline/descriptor.rs

//! Per-chunk descriptors and the factory that builds them.
//!
//! Descriptors are immutable value types. The `DescriptorFactory` is the only
//! place that constructs them from a `Partition`; engines receive them by
//! shared reference and never modify them. A decompression descriptor is a
//! compression descriptor plus the exact bit count its unit produced.

use std::ops::Range;

use crate::chunk_pipeline::partition::Partition;
use crate::chunk_pipeline::planner::{plan_partition, resolve_block_params, UnitAssignment};
use crate::error::AseError;
use crate::traits::SymbolModel;
use crate::types::ModelParams;
use crate::utils::bits_to_bytes;

//==================================================================================
// 1. Sequential Descriptors
//==================================================================================

/// Configuration of one sequential compression call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompDescriptor {
    params: ModelParams,
    chunk_size: usize,
    total_size: usize,
    max_width: u32,
}

impl CompDescriptor {
    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    pub fn entry_size(&self) -> u32 {
        self.params.entry_size
    }

    pub fn global_counter(&self) -> u32 {
        self.params.global_counter
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn total_size(&self) -> usize {
        self.total_size
    }

    /// Widest single write the symbol model performs.
    pub fn max_width(&self) -> u32 {
        self.max_width
    }

    /// Pairs this descriptor with the bit count its compression produced.
    pub fn with_counts(&self, counts: u64) -> DecompDescriptor {
        DecompDescriptor {
            comp: *self,
            counts,
        }
    }
}

/// Configuration of one sequential decompression call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecompDescriptor {
    comp: CompDescriptor,
    counts: u64,
}

impl DecompDescriptor {
    pub fn params(&self) -> &ModelParams {
        self.comp.params()
    }

    pub fn entry_size(&self) -> u32 {
        self.comp.entry_size()
    }

    pub fn global_counter(&self) -> u32 {
        self.comp.global_counter()
    }

    pub fn chunk_size(&self) -> usize {
        self.comp.chunk_size()
    }

    pub fn total_size(&self) -> usize {
        self.comp.total_size()
    }

    pub fn max_width(&self) -> u32 {
        self.comp.max_width()
    }

    /// Exact number of bits the paired compression call wrote.
    pub fn counts(&self) -> u64 {
        self.counts
    }
}

//==================================================================================
// 2. Parallel Descriptors
//==================================================================================

/// Byte-range accessors shared by both parallel descriptor kinds.
pub trait ChunkLayout {
    fn unit(&self) -> usize;
    fn offset(&self) -> usize;
    fn chunk_size(&self) -> usize;
    fn total_size(&self) -> usize;

    fn range(&self) -> Range<usize> {
        self.offset()..self.offset() + self.chunk_size()
    }
}

/// Configuration of one execution unit in a parallel compression batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParallelCompDescriptor {
    unit: usize,
    block: usize,
    params: ModelParams,
    offset: usize,
    chunk_size: usize,
    total_size: usize,
    num_blocks: usize,
    num_units: usize,
    output_size: usize,
    max_width: u32,
}

impl ParallelCompDescriptor {
    pub fn block(&self) -> usize {
        self.block
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    pub fn entry_size(&self) -> u32 {
        self.params.entry_size
    }

    pub fn global_counter(&self) -> u32 {
        self.params.global_counter
    }

    pub fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    /// Number of units in the batch after thread-count correction.
    pub fn num_units(&self) -> usize {
        self.num_units
    }

    /// Bytes reserved for this unit in the pool.
    pub fn output_size(&self) -> usize {
        self.output_size
    }

    pub fn max_width(&self) -> u32 {
        self.max_width
    }

    /// A copy of this descriptor reserving `output_size` bytes instead of the
    /// model's worst-case bound. Too small a region fails the batch with
    /// `PoolOverflow` before any unit runs.
    pub fn with_output_size(&self, output_size: usize) -> Self {
        Self {
            output_size,
            ..*self
        }
    }

    pub fn with_counts(&self, counts: u64) -> ParallelDecompDescriptor {
        ParallelDecompDescriptor {
            comp: *self,
            counts,
        }
    }
}

impl ChunkLayout for ParallelCompDescriptor {
    fn unit(&self) -> usize {
        self.unit
    }

    fn offset(&self) -> usize {
        self.offset
    }

    fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn total_size(&self) -> usize {
        self.total_size
    }
}

/// Configuration of one execution unit in a parallel decompression batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParallelDecompDescriptor {
    comp: ParallelCompDescriptor,
    counts: u64,
}

impl ParallelDecompDescriptor {
    pub fn block(&self) -> usize {
        self.comp.block()
    }

    pub fn params(&self) -> &ModelParams {
        self.comp.params()
    }

    pub fn entry_size(&self) -> u32 {
        self.comp.entry_size()
    }

    pub fn global_counter(&self) -> u32 {
        self.comp.global_counter()
    }

    pub fn num_blocks(&self) -> usize {
        self.comp.num_blocks()
    }

    pub fn num_units(&self) -> usize {
        self.comp.num_units()
    }

    /// Bytes the unit's region held at compression time.
    pub fn output_size(&self) -> usize {
        self.comp.output_size()
    }

    pub fn max_width(&self) -> u32 {
        self.comp.max_width()
    }

    pub fn counts(&self) -> u64 {
        self.counts
    }
}

impl ChunkLayout for ParallelDecompDescriptor {
    fn unit(&self) -> usize {
        self.comp.unit
    }

    fn offset(&self) -> usize {
        self.comp.offset
    }

    fn chunk_size(&self) -> usize {
        self.comp.chunk_size
    }

    fn total_size(&self) -> usize {
        self.comp.total_size
    }
}

/// Checks that `descs` cover `[0, total_size)` in unit order without gaps,
/// overlaps or empty chunks, and that `input_len` bytes are available.
pub fn validate_coverage<D: ChunkLayout>(descs: &[D], input_len: usize) -> Result<usize, AseError> {
    let total_size = match descs.first() {
        Some(first) => first.total_size(),
        None => {
            return Err(AseError::InvalidPartition(
                "batch has no execution units".to_string(),
            ))
        }
    };
    if total_size == 0 {
        return Err(AseError::InvalidPartition(
            "cannot process zero bytes of input".to_string(),
        ));
    }
    if total_size > input_len {
        return Err(AseError::InvalidPartition(format!(
            "descriptors cover {} bytes but only {} are available",
            total_size, input_len
        )));
    }

    let mut next = 0;
    for (position, desc) in descs.iter().enumerate() {
        if desc.total_size() != total_size {
            return Err(AseError::InvalidPartition(format!(
                "unit {} belongs to a {}-byte batch, unit 0 to a {}-byte one",
                desc.unit(),
                desc.total_size(),
                total_size
            )));
        }
        if desc.unit() != position || desc.offset() != next || desc.chunk_size() == 0 {
            return Err(AseError::InvalidPartition(format!(
                "unit {} at position {} covers {:?}, expected a non-empty chunk starting at {}",
                desc.unit(),
                position,
                desc.range(),
                next
            )));
        }
        next += desc.chunk_size();
    }
    if next != total_size {
        return Err(AseError::InvalidPartition(format!(
            "chunks cover {} bytes, batch holds {}",
            next, total_size
        )));
    }
    Ok(total_size)
}

//==================================================================================
// 3. Descriptor Factory
//==================================================================================

/// Builds descriptors for a given symbol model.
#[derive(Debug)]
pub struct DescriptorFactory<'m, M: SymbolModel> {
    model: &'m M,
}

impl<'m, M: SymbolModel> DescriptorFactory<'m, M> {
    pub fn new(model: &'m M) -> Self {
        Self { model }
    }

    /// The sequential descriptor: one unit over all `total_size` bytes, using
    /// the parameters the partition resolves for block 0.
    pub fn comp_descriptor(
        &self,
        partition: &Partition,
        total_size: usize,
    ) -> Result<CompDescriptor, AseError> {
        if total_size == 0 {
            return Err(AseError::InvalidPartition(
                "cannot compress zero bytes of input".to_string(),
            ));
        }
        let params = resolve_block_params(partition, 1)?[0];
        Ok(CompDescriptor {
            params,
            chunk_size: total_size,
            total_size,
            max_width: self.model.max_code_width(&params),
        })
    }

    pub fn decomp_descriptor(
        &self,
        partition: &Partition,
        total_size: usize,
        counts: u64,
    ) -> Result<DecompDescriptor, AseError> {
        Ok(self.comp_descriptor(partition, total_size)?.with_counts(counts))
    }

    /// One descriptor per execution unit, with pool regions sized to the
    /// model's worst-case expansion of each chunk.
    pub fn parallel_comp_descriptors(
        &self,
        partition: &Partition,
        total_size: usize,
    ) -> Result<Vec<ParallelCompDescriptor>, AseError> {
        let plan = plan_partition(partition, total_size)?;
        let num_units = plan.units.len();
        plan.units
            .iter()
            .map(|assignment| self.describe_unit(assignment, plan.num_blocks, num_units, total_size))
            .collect()
    }

    /// Threads the per-unit `counts` from compression, unmodified and in unit
    /// order, into the same resolved assignment.
    pub fn parallel_decomp_descriptors(
        &self,
        partition: &Partition,
        total_size: usize,
        counts: &[u64],
    ) -> Result<Vec<ParallelDecompDescriptor>, AseError> {
        let descs = self.parallel_comp_descriptors(partition, total_size)?;
        if descs.len() != counts.len() {
            return Err(AseError::DesyncError(format!(
                "partition resolves to {} units but {} bit counts were supplied",
                descs.len(),
                counts.len()
            )));
        }
        Ok(descs
            .iter()
            .zip(counts)
            .map(|(desc, &count)| desc.with_counts(count))
            .collect())
    }

    fn describe_unit(
        &self,
        assignment: &UnitAssignment,
        num_blocks: usize,
        num_units: usize,
        total_size: usize,
    ) -> Result<ParallelCompDescriptor, AseError> {
        let worst_case = self
            .model
            .worst_case_bits(&assignment.params, assignment.chunk_size)?;
        Ok(ParallelCompDescriptor {
            unit: assignment.unit,
            block: assignment.block,
            params: assignment.params,
            offset: assignment.offset,
            chunk_size: assignment.chunk_size,
            total_size,
            num_blocks,
            num_units,
            output_size: bits_to_bytes(worst_case),
            max_width: self.model.max_code_width(&assignment.params),
        })
    }
}
