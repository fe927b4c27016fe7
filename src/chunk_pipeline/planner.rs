// In: src/chunk_pipeline/planner.rs

//! The partition planner.
//!
//! This module turns a declared `Partition` and the number of bytes actually
//! read into a concrete `PartitionPlan`: one `UnitAssignment` per execution
//! unit, carrying the unit's model parameters and its exact byte range.
//!
//! It operates in three steps:
//! 1. Validate the partition (shape, parameter ranges, block targets, conflicts).
//! 2. Resolve one `ModelParams` per block from the allocations.
//! 3. Apply thread-count correction and lay out the chunk boundaries.
//!
//! Compression and decompression must call the same planner with the same
//! inputs; the plan is deterministic and is never transmitted itself.

use std::collections::BTreeMap;

use crate::chunk_pipeline::partition::Partition;
use crate::error::AseError;
use crate::types::ModelParams;

//==================================================================================
// 0. Plan Types
//==================================================================================

/// The concrete work order for one execution unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitAssignment {
    pub unit: usize,
    pub block: usize,
    pub params: ModelParams,
    /// First input byte owned by the unit.
    pub offset: usize,
    /// Number of bytes owned by the unit.
    pub chunk_size: usize,
}

/// The resolved assignment for a whole batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionPlan {
    pub total_size: usize,
    pub num_blocks: usize,
    pub units: Vec<UnitAssignment>,
}

//==================================================================================
// 1. Validation & Resolution
//==================================================================================

/// Validates the whole partition and resolves the model parameters of its
/// first `blocks` blocks (clamped to the declared block count).
///
/// A scoped allocation wins over the global one for the blocks it targets.
/// Two scoped allocations claiming the same block, or more than one global
/// allocation, are rejected: there is no meaningful tie-break. Claims are
/// kept sparse, so a large declared block count costs nothing until a block
/// actually receives a unit.
pub fn resolve_block_params(
    partition: &Partition,
    blocks: usize,
) -> Result<Vec<ModelParams>, AseError> {
    let num_blocks = partition.block_count();
    if num_blocks == 0 {
        return Err(AseError::InvalidPartition(
            "num_blocks must be at least 1".to_string(),
        ));
    }
    if partition.threads_per_block == 0 {
        return Err(AseError::InvalidPartition(
            "threads_per_block must be at least 1".to_string(),
        ));
    }
    if partition.unit_count().is_none() {
        return Err(AseError::InvalidPartition(format!(
            "{} blocks of {} threads overflow the unit count",
            num_blocks, partition.threads_per_block
        )));
    }
    if partition.allocations.is_empty() {
        return Err(AseError::InvalidPartition(
            "partition declares no allocations".to_string(),
        ));
    }

    let mut global: Option<(usize, ModelParams)> = None;
    let mut scoped: BTreeMap<usize, (usize, ModelParams)> = BTreeMap::new();

    for (position, allocation) in partition.allocations.iter().enumerate() {
        let params = allocation.params();
        params.validate().map_err(|e| {
            AseError::InvalidPartition(format!("allocation {}: {}", allocation.label(position), e))
        })?;

        match &allocation.target_block_ids {
            None => {
                if let Some((previous, _)) = global {
                    return Err(AseError::InvalidPartition(format!(
                        "allocations {} and {} are both global",
                        partition.allocations[previous].label(previous),
                        allocation.label(position)
                    )));
                }
                global = Some((position, params));
            }
            Some(block_ids) => {
                if block_ids.is_empty() {
                    return Err(AseError::InvalidPartition(format!(
                        "allocation {} targets an empty block list",
                        allocation.label(position)
                    )));
                }
                for &block in block_ids {
                    if block >= num_blocks {
                        return Err(AseError::InvalidPartition(format!(
                            "allocation {} targets block {} outside [0, {})",
                            allocation.label(position),
                            block,
                            num_blocks
                        )));
                    }
                    match scoped.get(&block) {
                        Some(&(owner, _)) if owner != position => {
                            return Err(AseError::InvalidPartition(format!(
                                "allocations {} and {} both target block {}",
                                partition.allocations[owner].label(owner),
                                allocation.label(position),
                                block
                            )));
                        }
                        _ => {
                            scoped.insert(block, (position, params));
                        }
                    }
                }
            }
        }
    }

    if global.is_none() && scoped.len() < num_blocks {
        let uncovered = (0..num_blocks)
            .find(|block| !scoped.contains_key(block))
            .unwrap_or(num_blocks);
        return Err(AseError::InvalidPartition(format!(
            "block {} has no allocation",
            uncovered
        )));
    }

    Ok((0..blocks.min(num_blocks))
        .filter_map(|block| scoped.get(&block).or(global.as_ref()).map(|&(_, params)| params))
        .collect())
}

//==================================================================================
// 2. Thread-Count Correction & Chunk Layout
//==================================================================================

/// Corrects the nominal unit count so that no unit receives an empty chunk.
pub fn correct_unit_count(nominal_units: usize, total_size: usize) -> usize {
    nominal_units.min(total_size)
}

/// Splits `total_size` bytes over `units` units as `(offset, chunk_size)` pairs.
///
/// Every unit gets `total_size / units` bytes at offset `unit * chunk`; the
/// last unit additionally takes the remainder. `units` must be in
/// `1..=total_size`.
pub fn chunk_layout(total_size: usize, units: usize) -> Vec<(usize, usize)> {
    let chunk = total_size / units;
    let remainder = total_size % units;
    (0..units)
        .map(|unit| {
            let extra = if unit + 1 == units { remainder } else { 0 };
            (unit * chunk, chunk + extra)
        })
        .collect()
}

//==================================================================================
// 3. Top-Level Public API
//==================================================================================

/// Resolves `partition` against `total_size` bytes into a per-unit plan.
pub fn plan_partition(partition: &Partition, total_size: usize) -> Result<PartitionPlan, AseError> {
    if total_size == 0 {
        return Err(AseError::InvalidPartition(
            "cannot partition zero bytes of input".to_string(),
        ));
    }
    let nominal_units = partition.unit_count().unwrap_or(usize::MAX);
    let units = correct_unit_count(nominal_units, total_size);
    // Blocks past the last corrected unit never receive work.
    let used_blocks = units.saturating_sub(1) / partition.threads_per_block.max(1) + 1;
    let block_params = resolve_block_params(partition, used_blocks)?;

    if units != nominal_units {
        log::info!(
            "thread-count correction: {} nominal units reduced to {} for {} bytes",
            nominal_units,
            units,
            total_size
        );
    }

    let units = chunk_layout(total_size, units)
        .into_iter()
        .enumerate()
        .map(|(unit, (offset, chunk_size))| {
            let block = unit / partition.threads_per_block;
            UnitAssignment {
                unit,
                block,
                params: block_params[block],
                offset,
                chunk_size,
            }
        })
        .collect();

    Ok(PartitionPlan {
        total_size,
        num_blocks: partition.block_count(),
        units,
    })
}

/// Checks that two partitions resolve to the same assignment for `total_size`
/// bytes. Used when a separate decompression-side partition is configured.
pub fn ensure_same_assignment(
    compression: &Partition,
    decompression: &Partition,
    total_size: usize,
) -> Result<(), AseError> {
    let expected = plan_partition(compression, total_size)?;
    let actual = plan_partition(decompression, total_size)?;

    if expected.units.len() != actual.units.len() {
        return Err(AseError::DesyncError(format!(
            "decompression partition yields {} units, compression used {}",
            actual.units.len(),
            expected.units.len()
        )));
    }
    for (want, got) in expected.units.iter().zip(&actual.units) {
        if want.params != got.params
            || want.offset != got.offset
            || want.chunk_size != got.chunk_size
        {
            return Err(AseError::DesyncError(format!(
                "unit {} differs: compressed with {} over {}+{}, decompression plans {} over {}+{}",
                want.unit,
                want.params,
                want.offset,
                want.chunk_size,
                got.params,
                got.offset,
                got.chunk_size
            )));
        }
    }
    Ok(())
}

//==================================================================================
// 4. Unit Tests
//==================================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk_pipeline::partition::PartitionAllocation;

    fn sizes(plan: &PartitionPlan) -> Vec<usize> {
        plan.units.iter().map(|u| u.chunk_size).collect()
    }

    #[test]
    fn test_even_split() {
        let plan = plan_partition(&Partition::default().with_blocks(4), 1000).unwrap();
        assert_eq!(sizes(&plan), vec![250, 250, 250, 250]);
        let offsets: Vec<usize> = plan.units.iter().map(|u| u.offset).collect();
        assert_eq!(offsets, vec![0, 250, 500, 750]);
    }

    #[test]
    fn test_remainder_goes_to_last_unit() {
        let plan = plan_partition(&Partition::default().with_blocks(4), 1003).unwrap();
        assert_eq!(sizes(&plan), vec![250, 250, 250, 253]);
        assert_eq!(plan.units[3].offset, 750);
    }

    #[test]
    fn test_more_units_than_bytes_are_corrected() {
        let plan = plan_partition(&Partition::default().with_blocks(8), 3).unwrap();
        assert_eq!(sizes(&plan), vec![1, 1, 1]);
    }

    #[test]
    fn test_chunks_cover_every_byte_exactly_once() {
        for total in [1usize, 2, 7, 64, 1000, 1021] {
            for units in [1usize, 2, 3, 5, 16, 1024] {
                let partition = Partition::default().with_blocks(units);
                let plan = plan_partition(&partition, total).unwrap();
                let mut next = 0;
                for unit in &plan.units {
                    assert_eq!(unit.offset, next);
                    assert!(unit.chunk_size > 0);
                    next += unit.chunk_size;
                }
                assert_eq!(next, total, "total={} units={}", total, units);
            }
        }
    }

    #[test]
    fn test_zero_bytes_is_invalid() {
        let result = plan_partition(&Partition::default(), 0);
        assert!(matches!(result, Err(AseError::InvalidPartition(_))));
    }

    #[test]
    fn test_units_map_to_blocks_by_threads_per_block() {
        let partition = Partition::new(vec![
            PartitionAllocation::global(8, 4),
            PartitionAllocation::scoped(16, 2, vec![1]),
        ])
        .with_blocks(2)
        .with_threads_per_block(2);
        let plan = plan_partition(&partition, 400).unwrap();

        let blocks: Vec<usize> = plan.units.iter().map(|u| u.block).collect();
        assert_eq!(blocks, vec![0, 0, 1, 1]);
        assert_eq!(plan.units[1].params, ModelParams::new(8, 4));
        assert_eq!(plan.units[2].params, ModelParams::new(16, 2));
    }

    #[test]
    fn test_out_of_range_target_is_invalid() {
        let partition = Partition::new(vec![
            PartitionAllocation::global(8, 4),
            PartitionAllocation::scoped(8, 4, vec![4]),
        ])
        .with_blocks(4);
        let result = resolve_block_params(&partition, partition.block_count());
        assert!(matches!(result, Err(AseError::InvalidPartition(msg)) if msg.contains("block 4")));
    }

    #[test]
    fn test_overlapping_scoped_allocations_conflict() {
        let partition = Partition::new(vec![
            PartitionAllocation::scoped(8, 4, vec![0, 1]).named("a"),
            PartitionAllocation::scoped(16, 4, vec![1]).named("b"),
        ])
        .with_blocks(2);
        let result = resolve_block_params(&partition, partition.block_count());
        assert!(matches!(result, Err(AseError::InvalidPartition(msg)) if msg.contains("'a' and 'b'")));
    }

    #[test]
    fn test_two_global_allocations_conflict() {
        let partition = Partition::new(vec![
            PartitionAllocation::global(8, 4),
            PartitionAllocation::global(16, 4),
        ]);
        assert!(resolve_block_params(&partition, partition.block_count()).is_err());
    }

    #[test]
    fn test_uncovered_block_is_invalid() {
        let partition =
            Partition::new(vec![PartitionAllocation::scoped(8, 4, vec![0])]).with_blocks(2);
        let result = resolve_block_params(&partition, partition.block_count());
        assert!(matches!(result, Err(AseError::InvalidPartition(msg)) if msg.contains("block 1")));
    }

    #[test]
    fn test_invalid_shape_and_params_are_rejected() {
        let empty = Partition::new(vec![]);
        assert!(resolve_block_params(&empty, empty.block_count()).is_err());

        let zero_threads = Partition::default().with_threads_per_block(0);
        assert!(resolve_block_params(&zero_threads, zero_threads.block_count()).is_err());

        let zero_blocks = Partition::default().with_blocks(0);
        assert!(resolve_block_params(&zero_blocks, zero_blocks.block_count()).is_err());

        let bad_entry = Partition::new(vec![PartitionAllocation::global(0, 4)]);
        assert!(resolve_block_params(&bad_entry, bad_entry.block_count()).is_err());

        let empty_scope = Partition::new(vec![
            PartitionAllocation::global(8, 4),
            PartitionAllocation::scoped(8, 4, vec![]),
        ]);
        assert!(resolve_block_params(&empty_scope, empty_scope.block_count()).is_err());
    }

    #[test]
    fn test_huge_block_count_only_resolves_used_blocks() {
        let partition = Partition::new(vec![
            PartitionAllocation::global(8, 4),
            PartitionAllocation::scoped(16, 2, vec![1, usize::MAX / 2]),
        ])
        .with_blocks(usize::MAX / 2 + 1);
        let plan = plan_partition(&partition, 3).unwrap();
        assert_eq!(sizes(&plan), vec![1, 1, 1]);
        assert_eq!(plan.num_blocks, usize::MAX / 2 + 1);
        assert_eq!(plan.units[1].params, ModelParams::new(16, 2));

        let overflowing = partition.with_threads_per_block(2);
        assert!(matches!(
            plan_partition(&overflowing, 3),
            Err(AseError::InvalidPartition(msg)) if msg.contains("overflow")
        ));
    }

    #[test]
    fn test_ensure_same_assignment() {
        let comp = Partition::default().with_blocks(4);
        let same_shape = Partition::default().with_blocks(2).with_threads_per_block(2);
        assert!(ensure_same_assignment(&comp, &same_shape, 1000).is_ok());

        let fewer_units = Partition::default().with_blocks(2);
        assert!(matches!(
            ensure_same_assignment(&comp, &fewer_units, 1000),
            Err(AseError::DesyncError(_))
        ));

        let other_params = Partition::uniform(4, ModelParams::new(16, 4));
        assert!(matches!(
            ensure_same_assignment(&comp, &other_params, 1000),
            Err(AseError::DesyncError(_))
        ));
    }
}
