//! The declared division of a batch into execution units.
//!
//! A `Partition` is configuration, not state: it is deserialized from the
//! caller's config (or built in code), validated by the planner, and must be
//! transmitted out-of-band alongside the compressed bytes, because the
//! decompressor has to reproduce the exact same assignment.

use serde::{Deserialize, Serialize};

use crate::types::{ModelParams, DEFAULT_ENTRY_SIZE, DEFAULT_GLOBAL_COUNTER};

/// A named symbol-model configuration, optionally scoped to some blocks.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PartitionAllocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub entry_size: u32,
    pub global_counter: u32,
    /// Blocks this allocation applies to. `None` means every block that no
    /// scoped allocation claims.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_block_ids: Option<Vec<usize>>,
}

impl PartitionAllocation {
    /// An allocation that applies to every block.
    pub fn global(entry_size: u32, global_counter: u32) -> Self {
        Self {
            name: None,
            entry_size,
            global_counter,
            target_block_ids: None,
        }
    }

    /// An allocation restricted to `block_ids`.
    pub fn scoped(entry_size: u32, global_counter: u32, block_ids: Vec<usize>) -> Self {
        Self {
            name: None,
            entry_size,
            global_counter,
            target_block_ids: Some(block_ids),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn params(&self) -> ModelParams {
        ModelParams::new(self.entry_size, self.global_counter)
    }

    pub fn is_scoped(&self) -> bool {
        self.target_block_ids.is_some()
    }

    /// A label for log and error messages.
    pub(crate) fn label(&self, position: usize) -> String {
        match &self.name {
            Some(name) => format!("'{}'", name),
            None => format!("#{}", position),
        }
    }
}

impl Default for PartitionAllocation {
    fn default() -> Self {
        Self::global(DEFAULT_ENTRY_SIZE, DEFAULT_GLOBAL_COUNTER)
    }
}

/// An ordered set of allocations plus the block/thread shape of a batch.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    /// Number of blocks. `None` runs the batch as a single block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_blocks: Option<usize>,
    /// Execution units per block.
    #[serde(default = "default_threads_per_block")]
    pub threads_per_block: usize,
    pub allocations: Vec<PartitionAllocation>,
}

fn default_threads_per_block() -> usize {
    1
}

impl Partition {
    pub fn new(allocations: Vec<PartitionAllocation>) -> Self {
        Self {
            num_blocks: None,
            threads_per_block: default_threads_per_block(),
            allocations,
        }
    }

    /// A partition of `num_blocks` single-unit blocks sharing one global allocation.
    pub fn uniform(num_blocks: usize, params: ModelParams) -> Self {
        Self::new(vec![PartitionAllocation::global(
            params.entry_size,
            params.global_counter,
        )])
        .with_blocks(num_blocks)
    }

    pub fn with_blocks(mut self, num_blocks: usize) -> Self {
        self.num_blocks = Some(num_blocks);
        self
    }

    pub fn with_threads_per_block(mut self, threads_per_block: usize) -> Self {
        self.threads_per_block = threads_per_block;
        self
    }

    pub fn block_count(&self) -> usize {
        self.num_blocks.unwrap_or(1)
    }

    /// Nominal number of execution units before thread-count correction,
    /// or `None` if the shape overflows `usize`.
    pub fn unit_count(&self) -> Option<usize> {
        self.block_count().checked_mul(self.threads_per_block)
    }
}

impl Default for Partition {
    fn default() -> Self {
        Self::new(vec![PartitionAllocation::default()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_partition_is_one_global_default_allocation() {
        let partition = Partition::default();
        assert_eq!(partition.unit_count(), Some(1));
        assert_eq!(partition.allocations.len(), 1);
        assert_eq!(partition.allocations[0].params(), ModelParams::default());
        assert!(!partition.allocations[0].is_scoped());
    }

    #[test]
    fn test_partition_deserializes_with_defaults() {
        let json = r#"{
            "num_blocks": 4,
            "allocations": [
                { "entry_size": 8, "global_counter": 4 },
                { "name": "tail", "entry_size": 16, "global_counter": 2, "target_block_ids": [3] }
            ]
        }"#;
        let partition: Partition = serde_json::from_str(json).unwrap();
        assert_eq!(partition.block_count(), 4);
        assert_eq!(partition.threads_per_block, 1);
        assert_eq!(partition.unit_count(), Some(4));
        assert_eq!(partition.allocations[1].target_block_ids, Some(vec![3]));
        assert_eq!(partition.allocations[1].label(1), "'tail'");
        assert_eq!(partition.allocations[0].label(0), "#0");
    }

    #[test]
    fn test_unit_count_multiplies_blocks_and_threads() {
        let partition = Partition::default()
            .with_blocks(3)
            .with_threads_per_block(4);
        assert_eq!(partition.unit_count(), Some(12));

        let oversized = Partition::default()
            .with_blocks(usize::MAX / 2 + 1)
            .with_threads_per_block(2);
        assert_eq!(oversized.unit_count(), None);
    }
}
