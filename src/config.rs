// In: src/config.rs

//! The single source of truth for all codec configuration.
//!
//! `CodecConfig` is created once at the application boundary (from a JSON
//! document or in code) and then passed down read-only. It carries the
//! execution mode, the partition used for compression, an optional separate
//! partition for the decompression side, and the driving-loop settings.

use serde::{Deserialize, Serialize};

use crate::chunk_pipeline::partition::Partition;
use crate::chunk_pipeline::planner::{ensure_same_assignment, plan_partition};
use crate::error::AseError;

//==================================================================================
// I. Core Configuration Enums
//==================================================================================

/// Selects the engine that runs a batch.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// **Default:** one worker codes the whole batch into a growable buffer.
    /// Uses the parameters resolved for block 0.
    #[default]
    Sequential,

    /// One symbol-model instance per execution unit, run on a rayon pool,
    /// writing into disjoint regions of a preallocated pool.
    Parallel,
}

//==================================================================================
// II. The Unified CodecConfig
//==================================================================================

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct CodecConfig {
    #[serde(default)]
    pub mode: ExecutionMode,

    /// The partition used to compress every batch.
    #[serde(default)]
    pub partition: Partition,

    /// A separately declared partition for decompression. It must resolve to
    /// exactly the same per-unit assignment as `partition`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decompression_partition: Option<Partition>,

    /// Bytes read from the source per batch in the driving loop.
    #[serde(default = "default_read_chunk_size")]
    pub read_chunk_size: usize,

    /// Size of a dedicated worker pool for parallel mode. `None` uses rayon's
    /// global pool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_threads: Option<usize>,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::default(),
            partition: Partition::default(),
            decompression_partition: None,
            read_chunk_size: default_read_chunk_size(),
            worker_threads: None,
        }
    }
}

/// Helper for `serde` to provide a default for `read_chunk_size`.
fn default_read_chunk_size() -> usize {
    50 * 1024 * 1000
}

impl CodecConfig {
    pub fn sequential(partition: Partition) -> Self {
        Self {
            partition,
            ..Self::default()
        }
    }

    pub fn parallel(partition: Partition) -> Self {
        Self {
            mode: ExecutionMode::Parallel,
            partition,
            ..Self::default()
        }
    }

    pub fn with_read_chunk_size(mut self, read_chunk_size: usize) -> Self {
        self.read_chunk_size = read_chunk_size;
        self
    }

    pub fn with_worker_threads(mut self, worker_threads: usize) -> Self {
        self.worker_threads = Some(worker_threads);
        self
    }

    pub fn with_decompression_partition(mut self, partition: Partition) -> Self {
        self.decompression_partition = Some(partition);
        self
    }

    /// The partition the decompression side plans with.
    pub fn decompression_partition(&self) -> &Partition {
        self.decompression_partition
            .as_ref()
            .unwrap_or(&self.partition)
    }

    pub fn from_json_str(json: &str) -> Result<Self, AseError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String, AseError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks the settings that can be checked without knowing a batch size.
    ///
    /// Partitions are planned against a one-byte probe so that structural
    /// errors (bad targets, overlaps, parameter ranges) surface at load time.
    pub fn validate(&self) -> Result<(), AseError> {
        if self.read_chunk_size == 0 {
            return Err(AseError::InvalidPartition(
                "read_chunk_size must be at least 1".to_string(),
            ));
        }
        if self.worker_threads == Some(0) {
            return Err(AseError::ThreadPool(
                "worker_threads must be at least 1".to_string(),
            ));
        }
        plan_partition(&self.partition, 1)?;
        if let Some(decompression) = &self.decompression_partition {
            ensure_same_assignment(&self.partition, decompression, self.read_chunk_size)?;
        }
        Ok(())
    }
}
