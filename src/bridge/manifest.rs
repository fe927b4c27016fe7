// In: src/bridge/manifest.rs

//! The out-of-band record that travels with every compressed batch.
//!
//! The codec writes no header into its bit stream. Everything a decompressor
//! needs besides the bytes themselves (the execution mode, the partition, the
//! batch size and the exact per-unit bit counts) lives in a `BatchManifest`,
//! which the caller persists or transmits as JSON.

use serde::{Deserialize, Serialize};

use crate::chunk_pipeline::partition::Partition;
use crate::config::ExecutionMode;
use crate::error::AseError;
use crate::utils::bits_to_bytes;

/// The current version of the manifest format.
pub const MANIFEST_VERSION: u16 = 1;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BatchManifest {
    pub version: u16,
    pub mode: ExecutionMode,
    /// Uncompressed size of the batch in bytes.
    pub total_size: usize,
    /// The partition the batch was compressed with.
    pub partition: Partition,
    /// Exact bits written per execution unit, in unit order. A sequential
    /// batch has a single entry.
    pub counts: Vec<u64>,
}

impl BatchManifest {
    pub fn new(
        mode: ExecutionMode,
        total_size: usize,
        partition: Partition,
        counts: Vec<u64>,
    ) -> Self {
        Self {
            version: MANIFEST_VERSION,
            mode,
            total_size,
            partition,
            counts,
        }
    }

    /// Sum of `counts`, saturating so a tampered manifest cannot wrap it.
    pub fn total_bits(&self) -> u64 {
        self.counts.iter().fold(0u64, |sum, &bits| sum.saturating_add(bits))
    }

    /// Bytes of payload the manifest describes: `sum(ceil(counts / 8))`.
    pub fn payload_bytes(&self) -> usize {
        self.counts
            .iter()
            .fold(0usize, |sum, &bits| sum.saturating_add(bits_to_bytes(bits)))
    }

    pub fn to_json_string(&self) -> Result<String, AseError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self, AseError> {
        let manifest: Self = serde_json::from_str(json)?;
        if manifest.version != MANIFEST_VERSION {
            return Err(AseError::DesyncError(format!(
                "manifest version {} is not supported (expected {})",
                manifest.version, MANIFEST_VERSION
            )));
        }
        Ok(manifest)
    }
}
