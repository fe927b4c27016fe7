// In: src/error.rs

//! This module defines the single, unified error type for the entire ASE codec.
//! It uses the `thiserror` crate to provide ergonomic, context-aware error handling.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AseError {
    // =========================================================================
    // === Configuration Errors (rejected before any work starts)
    // =========================================================================
    /// Zero-length input, out-of-range block targets, conflicting allocations
    /// or an allocation with unusable model parameters.
    #[error("Invalid partition: {0}")]
    InvalidPartition(String),

    // =========================================================================
    // === Bit Sink Errors
    // =========================================================================
    /// A unit's adaptive output does not fit in its reserved pool region.
    #[error(
        "Pool overflow in unit {unit}: {requested_bits} bits requested, region holds {capacity_bits}"
    )]
    PoolOverflow {
        unit: usize,
        requested_bits: u64,
        capacity_bits: u64,
    },

    /// A read past the number of bits that were written (or declared).
    #[error("Buffer underrun: requested {requested} bits, only {available} available")]
    BufferUnderrun { requested: u64, available: u64 },

    /// A single append or read wider than the sink allows.
    #[error("Bit width {width} exceeds the sink's max width of {max_width}")]
    InvalidWidth { width: u32, max_width: u32 },

    /// Decompression state does not match the state used at compression time.
    #[error("Desynchronized stream: {0}")]
    DesyncError(String),

    // =========================================================================
    // === External Error Wrappers (Using #[from] for automatic conversion)
    // =========================================================================
    /// The rayon worker pool for parallel execution could not be built.
    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    /// An error originating from the byte source or sink.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error from the Serde JSON library, during config or manifest handling.
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
}

// =============================================================================
// === Manual `From` Implementations ===
// =============================================================================

impl From<rayon::ThreadPoolBuildError> for AseError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        AseError::ThreadPool(err.to_string())
    }
}
