//! This file is the root of the `ase_codec` Rust crate.
//!
//! Its responsibilities are strictly limited to:
//! 1.  Declaring all the top-level modules of the library (`chunk_pipeline`,
//!     `kernels`, `sink`, etc.) so the Rust compiler knows they exist.
//! 2.  Re-exporting the handful of types most callers need.

//==================================================================================
// 0. Constants
//==================================================================================
/// The crate version, automatically set from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
//==================================================================================
// 1. Module Declarations
//==================================================================================
pub mod bridge;
pub mod chunk_pipeline;
pub mod config;
pub mod error;
pub mod kernels;
pub mod logging;
pub mod sink;
pub mod traits;
pub mod types;

mod utils;

//==================================================================================
// 2. Public Surface
//==================================================================================
pub use bridge::{BatchManifest, Codec, CompressedBatch, RunStats};
pub use chunk_pipeline::{Partition, PartitionAllocation};
pub use config::{CodecConfig, ExecutionMode};
pub use error::AseError;
pub use kernels::AseModel;
pub use types::ModelParams;
