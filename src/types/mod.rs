//! This module defines the core, strongly-typed values shared by the planner,
//! the symbol model and the engines.
//!
//! It currently includes `ModelParams`, the per-unit configuration of the
//! adaptive symbol model, together with the codec-wide default constants.

pub mod model_params;

// Re-export the main type(s) for easier access.
pub use model_params::{
    ModelParams, DEFAULT_ENTRY_SIZE, DEFAULT_GLOBAL_COUNTER, MAX_ENTRY_SIZE, SYMBOL_BITS,
};
