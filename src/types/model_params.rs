//! The configuration knobs of the adaptive symbol model.

use crate::error::AseError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default number of lookup-table entries.
pub const DEFAULT_ENTRY_SIZE: u32 = 8;
/// Default entropy-culling count.
pub const DEFAULT_GLOBAL_COUNTER: u32 = 4;
/// Width of one input symbol in bits.
pub const SYMBOL_BITS: u32 = 8;
/// Largest table the model supports. A table index then never needs more
/// bits than a raw symbol.
pub const MAX_ENTRY_SIZE: u32 = 1 << SYMBOL_BITS;

/// The entropy-model configuration applied to one execution unit.
///
/// A value type: once resolved by the planner it is copied into descriptors
/// and never mutated.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelParams {
    /// Number of slots in the adaptive lookup table.
    pub entry_size: u32,
    /// Initial (and reset) value of the entropy-culling counter.
    pub global_counter: u32,
}

impl ModelParams {
    pub fn new(entry_size: u32, global_counter: u32) -> Self {
        Self {
            entry_size,
            global_counter,
        }
    }

    /// Rejects parameters the symbol model cannot operate with.
    pub fn validate(&self) -> Result<(), AseError> {
        if self.entry_size == 0 || self.entry_size > MAX_ENTRY_SIZE {
            return Err(AseError::InvalidPartition(format!(
                "entry_size must be in 1..={}, got {}",
                MAX_ENTRY_SIZE, self.entry_size
            )));
        }
        Ok(())
    }
}

impl Default for ModelParams {
    fn default() -> Self {
        Self::new(DEFAULT_ENTRY_SIZE, DEFAULT_GLOBAL_COUNTER)
    }
}

impl fmt::Display for ModelParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}/C{}", self.entry_size, self.global_counter)
    }
}
