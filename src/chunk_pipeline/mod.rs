// In: src/chunk_pipeline/mod.rs

//! The batch pipeline: declare a partition, plan it into execution units,
//! describe each unit, then run the sequential or parallel engine.

pub mod descriptor;
pub mod orchestrator;
pub mod partition;
pub mod planner;

pub use descriptor::{
    ChunkLayout, CompDescriptor, DecompDescriptor, DescriptorFactory, ParallelCompDescriptor,
    ParallelDecompDescriptor,
};
pub use partition::{Partition, PartitionAllocation};
pub use planner::{plan_partition, PartitionPlan, UnitAssignment};

#[cfg(test)]
mod orchestrator_tests;
