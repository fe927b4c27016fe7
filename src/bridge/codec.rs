// In: src/bridge/codec.rs

//! The batch-level facade: one call to compress a batch, one to restore it.
//!
//! `Codec` owns a symbol model, the validated configuration and (for
//! parallel mode) the worker pool. It picks the engine, builds descriptors
//! through the `DescriptorFactory`, and packages the result as a
//! `CompressedBatch`: the payload bytes plus the `BatchManifest` that must
//! travel with them.

use crate::bridge::manifest::BatchManifest;
use crate::chunk_pipeline::descriptor::DescriptorFactory;
use crate::chunk_pipeline::orchestrator::{parallel, sequential, ParallelRunner};
use crate::chunk_pipeline::partition::Partition;
use crate::chunk_pipeline::planner::ensure_same_assignment;
use crate::config::{CodecConfig, ExecutionMode};
use crate::error::AseError;
use crate::kernels::AseModel;
use crate::sink::{packed_layout, Buffer};
use crate::traits::SymbolModel;

/// A compressed batch: payload bytes and the out-of-band manifest.
///
/// For a parallel batch the payload is the packed pool, so unit regions
/// follow each other with `ceil(counts / 8)` bytes each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedBatch {
    pub manifest: BatchManifest,
    pub payload: Vec<u8>,
}

impl CompressedBatch {
    pub fn compressed_bytes(&self) -> usize {
        self.payload.len()
    }
}

#[derive(Debug)]
pub struct Codec<M: SymbolModel = AseModel> {
    model: M,
    config: CodecConfig,
    runner: ParallelRunner,
}

impl Codec<AseModel> {
    /// A codec using the built-in ASE model.
    pub fn new(config: CodecConfig) -> Result<Self, AseError> {
        Self::with_model(AseModel, config)
    }
}

impl<M: SymbolModel> Codec<M> {
    pub fn with_model(model: M, config: CodecConfig) -> Result<Self, AseError> {
        config.validate()?;
        let runner = match config.worker_threads {
            Some(threads) => ParallelRunner::with_threads(threads)?,
            None => ParallelRunner::global(),
        };
        Ok(Self {
            model,
            config,
            runner,
        })
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn compress_batch(&self, input: &[u8]) -> Result<CompressedBatch, AseError> {
        let factory = DescriptorFactory::new(&self.model);
        let partition = &self.config.partition;

        let (counts, payload) = match self.config.mode {
            ExecutionMode::Sequential => {
                let desc = factory.comp_descriptor(partition, input.len())?;
                let (bits, buffer) = sequential::compress(&self.model, input, &desc)?;
                (vec![bits], buffer.as_bytes().to_vec())
            }
            ExecutionMode::Parallel => {
                let descs = factory.parallel_comp_descriptors(partition, input.len())?;
                let (infos, pool) =
                    parallel::compress_with(&self.runner, &self.model, input, &descs)?;
                let (packed, packed_infos) = pool.pack(&infos);
                let counts = packed_infos.iter().map(|info| info.counts).collect();
                (counts, packed.into_bytes())
            }
        };

        let manifest =
            BatchManifest::new(self.config.mode, input.len(), partition.clone(), counts);
        Ok(CompressedBatch { manifest, payload })
    }

    /// Restores a batch using the configured decompression partition, which
    /// must resolve to the same assignment the batch was compressed with.
    pub fn decompress_batch(&self, batch: &CompressedBatch) -> Result<Vec<u8>, AseError> {
        let manifest = &batch.manifest;
        let expected = manifest.payload_bytes();
        if batch.payload.len() != expected {
            return Err(AseError::DesyncError(format!(
                "payload holds {} bytes but the manifest counts describe {}",
                batch.payload.len(),
                expected
            )));
        }
        // Every symbol costs at least one bit.
        if manifest.total_size as u64 > manifest.total_bits() {
            return Err(AseError::DesyncError(format!(
                "manifest declares {} bytes but only {} bits",
                manifest.total_size,
                manifest.total_bits()
            )));
        }
        let partition = self.decompression_partition_for(manifest)?;

        let factory = DescriptorFactory::new(&self.model);
        match manifest.mode {
            ExecutionMode::Sequential => {
                let bits = match manifest.counts.as_slice() {
                    [bits] => *bits,
                    counts => {
                        return Err(AseError::DesyncError(format!(
                            "sequential batch carries {} bit counts",
                            counts.len()
                        )))
                    }
                };
                let desc = factory.decomp_descriptor(partition, manifest.total_size, bits)?;
                let mut buffer = Buffer::from_bytes(&batch.payload, bits, desc.max_width())?;
                let (_, output) = sequential::decompress(&self.model, &mut buffer, &desc)?;
                Ok(output)
            }
            ExecutionMode::Parallel => {
                let descs = factory.parallel_decomp_descriptors(
                    partition,
                    manifest.total_size,
                    &manifest.counts,
                )?;
                let max_widths: Vec<u32> = descs.iter().map(|d| d.max_width()).collect();
                let infos = packed_layout(&manifest.counts, &max_widths);
                let result = parallel::decompress_with(
                    &self.runner,
                    &self.model,
                    &batch.payload,
                    &infos,
                    &descs,
                )?;
                Ok(result.output)
            }
        }
    }

    fn decompression_partition_for<'a>(
        &'a self,
        manifest: &'a BatchManifest,
    ) -> Result<&'a Partition, AseError> {
        let partition = self.config.decompression_partition();
        if *partition != manifest.partition {
            ensure_same_assignment(&manifest.partition, partition, manifest.total_size)?;
        }
        Ok(partition)
    }
}
