use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::chunk_pipeline::descriptor::{ChunkLayout, DescriptorFactory};
use crate::chunk_pipeline::orchestrator::{parallel, sequential, ParallelRunner};
use crate::chunk_pipeline::partition::{Partition, PartitionAllocation};
use crate::chunk_pipeline::planner::ensure_same_assignment;
use crate::error::AseError;
use crate::kernels::AseModel;
use crate::sink::{compressed_bytes, packed_layout, Buffer, PoolInfo};
use crate::types::ModelParams;
use crate::utils::bits_to_bytes;

//==============================================================================
// 1. Test Helpers
//==============================================================================

fn random_bytes(seed: u64, len: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = vec![0u8; len];
    rng.fill(&mut data[..]);
    data
}

/// Bytes drawn from a small alphabet, so the lookup table gets hits.
fn low_entropy_bytes(seed: u64, len: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let alphabet = b"ACGT";
    (0..len)
        .map(|_| alphabet[rng.random_range(0..alphabet.len())])
        .collect()
}

fn sequential_roundtrip(input: &[u8], partition: &Partition) -> u64 {
    let factory = DescriptorFactory::new(&AseModel);
    let desc = factory.comp_descriptor(partition, input.len()).unwrap();
    let (bits, buffer) = sequential::compress(&AseModel, input, &desc).unwrap();

    // Only the bytes and the bit count cross the boundary.
    let mut received = Buffer::from_bytes(buffer.as_bytes(), bits, desc.max_width()).unwrap();
    let decomp = factory
        .decomp_descriptor(partition, input.len(), bits)
        .unwrap();
    let (consumed, output) = sequential::decompress(&AseModel, &mut received, &decomp).unwrap();

    assert_eq!(consumed, bits);
    assert_eq!(output, input, "sequential roundtrip failed");
    bits
}

fn parallel_roundtrip(input: &[u8], partition: &Partition) -> Vec<PoolInfo> {
    let factory = DescriptorFactory::new(&AseModel);
    let descs = factory
        .parallel_comp_descriptors(partition, input.len())
        .unwrap();
    let (infos, pool) = parallel::compress(&AseModel, input, &descs).unwrap();

    let counts: Vec<u64> = infos.iter().map(|i| i.counts).collect();
    let decomp = factory
        .parallel_decomp_descriptors(partition, input.len(), &counts)
        .unwrap();
    let result = parallel::decompress(&AseModel, pool.as_bytes(), &infos, &decomp).unwrap();

    assert_eq!(result.output, input, "parallel roundtrip failed");
    for (info, desc) in result.infos.iter().zip(&decomp) {
        assert_eq!(info.bits_consumed(), desc.counts());
    }
    infos
}

//==============================================================================
// 2. Sequential Engine
//==============================================================================

#[test]
fn test_sequential_roundtrip_repeated_byte() {
    let input = vec![0x41u8; 1000];
    let bits = sequential_roundtrip(&input, &Partition::default());
    // Each cycle is a 9-bit literal and five 1-bit hits, after which culling
    // empties the one-entry table: 166 full cycles plus a literal and 3 hits.
    assert_eq!(bits, 166 * 14 + 9 + 3);
}

#[test]
fn test_sequential_roundtrip_single_byte() {
    let bits = sequential_roundtrip(&[0xAB], &Partition::default());
    assert_eq!(bits, 9);
}

#[test]
fn test_sequential_roundtrip_random_data() {
    let input = random_bytes(7, 4096);
    let bits = sequential_roundtrip(&input, &Partition::default());
    // Random bytes are no worse than the 9-bit worst case.
    assert!(bits <= 4096 * 9);
}

#[test]
fn test_sequential_roundtrip_across_model_params() {
    let input = low_entropy_bytes(11, 2000);
    for (entry_size, global_counter) in [(1, 0), (4, 1), (8, 4), (16, 8), (256, 32)] {
        let partition = Partition::new(vec![PartitionAllocation::global(
            entry_size,
            global_counter,
        )]);
        sequential_roundtrip(&input, &partition);
    }
}

#[test]
fn test_sequential_rejects_empty_input() {
    let result = DescriptorFactory::new(&AseModel).comp_descriptor(&Partition::default(), 0);
    assert!(matches!(result, Err(AseError::InvalidPartition(_))));
}

#[test]
fn test_sequential_buffer_can_be_decoded_twice_after_rewind() {
    let input = low_entropy_bytes(3, 300);
    let factory = DescriptorFactory::new(&AseModel);
    let desc = factory.comp_descriptor(&Partition::default(), input.len()).unwrap();
    let (bits, mut buffer) = sequential::compress(&AseModel, &input, &desc).unwrap();

    let decomp = desc.with_counts(bits);
    let (_, first) = sequential::decompress(&AseModel, &mut buffer, &decomp).unwrap();
    buffer.rewind();
    let (_, second) = sequential::decompress(&AseModel, &mut buffer, &decomp).unwrap();
    assert_eq!(first, input);
    assert_eq!(second, input);
}

//==============================================================================
// 3. Parallel Engine
//==============================================================================

#[test]
fn test_parallel_roundtrip_four_equal_units() {
    let input = vec![0x41u8; 1000];
    let infos = parallel_roundtrip(&input, &Partition::default().with_blocks(4));

    let descs = DescriptorFactory::new(&AseModel)
        .parallel_comp_descriptors(&Partition::default().with_blocks(4), 1000)
        .unwrap();
    assert!(descs.iter().all(|d| d.chunk_size() == 250));
    assert_eq!(infos.len(), 4);
    assert!(infos.iter().all(|i| i.counts == 41 * 14 + 9 + 3));
}

#[test]
fn test_parallel_roundtrip_with_remainder() {
    let input = random_bytes(21, 1001);
    let infos = parallel_roundtrip(&input, &Partition::default().with_blocks(4));
    assert_eq!(infos.len(), 4);
}

#[test]
fn test_parallel_thread_count_correction_gives_one_byte_chunks() {
    let input = b"xyz";
    let partition = Partition::default()
        .with_blocks(2)
        .with_threads_per_block(4);
    let descs = DescriptorFactory::new(&AseModel)
        .parallel_comp_descriptors(&partition, input.len())
        .unwrap();
    assert_eq!(descs.len(), 3);
    assert!(descs.iter().all(|d| d.chunk_size() == 1));

    let infos = parallel_roundtrip(input, &partition);
    assert!(infos.iter().all(|i| i.counts == 9));
}

#[test]
fn test_parallel_single_unit_matches_sequential() {
    let input = low_entropy_bytes(5, 777);
    let factory = DescriptorFactory::new(&AseModel);
    let partition = Partition::default();

    let desc = factory.comp_descriptor(&partition, input.len()).unwrap();
    let (bits, buffer) = sequential::compress(&AseModel, &input, &desc).unwrap();

    let descs = factory
        .parallel_comp_descriptors(&partition, input.len())
        .unwrap();
    let (infos, pool) = parallel::compress(&AseModel, &input, &descs).unwrap();
    let (packed, _) = pool.pack(&infos);

    assert_eq!(infos[0].counts, bits);
    assert_eq!(packed.as_bytes(), &buffer.as_bytes()[..bits_to_bytes(bits)]);
}

#[test]
fn test_partition_shape_does_not_change_output() {
    let input = low_entropy_bytes(99, 5000);
    let partitions = [
        Partition::default(),
        Partition::default().with_blocks(3),
        Partition::default().with_blocks(4).with_threads_per_block(2),
        Partition::uniform(7, ModelParams::new(16, 2)),
        Partition::new(vec![
            PartitionAllocation::global(8, 4),
            PartitionAllocation::scoped(64, 1, vec![1]).named("wide"),
        ])
        .with_blocks(2),
    ];
    for partition in &partitions {
        parallel_roundtrip(&input, partition);
    }
}

#[test]
fn test_scoped_allocation_changes_only_its_block() {
    let input = low_entropy_bytes(17, 4000);
    let global = Partition::default().with_blocks(2);
    let scoped = Partition::new(vec![
        PartitionAllocation::global(8, 4),
        PartitionAllocation::scoped(1, 0, vec![1]),
    ])
    .with_blocks(2);

    let global_infos = parallel_roundtrip(&input, &global);
    let scoped_infos = parallel_roundtrip(&input, &scoped);
    assert_eq!(global_infos[0].counts, scoped_infos[0].counts);
    assert_ne!(global_infos[1].counts, scoped_infos[1].counts);
}

#[test]
fn test_parallel_rejects_empty_input() {
    let result = DescriptorFactory::new(&AseModel)
        .parallel_comp_descriptors(&Partition::default().with_blocks(4), 0);
    assert!(matches!(result, Err(AseError::InvalidPartition(_))));
}

#[test]
fn test_parallel_on_dedicated_pool() {
    let input = random_bytes(8, 2048);
    let runner = ParallelRunner::with_threads(3).unwrap();
    let factory = DescriptorFactory::new(&AseModel);
    let partition = Partition::default().with_blocks(6);
    let descs = factory
        .parallel_comp_descriptors(&partition, input.len())
        .unwrap();

    let (infos, pool) = parallel::compress_with(&runner, &AseModel, &input, &descs).unwrap();
    let counts: Vec<u64> = infos.iter().map(|i| i.counts).collect();
    let decomp = factory
        .parallel_decomp_descriptors(&partition, input.len(), &counts)
        .unwrap();
    let result =
        parallel::decompress_with(&runner, &AseModel, pool.as_bytes(), &infos, &decomp).unwrap();
    assert_eq!(result.output, input);
}

#[test]
fn test_parallel_overflow_fails_the_whole_batch() {
    let input = random_bytes(2, 64);
    let descs: Vec<_> = DescriptorFactory::new(&AseModel)
        .parallel_comp_descriptors(&Partition::default().with_blocks(4), input.len())
        .unwrap()
        .into_iter()
        .map(|d| if d.unit() == 3 { d.with_output_size(1) } else { d })
        .collect();

    let result = parallel::compress(&AseModel, &input, &descs);
    assert!(matches!(
        result,
        Err(AseError::PoolOverflow { unit: 3, .. })
    ));
}

//==============================================================================
// 4. Packing
//==============================================================================

#[test]
fn test_packed_pool_roundtrip() {
    let input = low_entropy_bytes(42, 3000);
    let factory = DescriptorFactory::new(&AseModel);
    let partition = Partition::default().with_blocks(5);
    let descs = factory
        .parallel_comp_descriptors(&partition, input.len())
        .unwrap();
    let (infos, pool) = parallel::compress(&AseModel, &input, &descs).unwrap();

    let (packed, packed_infos) = pool.pack(&infos);
    assert_eq!(packed.len(), compressed_bytes(&infos));
    assert!(packed.len() < pool.len());

    let counts: Vec<u64> = packed_infos.iter().map(|i| i.counts).collect();
    let decomp = factory
        .parallel_decomp_descriptors(&partition, input.len(), &counts)
        .unwrap();
    let result = parallel::decompress(&AseModel, packed.as_bytes(), &packed_infos, &decomp).unwrap();
    assert_eq!(result.output, input);

    // A receiver holding only the counts can locate the packed regions.
    let max_widths: Vec<u32> = decomp.iter().map(|d| d.max_width()).collect();
    let rebuilt = packed_layout(&counts, &max_widths);
    let result = parallel::decompress(&AseModel, packed.as_bytes(), &rebuilt, &decomp).unwrap();
    assert_eq!(result.output, input);
}

//==============================================================================
// 5. Desynchronization
//==============================================================================

fn compress_for_desync(partition: &Partition, input: &[u8]) -> (Vec<PoolInfo>, Vec<u8>) {
    let descs = DescriptorFactory::new(&AseModel)
        .parallel_comp_descriptors(partition, input.len())
        .unwrap();
    let (infos, pool) = parallel::compress(&AseModel, input, &descs).unwrap();
    (infos, pool.into_bytes())
}

#[test]
fn test_inflated_counts_are_desync() {
    let input = low_entropy_bytes(12, 400);
    let partition = Partition::default().with_blocks(2);
    let (mut infos, pool) = compress_for_desync(&partition, &input);

    // Claim one extra bit for unit 1 on both the record and the descriptor.
    infos[1].counts += 1;
    let counts: Vec<u64> = infos.iter().map(|i| i.counts).collect();
    let decomp = DescriptorFactory::new(&AseModel)
        .parallel_decomp_descriptors(&partition, input.len(), &counts)
        .unwrap();
    let result = parallel::decompress(&AseModel, &pool, &infos, &decomp);
    assert!(matches!(result, Err(AseError::DesyncError(_))));
}

#[test]
fn test_truncated_counts_are_underrun() {
    let input = low_entropy_bytes(13, 400);
    let partition = Partition::default().with_blocks(2);
    let (mut infos, pool) = compress_for_desync(&partition, &input);

    infos[0].counts -= 1;
    let counts: Vec<u64> = infos.iter().map(|i| i.counts).collect();
    let decomp = DescriptorFactory::new(&AseModel)
        .parallel_decomp_descriptors(&partition, input.len(), &counts)
        .unwrap();
    let result = parallel::decompress(&AseModel, &pool, &infos, &decomp);
    assert!(matches!(result, Err(AseError::BufferUnderrun { .. })));
}

#[test]
fn test_counts_from_another_batch_are_desync() {
    let input = low_entropy_bytes(14, 600);
    let partition = Partition::default().with_blocks(3);
    let (infos, pool) = compress_for_desync(&partition, &input);

    let result = DescriptorFactory::new(&AseModel).parallel_decomp_descriptors(
        &partition,
        input.len(),
        &[infos[0].counts, infos[1].counts],
    );
    assert!(matches!(result, Err(AseError::DesyncError(_))));

    let mut counts: Vec<u64> = infos.iter().map(|i| i.counts).collect();
    counts[2] += 8;
    let decomp = DescriptorFactory::new(&AseModel)
        .parallel_decomp_descriptors(&partition, input.len(), &counts)
        .unwrap();
    let result = parallel::decompress(&AseModel, &pool, &infos, &decomp);
    assert!(matches!(result, Err(AseError::DesyncError(_))));
}

#[test]
fn test_decompression_partition_must_match_assignment() {
    let total = 1000;
    let compression = Partition::default().with_blocks(4);
    let same = Partition::uniform(2, ModelParams::default()).with_threads_per_block(2);
    assert!(ensure_same_assignment(&compression, &same, total).is_ok());

    let different = Partition::uniform(4, ModelParams::new(16, 4));
    assert!(matches!(
        ensure_same_assignment(&compression, &different, total),
        Err(AseError::DesyncError(_))
    ));
}
