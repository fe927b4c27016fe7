// In: src/bridge/mod.rs

// ====================================================================================
// ARCHITECTURAL OVERVIEW: The Bridge Layer
// ====================================================================================
//
// The `bridge` is the public-facing API of the codec. It hides descriptors,
// sinks and engines behind a batch-level facade and a stream driver.
//
// Data Flow (Compression):
//
//   1. [Stream Driver (stream::run_round_trip / compress_stream)] -> reads `read_chunk_size` bytes
//         |
//         `-> 2. [Codec::compress_batch] -> builds descriptors from the configured `Partition`
//                  |
//                  `-> 3. [Engine (sequential | parallel)] -> returns bit counts + Buffer / BitPool
//                  |
//                  `-> packs the pool, returns `CompressedBatch { manifest, payload }`
//
// Data Flow (Decompression):
//
//   1. [Codec::decompress_batch] -> receives payload + `BatchManifest`
//         |
//         `-> a. Checks the payload size and `total_size` against the manifest `counts`,
//               then that the decompression partition resolves to the same assignment
//         |
//         `-> b. Threads the manifest `counts` into decompression descriptors
//         |
//         `-> c. Runs the matching engine and returns the restored bytes
//
//   2. [Stream Driver] -> writes restored bytes to the sink, accumulates `RunStats`
//
// ====================================================================================
pub mod codec;
pub mod manifest;
pub mod stream;

pub use codec::{Codec, CompressedBatch};
pub use manifest::{BatchManifest, MANIFEST_VERSION};
pub use stream::{compress_stream, decompress_stream, run_round_trip, ChunkSink, ChunkSource, RunStats};
