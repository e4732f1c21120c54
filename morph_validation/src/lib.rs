// THEORY:
// This file is the main entry point for the `morph_validation` library crate.
// It exposes the two independent halves of the harness core:
//
// 1.  **Work distribution**: `core_modules::partitioner` splits a manifest of test
//     cases into balanced, contiguous sub-manifests, one per worker.
// 2.  **Input decoding**: `core_modules::ppm` turns a raw truecolor (P6) file into
//     an owned `Image` that can be handed to the algorithm under test.
//
// The `harness` and `parallel_harness` modules compose the two the way a driver
// does: split once, then let every worker walk its own partition independently.
// Nothing in here spawns OS processes or talks to a vendor library directly; the
// algorithm under test sits behind the `Analyzer` trait.

pub mod core_modules;
pub mod error;
pub mod harness;
pub mod parallel_harness;

pub use core_modules::raster::Image;
pub use core_modules::partitioner::{layout, partition, PartitionLayout, PartitionPlan, Partitioner};
pub use core_modules::ppm::decode;
pub use core_modules::status::{Action, ImageLabel, ReturnCode, ReturnStatus};
pub use core_modules::tokenizer::split;
pub use error::{Error, FormatError, Result};
pub use harness::{run_partition, Analyzer, CaseOutcome, DecodeCheck, PartitionReport, TestCase};
pub use parallel_harness::{HarnessConfig, ParallelHarness};
