//! Turns a frame's visible node list into a minimal sequence of draw
//! batches (spec §4.4).

pub mod batcher;

pub use batcher::{build_batches, Batch, BatchKey};
