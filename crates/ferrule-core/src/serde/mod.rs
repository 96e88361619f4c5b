//! JSON helpers shared by protocol types.

mod pipeline;

pub use pipeline::SerializePipeline;
