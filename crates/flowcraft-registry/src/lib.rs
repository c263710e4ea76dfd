//! Node type registry.

mod descriptor;
mod error;
mod registry;

pub use descriptor::{DynamicOutputStrategy, InputCardinality, NodeDescriptor, OutputSpec};
pub use error::RegistryError;
pub use registry::NodeRegistry;
