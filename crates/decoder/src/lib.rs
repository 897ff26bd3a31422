pub mod registry;
pub mod value;

pub use registry::{AbiRegistry, DecodedLog};
