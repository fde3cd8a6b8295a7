pub mod metadata;
pub mod network;
pub mod spec;

pub use metadata::ModelMetadata;
pub use network::{Mlp, Mode};
pub use spec::MlpSpec;
