pub mod dense;
pub mod dropout;

pub use dense::{Dense, DenseGrads};
pub use dropout::Dropout;
