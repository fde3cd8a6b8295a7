pub mod classifier;
pub mod persist;

pub use classifier::{Classifier, ModelState};
pub use persist::{load_pair, save_pair};
