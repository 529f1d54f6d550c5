pub mod orchestrator;
pub mod validation;

pub use orchestrator::*;
pub use validation::*;
