//! Signal evaluation, caching and consensus.

pub mod aggregation;
pub mod decision;
pub mod evaluator;
pub mod vault;

pub use aggregation::*;
pub use decision::*;
pub use evaluator::*;
pub use vault::*;
