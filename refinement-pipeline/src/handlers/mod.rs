pub mod refinement;

pub use refinement::*;
