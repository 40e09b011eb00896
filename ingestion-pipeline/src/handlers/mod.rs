pub mod content;
pub mod job;
pub mod source;

pub use content::*;
pub use job::*;
pub use source::*;
