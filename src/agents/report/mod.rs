pub mod merge;
pub mod types;
pub mod workflow;

pub use merge::*;
pub use types::*;
pub use workflow::*;
