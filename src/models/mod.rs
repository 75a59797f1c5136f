pub mod execution;
pub mod analysis;
pub mod report;

pub use execution::*;
pub use analysis::*;
pub use report::*;
