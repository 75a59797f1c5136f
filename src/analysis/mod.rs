pub mod analyst;
pub mod capabilities;
pub mod structured;

pub use analyst::LlmAnalyst;
pub use capabilities::{DedupOracle, ExploitLookup, Repairer, SummaryRequest, Summarizer};
pub use structured::{parse_structured, parse_with_repair};
