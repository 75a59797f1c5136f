pub mod executive;
pub mod exploits;

pub use executive::{assemble_executive_summary, EXECUTIVE_SUMMARY_FILE};
pub use exploits::{write_exploit_findings, EXPLOITS_FILE};
