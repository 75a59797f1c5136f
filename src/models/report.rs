use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How the target was interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetMode {
    Host,
    Website,
}

impl TargetMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Website => "website",
        }
    }
}

impl std::fmt::Display for TargetMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final result of a recon workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconReport {
    pub target: String,
    pub mode: TargetMode,
    /// Number of layers executed after the baseline.
    pub layers_executed: usize,
    /// Command list per slot; slot 0 is the baseline.
    pub commands: Vec<Vec<String>>,
    pub services: Vec<String>,
    pub target_dir: PathBuf,
    pub exploits_file: Option<PathBuf>,
    pub executive_summary: Option<PathBuf>,
}
