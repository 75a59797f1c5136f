use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::runner::TimeoutPolicy;

pub const DEFAULT_PROVIDER: &str = "groq";
pub const DEFAULT_CONTEXT_LENGTH: usize = 8192;
pub const DEFAULT_STEPS: u8 = 1;
pub const MAX_STEPS: u8 = 5;
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 180;
pub const DEFAULT_TOTAL_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_BASELINE_MULTIPLIER: u32 = 5;
pub const DEFAULT_GRACE_SECS: u64 = 5;
pub const DEFAULT_WORKERS: usize = 3;
pub const DEFAULT_DEDUP_THRESHOLD: f64 = 0.85;
pub const DEFAULT_DEDUP_CAP: usize = 24;
pub const DEFAULT_OUTPUT_DIR: &str = "triage";
pub const DEFAULT_WEB_WORDLIST: &str = "/usr/share/seclists/Discovery/Web-Content/big.txt";
pub const DEFAULT_DNS_WORDLIST: &str = "/usr/share/seclists/Discovery/DNS/namelist.txt";

/// Tools assumed present when the config carries no `tools` section.
pub const DEFAULT_TOOLS: &[&str] = &[
    "nmap", "curl", "whatweb", "ffuf", "gobuster", "dirb", "nikto", "dnsrecon",
    "enum4linux", "smbclient", "smbmap", "wpscan", "sslscan", "searchsploit",
    "snmpwalk", "ftp", "showmount", "rpcclient", "hydra", "wafw00f",
];

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct HawxConfig {
    pub llm: Option<LLMConfig>,
    pub recon: Option<ReconConfig>,
    pub tools: Option<ToolsConfig>,
    /// Per-tool regexes; matching lines are hidden from the summarizer.
    pub filters: Option<HashMap<String, Vec<String>>>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct LLMConfig {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub context_length: Option<usize>,
    pub ollama_host: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ReconConfig {
    pub steps: Option<u8>,
    pub idle_timeout_secs: Option<u64>,
    pub total_timeout_secs: Option<u64>,
    pub baseline_multiplier: Option<u32>,
    pub grace_secs: Option<u64>,
    pub workers: Option<usize>,
    pub concurrent: Option<bool>,
    pub dedup_threshold: Option<f64>,
    pub dedup_cap: Option<usize>,
    pub output_dir: Option<String>,
    pub wordlists: Option<WordlistConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct WordlistConfig {
    pub web: Option<String>,
    pub dns: Option<String>,
}

/// Installed tool inventory, grouped the way it was installed.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ToolsConfig {
    #[serde(default)]
    pub apt: Vec<String>,
    #[serde(default)]
    pub pip: Vec<String>,
    /// Custom tools keyed by name; the values are install notes and unused here.
    #[serde(default)]
    pub custom: HashMap<String, serde_yaml::Value>,
}

impl ToolsConfig {
    pub fn available(&self) -> Vec<String> {
        let mut custom: Vec<String> = self.custom.keys().cloned().collect();
        custom.sort();
        self.apt.iter().chain(self.pip.iter()).cloned().chain(custom).collect()
    }
}

/// Fully resolved workflow knobs, after defaults and overrides.
#[derive(Debug, Clone)]
pub struct ReconSettings {
    pub steps: u8,
    pub timeouts: TimeoutPolicy,
    pub workers: usize,
    pub concurrent: bool,
    pub dedup_threshold: f64,
    pub dedup_cap: usize,
    pub output_dir: PathBuf,
    pub web_wordlist: String,
    pub dns_wordlist: String,
    pub context_length: usize,
    pub available_tools: Vec<String>,
}

impl Default for ReconSettings {
    fn default() -> Self {
        HawxConfig::default().recon_settings()
    }
}

impl HawxConfig {
    pub fn provider(&self) -> &str {
        self.llm.as_ref()
            .and_then(|l| l.provider.as_deref())
            .unwrap_or(DEFAULT_PROVIDER)
    }

    pub fn recon_settings(&self) -> ReconSettings {
        let recon = self.recon.clone().unwrap_or_default();
        let wordlists = recon.wordlists.clone().unwrap_or_default();
        let context_length = self.llm.as_ref()
            .and_then(|l| l.context_length)
            .unwrap_or(DEFAULT_CONTEXT_LENGTH);
        let available_tools = match &self.tools {
            Some(tools) => tools.available(),
            None => DEFAULT_TOOLS.iter().map(|t| t.to_string()).collect(),
        };

        ReconSettings {
            steps: recon.steps.unwrap_or(DEFAULT_STEPS),
            timeouts: TimeoutPolicy {
                idle: Duration::from_secs(recon.idle_timeout_secs.unwrap_or(DEFAULT_IDLE_TIMEOUT_SECS)),
                total: Duration::from_secs(recon.total_timeout_secs.unwrap_or(DEFAULT_TOTAL_TIMEOUT_SECS)),
                baseline_multiplier: recon.baseline_multiplier.unwrap_or(DEFAULT_BASELINE_MULTIPLIER),
                grace: Duration::from_secs(recon.grace_secs.unwrap_or(DEFAULT_GRACE_SECS)),
            },
            workers: recon.workers.unwrap_or(DEFAULT_WORKERS),
            concurrent: recon.concurrent.unwrap_or(false),
            dedup_threshold: recon.dedup_threshold.unwrap_or(DEFAULT_DEDUP_THRESHOLD),
            dedup_cap: recon.dedup_cap.unwrap_or(DEFAULT_DEDUP_CAP),
            output_dir: PathBuf::from(recon.output_dir.unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string())),
            web_wordlist: wordlists.web.unwrap_or_else(|| DEFAULT_WEB_WORDLIST.to_string()),
            dns_wordlist: wordlists.dns.unwrap_or_else(|| DEFAULT_DNS_WORDLIST.to_string()),
            context_length,
            available_tools,
        }
    }
}
