use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;

use crate::analysis::ExploitLookup;
use crate::errors::HawxError;
use crate::utils::text::clean_line;

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(60);

/// Service names too generic to search for without a version. Matched as
/// substrings, so `rpc` also covers `msrpc` and `rpcbind`.
const COMMON_SERVICES: &[&str] = &[
    "http", "https", "ssh", "ftp", "smtp", "dns", "domain", "smb", "pop3", "imap",
    "ntp", "rdp", "mysql", "mssql", "postgres", "oracle", "telnet", "ldap", "snmp",
    "rpc", "nfs", "kerberos", "dhcp", "vnc", "cups", "printer", "rsync", "netbios",
    "microsoft-ds",
];

/// A common name, the rest of its word, then a version token.
static VERSIONED_COMMON: LazyLock<Regex> = LazyLock::new(|| {
    let names = COMMON_SERVICES.iter().map(|n| regex::escape(n)).collect::<Vec<_>>().join("|");
    Regex::new(&format!(r"(?:{})\S*\s+v?[0-9]+[.0-9a-z_-]*", names)).expect("static service pattern")
});

/// `searchsploit` wrapper.
pub struct SearchsploitLookup {
    binary: String,
    timeout: Duration,
}

impl SearchsploitLookup {
    pub fn new() -> Self {
        Self { binary: "searchsploit".to_string(), timeout: LOOKUP_TIMEOUT }
    }

    pub fn with_binary(mut self, binary: &str) -> Self {
        self.binary = binary.to_string();
        self
    }
}

impl Default for SearchsploitLookup {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExploitLookup for SearchsploitLookup {
    async fn lookup(&self, service: &str) -> Result<String, HawxError> {
        let output = tokio::time::timeout(
            self.timeout,
            Command::new(&self.binary)
                .args(service.split_whitespace())
                .stdin(Stdio::null())
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| HawxError::Timeout(format!("{} timed out for '{}'", self.binary, service)))?
        .map_err(|e| HawxError::Process(format!("{} failed: {}", self.binary, e)))?;

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(clean_line)
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

/// Whether a discovered service is specific enough to search exploits for.
pub fn is_worth_lookup(service: &str) -> bool {
    let service = service.trim();
    if service.is_empty() {
        return false;
    }
    let lower = service.to_lowercase();
    if !COMMON_SERVICES.iter().any(|common| lower.contains(common)) {
        return true;
    }
    VERSIONED_COMMON.is_match(&lower)
}
