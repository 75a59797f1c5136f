use std::net::IpAddr;
use std::path::Path;
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::HawxError;
use crate::models::TargetMode;

static DOMAIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("static domain pattern"));
static URL_HOST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://([^/?#]+)").expect("static url pattern"));

const PROBE_TIMEOUT: Duration = Duration::from_secs(15);

/// A validated recon target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// The target as given, minus surrounding whitespace and a trailing slash for URLs.
    pub raw: String,
    pub mode: TargetMode,
    /// Host part: the target itself in host mode, the URL authority in website mode.
    pub host: String,
}

impl Target {
    pub fn parse(input: &str) -> Result<Self, HawxError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(HawxError::InvalidTarget("empty target".into()));
        }

        if let Some(caps) = URL_HOST.captures(input) {
            let host = caps[1].to_string();
            return Ok(Self {
                raw: input.trim_end_matches('/').to_string(),
                mode: TargetMode::Website,
                host,
            });
        }

        if input.parse::<IpAddr>().is_ok() || DOMAIN.is_match(input) {
            return Ok(Self {
                raw: input.to_string(),
                mode: TargetMode::Host,
                host: input.to_string(),
            });
        }

        Err(HawxError::InvalidTarget(format!(
            "'{}' is not an IP address, domain or http(s) URL",
            input
        )))
    }

    /// Name of the per-target working directory.
    pub fn dir_name(&self) -> String {
        self.host.replace([':', '/'], "_")
    }

    /// True when the host part is a DNS name rather than an address.
    pub fn is_domain(&self) -> bool {
        let bare = self.host.split(':').next().unwrap_or(&self.host);
        self.host.parse::<IpAddr>().is_err() && DOMAIN.is_match(bare)
    }

    /// Commands that run in the baseline layer.
    pub fn baseline_commands(&self, wordlists: &WebWordlists) -> Vec<String> {
        match self.mode {
            TargetMode::Host => vec![format!("nmap -sC -sV -p- {}", self.raw)],
            TargetMode::Website => web_commands(&self.raw, self, wordlists),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WebWordlists {
    pub web: String,
    pub dns: String,
}

/// The fixed web reconnaissance set for `url`.
pub fn web_commands(url: &str, target: &Target, wordlists: &WebWordlists) -> Vec<String> {
    let url = url.trim_end_matches('/');
    let mut commands = vec![
        format!("whatweb {}", url),
        format!("curl -s -I {}", url),
        format!("ffuf -u {}/FUZZ -w {} -s", url, wordlists.web),
    ];
    if target.is_domain() {
        let domain = target.host.split(':').next().unwrap_or(&target.host);
        commands.push(format!("dnsrecon -d {} -D {} -t brt", domain, wordlists.dns));
    }
    commands
}

/// Which web ports the baseline scan reported, judged from its raw logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WebPorts {
    pub http: bool,
    pub https: bool,
}

impl WebPorts {
    pub fn any(&self) -> bool {
        self.http || self.https
    }

    /// Scan the baseline logs (`{tool}_*.txt`) under `logs_dir`.
    pub async fn from_logs(logs_dir: &Path, tool: &str) -> Self {
        let mut ports = WebPorts::default();
        let mut entries = match tokio::fs::read_dir(logs_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                debug!(dir = %logs_dir.display(), error = %e, "No baseline logs to inspect");
                return ports;
            }
        };
        let prefix = format!("{}_", tool);
        while let Ok(Some(entry)) = entries.next_entry().await {
            if !entry.file_name().to_string_lossy().starts_with(&prefix) {
                continue;
            }
            let Ok(content) = tokio::fs::read_to_string(entry.path()).await else {
                continue;
            };
            ports.http |= content.contains("80/tcp");
            ports.https |= content.contains("443/tcp");
        }
        ports
    }
}

/// Probe `host` for a live web server, trying https before http.
///
/// Only schemes whose port showed up in the baseline are tried. Returns the
/// base URL of the first scheme that answers with an HTTP status line.
pub async fn detect_web_url(host: &str, ports: WebPorts) -> Option<String> {
    let mut schemes = Vec::new();
    if ports.https {
        schemes.push("https");
    }
    if ports.http {
        schemes.push("http");
    }

    for scheme in schemes {
        let url = base_url(scheme, host);
        if probe(&url).await {
            info!(url = %url, "Web server detected");
            return Some(url);
        }
        debug!(url = %url, "No HTTP response");
    }
    None
}

/// `scheme://host`, with IPv6 literals in brackets.
pub fn base_url(scheme: &str, host: &str) -> String {
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V6(addr)) => format!("{}://[{}]", scheme, addr),
        _ => format!("{}://{}", scheme, host),
    }
}

async fn probe(url: &str) -> bool {
    let output = Command::new("curl")
        .args(["-s", "-I", "--max-time", "10", url])
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output();
    match tokio::time::timeout(PROBE_TIMEOUT, output).await {
        Ok(Ok(out)) => String::from_utf8_lossy(&out.stdout).contains("HTTP/"),
        Ok(Err(e)) => {
            debug!(url, error = %e, "curl probe failed to run");
            false
        }
        Err(_) => false,
    }
}
