use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::analysis::Summarizer;
use crate::audit::atomic_write;
use crate::audit::ledger::SUMMARY_MD_FILE;
use crate::errors::HawxError;
use crate::utils::text::{chunk_by_tokens, estimate_tokens};
use super::exploits::EXPLOITS_FILE;

pub const EXECUTIVE_SUMMARY_FILE: &str = "summary_exec.md";

const PROMPT_RESERVE: usize = 1000;

/// Build `summary_exec.md` from the per-tool summaries and exploit findings.
///
/// The material is folded chunk by chunk through the summarizer. When the
/// summarizer produces nothing, the raw material is kept as the document.
pub async fn assemble_executive_summary(
    target_dir: &Path,
    summarizer: &dyn Summarizer,
    target: &str,
    context_length: usize,
) -> Result<Option<PathBuf>, HawxError> {
    let mut sections = Vec::new();
    for file in [SUMMARY_MD_FILE, EXPLOITS_FILE] {
        let path = target_dir.join(file);
        if let Ok(content) = tokio::fs::read_to_string(&path).await {
            if !content.trim().is_empty() {
                sections.push(content);
            }
        }
    }

    if sections.is_empty() {
        info!("Nothing to summarize, skipping executive summary");
        return Ok(None);
    }
    let material = sections.join("\n\n---\n\n");

    let budget = context_length.saturating_sub(PROMPT_RESERVE).max(PROMPT_RESERVE);
    let chunks = if estimate_tokens(&material) > budget {
        chunk_by_tokens(&material, budget)
    } else {
        vec![material.clone()]
    };

    let mut running: Option<String> = None;
    for (i, chunk) in chunks.iter().enumerate() {
        match summarizer.executive_summary(target, chunk, running.as_deref()).await {
            Ok(text) if !text.trim().is_empty() => running = Some(text),
            Ok(_) => warn!(chunk = i, "Empty executive summary chunk"),
            Err(e) => warn!(chunk = i, error = %e, "Executive summary request failed"),
        }
    }

    let document = running.unwrap_or_else(|| {
        warn!("Executive summary unavailable, keeping raw findings");
        format!("# Reconnaissance Summary: {}\n\n{}", target, material)
    });

    let path = target_dir.join(EXECUTIVE_SUMMARY_FILE);
    atomic_write(&path, &document).await?;
    info!(path = %path.display(), chunks = chunks.len(), "Executive summary written");
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::SummaryRequest;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct Folding {
        calls: Mutex<Vec<(String, Option<String>)>>,
        fail: bool,
    }

    #[async_trait]
    impl Summarizer for Folding {
        async fn summarize(&self, _: SummaryRequest<'_>) -> Result<String, HawxError> {
            Ok(String::new())
        }

        async fn executive_summary(
            &self,
            target: &str,
            material: &str,
            previous: Option<&str>,
        ) -> Result<String, HawxError> {
            self.calls.lock().unwrap().push((material.to_string(), previous.map(str::to_string)));
            if self.fail {
                return Err(HawxError::Network("down".into()));
            }
            let n = self.calls.lock().unwrap().len();
            Ok(format!("# {} summary v{}", target, n))
        }
    }

    fn folding(fail: bool) -> Folding {
        Folding { calls: Mutex::new(Vec::new()), fail }
    }

    #[tokio::test]
    async fn test_folds_chunks_with_running_summary() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(SUMMARY_MD_FILE), "## nmap\nopen port line\n".repeat(400)).unwrap();
        std::fs::write(dir.path().join(EXPLOITS_FILE), "### vsftpd 2.3.4 ###\nbackdoor\n").unwrap();
        let summarizer = folding(false);

        let path = assemble_executive_summary(dir.path(), &summarizer, "10.0.0.1", 1500)
            .await
            .unwrap()
            .unwrap();

        let calls = summarizer.calls.lock().unwrap();
        assert!(calls.len() > 1);
        assert_eq!(calls[0].1, None);
        assert_eq!(calls[1].1.as_deref(), Some("# 10.0.0.1 summary v1"));
        assert!(calls.last().unwrap().0.contains("backdoor"));
        let doc = std::fs::read_to_string(path).unwrap();
        assert_eq!(doc, format!("# 10.0.0.1 summary v{}", calls.len()));
    }

    #[tokio::test]
    async fn test_failure_keeps_raw_material() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(SUMMARY_MD_FILE), "## whatweb\nApache\n").unwrap();
        let path = assemble_executive_summary(dir.path(), &folding(true), "x.htb", 8192)
            .await
            .unwrap()
            .unwrap();
        let doc = std::fs::read_to_string(path).unwrap();
        assert!(doc.starts_with("# Reconnaissance Summary: x.htb"));
        assert!(doc.contains("Apache"));
    }

    #[tokio::test]
    async fn test_no_material_no_document() {
        let dir = TempDir::new().unwrap();
        let out = assemble_executive_summary(dir.path(), &folding(false), "x", 8192).await.unwrap();
        assert!(out.is_none());
    }
}
