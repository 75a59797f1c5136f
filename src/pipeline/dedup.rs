use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::analysis::{parse_with_repair, DedupOracle, Repairer};
use crate::config::{DEFAULT_DEDUP_CAP, DEFAULT_DEDUP_THRESHOLD};
use crate::models::DedupResponse;
use crate::utils::similarity::similarity_ratio;
use super::state::Records;

/// Reduces a layer's candidate commands against everything run before it.
pub struct LayerDeduplicator {
    oracle: Arc<dyn DedupOracle>,
    repairer: Arc<dyn Repairer>,
    threshold: f64,
    cap: usize,
}

impl LayerDeduplicator {
    pub fn new(oracle: Arc<dyn DedupOracle>, repairer: Arc<dyn Repairer>) -> Self {
        Self {
            oracle,
            repairer,
            threshold: DEFAULT_DEDUP_THRESHOLD,
            cap: DEFAULT_DEDUP_CAP,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_cap(mut self, cap: usize) -> Self {
        self.cap = cap.max(1);
        self
    }

    /// Deduplicate `candidates` for `target_layer`.
    ///
    /// The result is always a subset of the (trimmed) candidates. Oracle
    /// failures degrade to the locally filtered list.
    pub async fn reduce(&self, candidates: &[String], records: &Records, target_layer: i32) -> Vec<String> {
        let history = records.history_before(target_layer);
        let survivors = prefilter(candidates, &history, self.threshold);
        debug!(
            layer = target_layer,
            candidates = candidates.len(),
            survivors = survivors.len(),
            "Local similarity filter applied"
        );

        if survivors.is_empty() {
            return survivors;
        }

        let raw = match self.oracle.deduplicate(&survivors, &history).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(layer = target_layer, error = %e, "Deduplication oracle failed, keeping filtered list");
                return survivors;
            }
        };

        let Some(response) =
            parse_with_repair::<DedupResponse>(&raw, self.repairer.as_ref(), "deduplicate").await
        else {
            warn!(layer = target_layer, "Unparseable deduplication response, keeping filtered list");
            return survivors;
        };

        let reduced = restrict_to_candidates(&response.deduplicated_commands, &survivors, self.cap);
        info!(
            layer = target_layer,
            before = survivors.len(),
            after = reduced.len(),
            "Layer deduplicated"
        );
        reduced
    }
}

/// Local, deterministic pre-filter.
///
/// Drops a candidate when it is empty, already in `history`, repeated earlier
/// in `candidates`, more similar than `threshold` to a history command, or
/// covered token-for-token by a history command of the same tool.
pub fn prefilter(candidates: &[String], history: &[String], threshold: f64) -> Vec<String> {
    let history: Vec<&str> = history.iter().map(|h| h.trim()).filter(|h| !h.is_empty()).collect();
    let exact: HashSet<&str> = history.iter().copied().collect();
    let mut kept: Vec<String> = Vec::new();
    let mut kept_set: HashSet<String> = HashSet::new();

    for candidate in candidates {
        let candidate = candidate.trim();
        if candidate.is_empty() || exact.contains(candidate) || kept_set.contains(candidate) {
            continue;
        }
        if let Some(h) = history.iter().find(|h| similarity_ratio(candidate, h) > threshold) {
            debug!(candidate, matched = %h, "Dropping near-duplicate command");
            continue;
        }
        if let Some(h) = history.iter().find(|h| is_subsumed(candidate, h)) {
            debug!(candidate, covered_by = %h, "Dropping command covered by earlier scan");
            continue;
        }
        kept_set.insert(candidate.to_string());
        kept.push(candidate.to_string());
    }
    kept
}

/// Flags that change what a command probes, or narrow it. A command carrying
/// one does not cover a command without it.
const PROBE_SHAPING_FLAGS: &[&str] = &[
    // nmap scan types and port narrowing
    "-sU", "-sn", "-sL", "-sO", "-sA", "-sW", "-sM", "-sN", "-sF", "-sX", "-sY", "-sZ",
    "--top-ports", "-F",
    // curl request shape
    "-I", "--head", "-X", "--request",
];

/// True when `earlier` runs the same tool and contains every token of `candidate`,
/// and does not probe something different through a flag the candidate lacks.
fn is_subsumed(candidate: &str, earlier: &str) -> bool {
    let cand: Vec<&str> = candidate.split_whitespace().collect();
    let prior: Vec<&str> = earlier.split_whitespace().collect();
    let (Some(tool), Some(prior_tool)) = (cand.first(), prior.first()) else {
        return false;
    };
    if tool != prior_tool {
        return false;
    }

    let cand_set: HashSet<&str> = cand.iter().copied().collect();
    let shapes_probe = prior[1..].iter().any(|t| {
        let restricts_ports = *tool == "nmap" && t.starts_with("-p") && *t != "-p-";
        (PROBE_SHAPING_FLAGS.contains(t) || restricts_ports) && !cand_set.contains(t)
    });
    if shapes_probe {
        return false;
    }

    let prior_set: HashSet<&str> = prior[1..].iter().copied().collect();
    cand[1..].iter().all(|t| prior_set.contains(t))
}

/// Keep only oracle entries that name a survivor, in oracle order, once each, capped.
fn restrict_to_candidates(answer: &[String], survivors: &[String], cap: usize) -> Vec<String> {
    let allowed: HashSet<&str> = survivors.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for entry in answer {
        let entry = entry.trim();
        if !allowed.contains(entry) {
            debug!(entry, "Ignoring command not in candidate set");
            continue;
        }
        if seen.insert(entry) {
            out.push(entry.to_string());
        }
        if out.len() >= cap {
            break;
        }
    }
    out
}
