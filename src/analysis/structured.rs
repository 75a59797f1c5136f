use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::capabilities::Repairer;

/// Parse model output as `T`, tolerating code fences and surrounding prose.
pub fn parse_structured<T: DeserializeOwned>(text: &str) -> Option<T> {
    let trimmed = text.trim();
    if let Ok(v) = serde_json::from_str::<T>(trimmed) {
        return Some(v);
    }

    let unfenced = strip_code_fence(trimmed);
    if let Ok(v) = serde_json::from_str::<T>(unfenced) {
        return Some(v);
    }

    let start = unfenced.find('{')?;
    let end = unfenced.rfind('}')?;
    if start >= end {
        return None;
    }
    serde_json::from_str::<T>(&unfenced[start..=end]).ok()
}

/// Parse `text` as `T`; on failure ask `repairer` exactly once.
///
/// Returns `None` when the repaired text is still unusable or the repair
/// call itself fails.
pub async fn parse_with_repair<T: DeserializeOwned>(
    text: &str,
    repairer: &dyn Repairer,
    context: &str,
) -> Option<T> {
    if let Some(v) = parse_structured(text) {
        return Some(v);
    }

    debug!(context, "Structured response malformed, requesting repair");
    let repaired = match repairer.repair(text).await {
        Ok(r) => r,
        Err(e) => {
            warn!(context, error = %e, "Repair request failed");
            return None;
        }
    };

    let parsed = parse_structured(&repaired);
    if parsed.is_none() {
        warn!(context, "Response still malformed after repair, giving up");
    }
    parsed
}

fn strip_code_fence(text: &str) -> &str {
    let body = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    body.strip_suffix("```").unwrap_or(body).trim()
}
