use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::analysis::ExploitLookup;
use crate::audit::atomic_write;
use crate::errors::HawxError;
use crate::runner::exploits::is_worth_lookup;

pub const EXPLOITS_FILE: &str = "exploits.txt";

/// Look up every worthwhile service and write the results to `exploits.txt`.
///
/// Returns `None` when no service qualified. A failed lookup is logged and
/// leaves an empty section.
pub async fn write_exploit_findings(
    target_dir: &Path,
    lookup: &dyn ExploitLookup,
    services: &[String],
) -> Result<Option<PathBuf>, HawxError> {
    let services: Vec<&String> = services.iter().filter(|s| is_worth_lookup(s)).collect();
    if services.is_empty() {
        info!("No versioned services to look up");
        return Ok(None);
    }

    let mut report = String::new();
    for service in &services {
        info!(service = %service, "Looking up public exploits");
        let found = match lookup.lookup(service).await {
            Ok(text) => text,
            Err(e) => {
                warn!(service = %service, error = %e, "Exploit lookup failed");
                String::new()
            }
        };
        report.push_str(&format!("### {} ###\n{}\n\n", service, found.trim_end()));
    }

    let path = target_dir.join(EXPLOITS_FILE);
    atomic_write(&path, &report).await?;
    info!(path = %path.display(), services = services.len(), "Exploit findings written");
    Ok(Some(path))
}
