pub mod argv;
pub mod command;
pub mod exploits;
pub mod filters;
pub mod process;

use std::time::Duration;

use crate::pipeline::state::BASELINE_LAYER;

pub use argv::{tool_name, Invocation};
pub use command::CommandRunner;
pub use exploits::SearchsploitLookup;
pub use filters::OutputFilters;
pub use process::{run_process, CommandLog, ProcessOutput, TimeoutKind};

/// Idle and total limits for one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    /// Longest allowed gap between two output lines.
    pub idle: Duration,
    /// Absolute ceiling on runtime.
    pub total: Duration,
    /// Applied to both limits for baseline-layer commands.
    pub baseline_multiplier: u32,
    /// Time between SIGTERM and SIGKILL.
    pub grace: Duration,
}

impl TimeoutPolicy {
    /// Limits that apply to a command in `layer`.
    pub fn for_layer(&self, layer: i32) -> TimeoutPolicy {
        if layer == BASELINE_LAYER {
            let m = self.baseline_multiplier.max(1);
            TimeoutPolicy {
                idle: self.idle * m,
                total: self.total * m,
                ..*self
            }
        } else {
            *self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_layer_gets_multiplied_limits() {
        let policy = TimeoutPolicy {
            idle: Duration::from_secs(180),
            total: Duration::from_secs(600),
            baseline_multiplier: 5,
            grace: Duration::from_secs(5),
        };
        let baseline = policy.for_layer(BASELINE_LAYER);
        assert_eq!(baseline.idle, Duration::from_secs(900));
        assert_eq!(baseline.total, Duration::from_secs(3000));
        assert_eq!(baseline.grace, Duration::from_secs(5));
        assert_eq!(policy.for_layer(0), policy);
    }
}
