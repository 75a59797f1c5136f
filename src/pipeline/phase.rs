use super::state::BASELINE_LAYER;

/// States of the recon control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconPhase {
    /// Executing the commands of one layer; the baseline is `Layer(-1)`.
    Layer(i32),
    /// Exploit lookup, executive summary.
    Finalize,
    Done,
}

impl ReconPhase {
    pub fn start() -> Self {
        ReconPhase::Layer(BASELINE_LAYER)
    }

    /// Next state given the number of layers to run after the baseline.
    pub fn next(self, steps: u8) -> Self {
        match self {
            ReconPhase::Layer(i) if i + 1 < i32::from(steps) => ReconPhase::Layer(i + 1),
            ReconPhase::Layer(_) => ReconPhase::Finalize,
            ReconPhase::Finalize | ReconPhase::Done => ReconPhase::Done,
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            ReconPhase::Layer(BASELINE_LAYER) => "Baseline".to_string(),
            ReconPhase::Layer(i) => format!("Layer {}", i),
            ReconPhase::Finalize => "Finalize".to_string(),
            ReconPhase::Done => "Done".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_step_sequence() {
        let mut phase = ReconPhase::start();
        let mut seen = vec![phase];
        while phase != ReconPhase::Done {
            phase = phase.next(1);
            seen.push(phase);
        }
        assert_eq!(seen, vec![
            ReconPhase::Layer(-1),
            ReconPhase::Layer(0),
            ReconPhase::Finalize,
            ReconPhase::Done,
        ]);
    }

    #[test]
    fn test_three_steps_reach_layer_two() {
        let mut phase = ReconPhase::start();
        for _ in 0..3 {
            phase = phase.next(3);
        }
        assert_eq!(phase, ReconPhase::Layer(2));
        assert_eq!(phase.next(3), ReconPhase::Finalize);
    }

    #[test]
    fn test_display_names() {
        assert_eq!(ReconPhase::Layer(-1).display_name(), "Baseline");
        assert_eq!(ReconPhase::Layer(2).display_name(), "Layer 2");
    }
}
