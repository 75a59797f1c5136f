use std::collections::HashSet;

/// Layer index of the baseline scan.
pub const BASELINE_LAYER: i32 = -1;

/// Default slot count: the baseline, five executed layers, and the final
/// recommendation set that is recorded but not run.
pub const DEFAULT_SLOTS: usize = 7;

/// The workflow ledger: per-layer command lists and discovered services.
///
/// Slot `i` holds layer `i - 1`, so slot 0 is the baseline. Slots are
/// allocated up front and never grow.
#[derive(Debug, Clone)]
pub struct Records {
    commands: Vec<Vec<String>>,
    services: Vec<String>,
}

impl Records {
    pub fn new(slots: usize) -> Self {
        Self {
            commands: vec![Vec::new(); slots.max(1)],
            services: Vec::new(),
        }
    }

    fn slot(layer: i32) -> Option<usize> {
        usize::try_from(layer - BASELINE_LAYER).ok()
    }

    /// Highest layer index that has a slot.
    pub fn last_layer(&self) -> i32 {
        self.commands.len() as i32 - 1 + BASELINE_LAYER
    }

    /// Replace the command list of `layer`. Returns false when the layer has no slot.
    pub fn set_layer(&mut self, layer: i32, commands: Vec<String>) -> bool {
        match Self::slot(layer).and_then(|s| self.commands.get_mut(s)) {
            Some(slot) => {
                *slot = commands;
                true
            }
            None => false,
        }
    }

    pub fn layer(&self, layer: i32) -> &[String] {
        Self::slot(layer)
            .and_then(|s| self.commands.get(s))
            .map_or(&[], |v| v.as_slice())
    }

    /// Every command in layers strictly before `layer`, oldest layer first.
    pub fn history_before(&self, layer: i32) -> Vec<String> {
        let end = Self::slot(layer).unwrap_or(0).min(self.commands.len());
        self.commands[..end].iter().flatten().cloned().collect()
    }

    /// All layer slots, baseline first.
    pub fn all_commands(&self) -> &[Vec<String>] {
        &self.commands
    }

    pub fn add_services<I, S>(&mut self, services: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.services.extend(services.into_iter().map(Into::into));
    }

    /// Every service reported so far, duplicates included.
    pub fn services(&self) -> &[String] {
        &self.services
    }

    /// Services in first-seen order, compared trimmed and case-insensitively.
    pub fn unique_services(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.services
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .filter(|s| seen.insert(s.to_lowercase()))
            .map(str::to_string)
            .collect()
    }
}

impl Default for Records {
    fn default() -> Self {
        Self::new(DEFAULT_SLOTS)
    }
}
