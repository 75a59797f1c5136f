use std::collections::HashMap;

use regex::Regex;

use crate::errors::HawxError;

/// Per-tool line filters applied to output before it reaches the summarizer.
///
/// The raw log keeps every line; only the summarizer's view is filtered.
#[derive(Debug, Clone, Default)]
pub struct OutputFilters {
    rules: HashMap<String, Vec<Regex>>,
}

impl OutputFilters {
    pub fn from_patterns(patterns: &HashMap<String, Vec<String>>) -> Result<Self, HawxError> {
        let mut rules = HashMap::new();
        for (tool, pats) in patterns {
            let compiled = pats.iter().map(|p| Regex::new(p)).collect::<Result<Vec<_>, _>>()?;
            rules.insert(tool.clone(), compiled);
        }
        Ok(Self { rules })
    }

    pub fn should_filter(&self, tool: &str, line: &str) -> bool {
        self.rules
            .get(tool)
            .is_some_and(|patterns| patterns.iter().any(|re| re.is_match(line)))
    }

    pub fn apply(&self, tool: &str, text: &str) -> String {
        if !self.rules.contains_key(tool) {
            return text.to_string();
        }
        text.lines()
            .filter(|line| !self.should_filter(tool, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
