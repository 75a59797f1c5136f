//! Prompt templates compiled into the binary, with `{{VARIABLE}}` interpolation.

const SUMMARIZE: &str = include_str!("../../prompts/summarize.txt");
const DEDUPLICATE: &str = include_str!("../../prompts/deduplicate.txt");
const REPAIR: &str = include_str!("../../prompts/repair.txt");
const EXECUTIVE_SUMMARY: &str = include_str!("../../prompts/executive_summary.txt");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptName {
    Summarize,
    Deduplicate,
    Repair,
    ExecutiveSummary,
}

impl PromptName {
    fn template(&self) -> &'static str {
        match self {
            Self::Summarize => SUMMARIZE,
            Self::Deduplicate => DEDUPLICATE,
            Self::Repair => REPAIR,
            Self::ExecutiveSummary => EXECUTIVE_SUMMARY,
        }
    }
}

/// Variables available for template interpolation.
#[derive(Debug, Clone, Default)]
pub struct PromptVariables {
    pub command: Option<String>,
    pub output: Option<String>,
    pub previous_summary: Option<String>,
    pub similar_context: Option<String>,
    pub previous_commands: Option<String>,
    pub available_tools: Option<String>,
    pub wordlists: Option<String>,
    pub current_layer: Option<String>,
    pub prior_layers: Option<String>,
    pub cap: Option<String>,
    pub malformed: Option<String>,
    pub target: Option<String>,
    pub material: Option<String>,
}

/// Render a prompt. Unset variables become `[None]`.
pub fn render(name: PromptName, vars: &PromptVariables) -> String {
    let replacements: &[(&str, &Option<String>)] = &[
        ("{{COMMAND}}", &vars.command),
        ("{{OUTPUT}}", &vars.output),
        ("{{PREVIOUS_SUMMARY}}", &vars.previous_summary),
        ("{{SIMILAR_CONTEXT}}", &vars.similar_context),
        ("{{PREVIOUS_COMMANDS}}", &vars.previous_commands),
        ("{{AVAILABLE_TOOLS}}", &vars.available_tools),
        ("{{WORDLISTS}}", &vars.wordlists),
        ("{{CURRENT_LAYER}}", &vars.current_layer),
        ("{{PRIOR_LAYERS}}", &vars.prior_layers),
        ("{{CAP}}", &vars.cap),
        ("{{MALFORMED}}", &vars.malformed),
        ("{{TARGET}}", &vars.target),
        ("{{MATERIAL}}", &vars.material),
    ];

    let mut result = name.template().to_string();
    for (placeholder, value) in replacements {
        if result.contains(placeholder) {
            let value = value.as_deref().filter(|v| !v.trim().is_empty()).unwrap_or("[None]");
            result = result.replace(placeholder, value);
        }
    }
    result
}

/// One `- item` line per entry, or `[None]`.
pub fn bullet_list(items: &[String]) -> String {
    if items.is_empty() {
        return "[None]".to_string();
    }
    items.iter().map(|i| format!("- {}", i)).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_and_defaults() {
        let vars = PromptVariables {
            command: Some("nmap -sV 10.0.0.1".into()),
            output: Some("22/tcp open ssh".into()),
            ..Default::default()
        };
        let prompt = render(PromptName::Summarize, &vars);
        assert!(prompt.contains("nmap -sV 10.0.0.1"));
        assert!(prompt.contains("22/tcp open ssh"));
        assert!(prompt.contains("[None]"));
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn test_every_template_fully_renders() {
        for name in [PromptName::Summarize, PromptName::Deduplicate, PromptName::Repair, PromptName::ExecutiveSummary] {
            assert!(!render(name, &PromptVariables::default()).contains("{{"));
        }
    }

    #[test]
    fn test_bullet_list() {
        assert_eq!(bullet_list(&[]), "[None]");
        assert_eq!(bullet_list(&["a".into(), "b".into()]), "- a\n- b");
    }
}
