use std::sync::LazyLock;

use regex::Regex;

static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1B(?:[@-Z\\-_]|\[[0-?]*[ -/]*[@-~])").expect("static ANSI pattern")
});

static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\w+|\S").expect("static token pattern")
});

/// Strip ANSI escapes and non-printable characters from one output line.
pub fn clean_line(line: &str) -> String {
    ANSI_ESCAPE
        .replace_all(line, "")
        .chars()
        .filter(|c| !c.is_control() || *c == '\t')
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Rough token count: words plus standalone punctuation.
pub fn estimate_tokens(text: &str) -> usize {
    TOKEN.find_iter(text).count()
}

/// Split `text` into line-aligned chunks of at most `max_tokens` tokens.
///
/// A single line longer than the budget becomes its own chunk.
pub fn chunk_by_tokens(text: &str, max_tokens: usize) -> Vec<String> {
    let max_tokens = max_tokens.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_tokens = 0;

    for line in text.lines() {
        let line_tokens = estimate_tokens(line);
        if current_tokens > 0 && current_tokens + line_tokens > max_tokens {
            chunks.push(std::mem::take(&mut current));
            current_tokens = 0;
        }
        current.push_str(line);
        current.push('\n');
        current_tokens += line_tokens;
    }
    if !current.trim().is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_line_strips_ansi() {
        assert_eq!(clean_line("\x1b[32m[+]\x1b[0m open\r"), "[+] open");
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens("80/tcp open http"), 5);
    }

    #[test]
    fn test_chunk_respects_budget() {
        let text = "a b c\nd e f\ng h i\n";
        let chunks = chunk_by_tokens(text, 6);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "a b c\nd e f\n");
        assert_eq!(chunks[1], "g h i\n");
    }

    #[test]
    fn test_chunk_small_input_is_single() {
        assert_eq!(chunk_by_tokens("one line", 100), vec!["one line\n".to_string()]);
    }
}
