use regex::Regex;
use std::sync::OnceLock;

static FENCE_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

/// Recover the JSON payload from a model reply that may be wrapped in
/// markdown fences or preceded by prose.
///
/// Returns the best candidate even when it does not parse, so the caller's
/// parse error describes what the provider actually sent.
pub fn clean_json(raw: &str) -> String {
    let trimmed = raw.trim();

    // First try: the whole reply is JSON
    if is_json(trimmed) {
        return trimmed.to_string();
    }

    // Second try: a fenced code block
    let fenced = fenced_block(trimmed);
    if let Some(block) = &fenced {
        if is_json(block) {
            return block.clone();
        }
    }

    // Third try: the first balanced object or array
    let haystack = fenced.as_deref().unwrap_or(trimmed);
    if let Some(candidate) = balanced_slice(haystack) {
        if is_json(candidate) {
            return candidate.to_string();
        }
    }

    match haystack.find(|c: char| c == '{' || c == '[') {
        Some(start) => haystack[start..].trim().to_string(),
        None => haystack.to_string(),
    }
}

fn is_json(s: &str) -> bool {
    (s.starts_with('{') || s.starts_with('['))
        && serde_json::from_str::<serde_json::Value>(s).is_ok()
}

fn fence_pattern() -> Option<&'static Regex> {
    FENCE_PATTERN
        .get_or_init(|| Regex::new(r"```(?:json|JSON)?\s*\n?([\s\S]*?)\n?```").ok())
        .as_ref()
}

fn fenced_block(s: &str) -> Option<String> {
    for cap in fence_pattern()?.captures_iter(s) {
        let block = cap.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
        if !block.is_empty() {
            return Some(block.to_string());
        }
    }
    None
}

/// Slice from the first `{` or `[` to its matching close, skipping
/// brackets inside string literals.
fn balanced_slice(s: &str) -> Option<&str> {
    let start = s.find(|c: char| c == '{' || c == '[')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&s[start..start + i + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_json() {
        assert_eq!(clean_json("  {\"a\": 1}\n"), "{\"a\": 1}");
    }

    #[test]
    fn test_markdown_wrapped() {
        let reply = r#"
Here is the analysis:

```json
{"provider": "gpt", "findings": []}
```
"#;
        assert_eq!(clean_json(reply), r#"{"provider": "gpt", "findings": []}"#);
    }

    #[test]
    fn test_leading_prose_and_trailing_text() {
        let reply = r#"Sure! {"status": "ok", "note": "braces } in strings"} Hope that helps."#;
        assert_eq!(
            clean_json(reply),
            r#"{"status": "ok", "note": "braces } in strings"}"#
        );
    }

    #[test]
    fn test_unparseable_keeps_candidate() {
        let reply = "Result: {\"findings\": [";
        assert_eq!(clean_json(reply), "{\"findings\": [");
    }

    #[test]
    fn test_skips_empty_fence() {
        let reply = "```\n```\n```json\n{\"status\": \"ok\"}\n```";
        assert_eq!(fenced_block(reply).as_deref(), Some("{\"status\": \"ok\"}"));
        assert_eq!(clean_json(reply), "{\"status\": \"ok\"}");
    }

    #[test]
    fn test_pattern_is_compiled_once() {
        let first = fence_pattern().unwrap() as *const Regex;
        clean_json("```json\n{}\n```");
        assert_eq!(fence_pattern().unwrap() as *const Regex, first);
    }

    #[test]
    fn test_no_json_at_all() {
        assert_eq!(clean_json("I cannot help with that."), "I cannot help with that.");
    }
}
