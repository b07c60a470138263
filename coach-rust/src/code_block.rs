use regex::Regex;
use std::sync::LazyLock;

/// Language reported when a block carries no tag or there is no fence.
pub const PLAINTEXT: &str = "plaintext";

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```(\w+)?\n([\s\S]*?)\n```").expect("fenced block pattern is valid")
});

static JSON_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^```(?:json)?\s*\n?([\s\S]*?)\n?\s*```$").expect("json fence pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// Lowercased language tag of the block.
    pub language: String,
    /// Body of the block, trimmed.
    pub code: String,
}

/// Pull the first fenced code block out of Markdown.
/// Text without a fence is taken as the code itself.
#[must_use]
pub fn extract_code(markdown: &str) -> CodeBlock {
    if let Some(captures) = FENCED_BLOCK.captures(markdown) {
        let language = captures
            .get(1)
            .map_or(PLAINTEXT, |m| m.as_str())
            .to_lowercase();
        let code = captures
            .get(2)
            .map_or("", |m| m.as_str())
            .trim()
            .to_string();
        return CodeBlock { language, code };
    }

    CodeBlock {
        language: PLAINTEXT.to_string(),
        code: markdown.trim().to_string(),
    }
}

/// Remove a ```` ```json ```` or bare ```` ``` ```` wrapper that models
/// sometimes put around JSON output.
#[must_use]
pub fn strip_json_fence(text: &str) -> &str {
    let trimmed = text.trim();
    JSON_FENCE
        .captures(trimmed)
        .and_then(|captures| captures.get(1))
        .map_or(trimmed, |m| m.as_str().trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_tagged_block() {
        assert_eq!(
            extract_code("```python\ndef f(): pass\n```"),
            CodeBlock {
                language: "python".to_string(),
                code: "def f(): pass".to_string(),
            }
        );
    }

    #[test]
    fn unfenced_text_is_plain_code() {
        assert_eq!(
            extract_code("just code, no fence"),
            CodeBlock {
                language: PLAINTEXT.to_string(),
                code: "just code, no fence".to_string(),
            }
        );
    }

    #[test]
    fn empty_input_is_empty_plain_code() {
        let block = extract_code("");
        assert_eq!(block.language, PLAINTEXT);
        assert_eq!(block.code, "");
    }

    #[test]
    fn untagged_block_and_mixed_case_tag() {
        assert_eq!(extract_code("```\nx = 1\n```").language, PLAINTEXT);
        assert_eq!(extract_code("```Java\nint x;\n```").language, "java");
    }

    #[test]
    fn only_first_block_is_taken() {
        let markdown = "Intro\n```go\nfunc a() {}\n```\nthen\n```rust\nfn b() {}\n```";
        assert_eq!(
            extract_code(markdown),
            CodeBlock {
                language: "go".to_string(),
                code: "func a() {}".to_string(),
            }
        );
    }

    #[test]
    fn extraction_is_idempotent_without_fence() {
        for input in ["  let x = 1;  ", "print('hi')\nprint('bye')", ""] {
            let once = extract_code(input);
            assert_eq!(extract_code(&once.code), once);
        }
    }

    #[test]
    fn strips_json_fences() {
        assert_eq!(strip_json_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_json_fence("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_json_fence("  {\"a\":1}\n"), "{\"a\":1}");
        assert_eq!(strip_json_fence("```json{\"a\":1}```"), "{\"a\":1}");
    }
}
