use coach_genai::ResponseFormat;
use serde_json::{json, Value};

pub const SYSTEM_INSTRUCTION: &str = "You are an expert LeetCode coach and world-class software engineer. Your goal is to help users solve coding problems by guiding them.

You handle three types of requests:
1.  **Problem Analysis**: If a user provides a LeetCode problem, you MUST respond with a JSON object adhering to the specified schema. This includes providing an array of 3 distinct, progressively more detailed hints, a step-by-step algorithm, and a full code solution.
2.  **Code Explanation**: If a user provides a block of code, explain its logic, functionality, and complexity (time and space) in Markdown.
3.  **Code Optimization**: If a user provides code and asks for optimization, identify bottlenecks and suggest improvements in Markdown.

For follow-up questions after the initial analysis, respond conversationally in standard Markdown.
When providing code examples or pseudocode, use the user's preferred programming language if specified. Default to Python if no language is mentioned.
Keep your responses concise, clear, and focused on coaching.";

#[must_use]
pub fn analysis_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "hints": {
                "type": "array",
                "items": { "type": "string" },
                "description": "An array of 3 concise, high-level hints to nudge the user in the right direction. Each hint should be progressively more revealing."
            },
            "algorithm": {
                "type": "string",
                "description": "Break down the problem into smaller, logical steps. Discuss relevant data structures, algorithms, and edge cases. Use Markdown for formatting (e.g., lists, bolding)."
            },
            "code": {
                "type": "string",
                "description": "Provide a complete, runnable code solution in the user's preferred language. Ensure the code is well-formatted with proper indentation. Use Markdown for formatting a code block, e.g., ```python ... ```."
            }
        },
        "required": ["hints", "algorithm", "code"]
    })
}

#[must_use]
pub fn code_only_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "code": {
                "type": "string",
                "description": "Provide ONLY the complete, runnable code solution in the requested language. Ensure the code is well-formatted with proper indentation. The output should be a single Markdown code block, e.g., ```language ... ```."
            }
        },
        "required": ["code"]
    })
}

#[must_use]
pub fn analysis_format() -> ResponseFormat {
    ResponseFormat::Json(analysis_schema())
}

#[must_use]
pub fn code_only_format() -> ResponseFormat {
    ResponseFormat::Json(code_only_schema())
}

#[must_use]
pub fn analysis_prompt(problem: &str, language: &str) -> String {
    format!("My preferred language is {language}. Please analyze this problem:\n\n{problem}")
}

#[must_use]
pub fn follow_up_prompt(message: &str, language: &str) -> String {
    format!(
        "My preferred language is {language}. Please consider this for any code or pseudocode.\n\nMy follow-up request:\n{message}"
    )
}

#[must_use]
pub fn translation_prompt(problem: &str, algorithm: &str, language: &str) -> String {
    format!(
        "Original Problem:\n{problem}\n\nAlgorithm:\n{algorithm}\n\nBased on the problem and algorithm above, provide a complete, runnable code solution in the {language} language."
    )
}
