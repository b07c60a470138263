mod app;
mod code_block;
mod config;
mod conversation;
mod errors;
pub mod prompts;
mod service;
mod storage;
mod types;

pub use app::{CoachApp, CoachAppOptions, SAVED_KEY_INVALID, SUBMITTED_KEY_INVALID};
pub use code_block::{extract_code, strip_json_fence, CodeBlock, PLAINTEXT};
pub use config::{
    AppConfig, Theme, API_KEY_KEY, DEFAULT_LANGUAGE, EXAMPLE_PROBLEMS, LANGUAGES, THEME_KEY,
};
pub use conversation::Conversation;
pub use errors::{CoachError, CoachResult, Precondition};
pub use service::{parse_analysis, AiService, AiServiceOptions, DEFAULT_MODEL_ID};
pub use storage::{open_default_store, CredentialStore, JsonFileStore, MemoryStore};
pub use types::*;
