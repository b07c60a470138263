mod accumulator;
mod chat;
mod client_utils;
mod errors;
pub mod genai_test;
pub mod google;
mod language_model;
mod telemetry;
mod types;

pub use accumulator::StreamAccumulator;
pub use chat::{ChatConfig, ChatSession, ChatStream};
pub use errors::*;
pub use language_model::{LanguageModel, ResponseStream};
pub use telemetry::TracedModel;
pub use types::*;
