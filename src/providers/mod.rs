pub mod gemini;
pub mod llm;
pub mod prompt;

pub use gemini::GeminiClient;
pub use llm::{MessageGenerator, MockGenerator};
pub use prompt::{build_prompt, PromptOptions};
