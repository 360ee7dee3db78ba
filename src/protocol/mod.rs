pub mod anthropic;
pub mod gemini;
pub mod mapping;
pub mod openai;
