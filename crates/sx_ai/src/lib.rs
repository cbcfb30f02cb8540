pub mod draft;
pub mod embeddings;
pub mod evidence;
pub mod guardrails;
pub mod llm;
pub mod ollama;
pub mod pipeline;
pub mod research;
pub mod retrieve;
pub mod review;
pub mod search;
