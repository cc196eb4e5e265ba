pub mod document_store;
pub mod extractor;
pub mod html_normalizer;
pub mod llm_service;
pub mod prompts;
pub mod scrape_tool;

pub use document_store::MemoryStore;
pub use extractor::{Extraction, StructuredExtractor};
pub use html_normalizer::normalize_html;
pub use llm_service::OpenAiGenerator;
pub use scrape_tool::ScrapeTool;
