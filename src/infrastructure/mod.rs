pub mod js_executor;
pub mod traits;

pub use js_executor::JsExecutor;
pub use traits::{
    DocumentStore, GenerationRequest, GenerationResponse, PageFetcher, Source,
    StructuredGenerator, UsageMetadata,
};
