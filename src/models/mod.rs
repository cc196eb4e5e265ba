pub mod category;
pub mod entry;
pub mod loaders;
pub mod result;
pub mod schemas;

pub use category::Category;
pub use entry::{EntryId, EntryStatus, InvalidTransition, Transition, UrlEntry};
pub use loaders::{load_url_list, UrlSpec};
pub use result::{validate_url, ExtractionResult};
pub use schemas::{CategoryData, HomePage, News, Person};
