pub mod headless;
pub mod iframe;
pub mod page_fetcher;

pub use headless::launch_headless_browser;
pub use page_fetcher::ChromiumFetcher;
