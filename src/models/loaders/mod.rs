pub mod toml_loader;

pub use toml_loader::{load_url_list, parse_url_list, UrlSpec};
