pub mod toml_loader;

pub use toml_loader::{load_site_registry, parse_site_registry, select_sites};
