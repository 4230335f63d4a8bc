pub mod seen_titles;

pub use seen_titles::{FilterOutcome, SeenTitleTracker};
