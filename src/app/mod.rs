// app/mod.rs
// Application-level helpers shared by the CLI flows

pub mod logging;
pub mod url;

pub use logging::log_progress;
pub use url::validate_and_normalize_url;
