pub mod loader;
pub mod preview;
pub mod sanitize;
