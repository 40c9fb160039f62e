pub mod agent;
pub mod bridge;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod extractor;
pub mod host;
pub mod popup;
pub mod providers;
pub mod storage;
pub mod types;

pub use config::Config;
pub use error::{Error, GenerationError, Result};
pub use types::*;
