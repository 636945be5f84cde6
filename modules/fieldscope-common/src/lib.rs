pub mod config;
pub mod error;
pub mod hash;
pub mod types;

pub use config::Config;
pub use error::{EngineError, Result};
pub use hash::content_hash;
pub use types::*;
