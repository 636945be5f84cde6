pub mod contract;
pub mod loader;
pub mod validator;

pub use contract::*;
pub use loader::{default_search_path, resolve_lens_id, LensContract};
