pub mod connector_usage;
pub mod entity;
pub mod error;
pub mod extracted_entity;
pub mod orchestration_run;
pub mod raw_ingestion;
pub mod store;

pub use error::{Result, StoreError};
pub use store::Store;
