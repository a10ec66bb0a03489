pub mod config;
pub mod error;
mod hydrate;
pub mod store;

pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use store::ChatStore;
