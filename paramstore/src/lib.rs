pub mod cache;
pub mod client;
pub mod config;
pub mod metrics_defs;
pub mod store;

pub use cache::{ParamCache, RelayParams};
pub use client::HttpParameterStore;
pub use store::{ParameterStore, StoreError};
