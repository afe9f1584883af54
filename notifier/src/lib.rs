pub mod dispatch;
pub mod errors;
pub mod handler;
pub mod metrics_defs;
pub mod payload;
pub mod service;

pub use dispatch::{Backoff, Delivery, Dispatcher, NoBackoff, TokioBackoff};
pub use errors::DispatchError;
pub use handler::{RelayHandler, RelayResponse};
pub use service::RelayService;
