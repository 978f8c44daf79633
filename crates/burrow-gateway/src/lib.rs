//! HTTP surface of Burrow: serves stored objects through a read-through
//! cache, accepts uploads and forwards link-shortening requests.

pub mod app;
pub mod dispatch;
pub mod error;
pub mod request;
pub mod serve;
pub mod shortener;
pub mod state;
pub mod upload;

pub use app::App;
pub use error::{GatewayError, Result};
pub use shortener::ShortenerProxy;
pub use state::AppState;
