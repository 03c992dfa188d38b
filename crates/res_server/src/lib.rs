//! HTTP service around a single shared reservoir.

pub mod args;
pub mod error;
pub mod routes;
pub mod state;

pub use args::Args;
pub use error::{Result, ServerError};
pub use routes::{parse_shape, router};
pub use state::AppState;
