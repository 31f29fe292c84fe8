pub mod common;
pub mod products;

// Handler modules import AppState as crate::handlers::AppState
pub use crate::AppState;
