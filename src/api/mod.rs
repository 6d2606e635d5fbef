//! HTTP API over the workflow service

pub mod health;
pub mod router;
pub mod state;
pub mod types;
pub mod workflows;

pub use router::create_router;
pub use state::AppState;
