//! HTTP control plane for the voice engine
//!
//! Exposes session toggle/stop/status/transcript and a read-only inventory
//! listing.

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
