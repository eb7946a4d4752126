#![forbid(unsafe_code)]

//! HTTP surface for the pitchside service: router assembly, request
//! handlers, and the shared state they run against.

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
