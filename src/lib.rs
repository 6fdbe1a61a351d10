// src/lib.rs

pub mod bootstrap;
pub mod config;
pub mod entitlement;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod session;
pub mod state;
pub mod utils;

pub use routes::create_router;
pub use state::AppState;
