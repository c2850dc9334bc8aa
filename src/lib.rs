// src/lib.rs

pub mod clients;
pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod models;
pub mod registry;
pub mod routes;
pub mod state;

// Entry points used by main and the integration tests
pub use engine::SessionController;
pub use routes::create_router;
